use anyhow::Result;
use colored::Colorize;
use std::str::FromStr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::core::config::Config;
use crate::core::lifecycle::LifecycleController;
use crate::core::state::StateStore;
use crate::server::Endpoint;
use crate::ui::status::{print_persisted, ConsoleStatus};
use crate::ui::theme::Theme;

use super::{resolve_workspace, search_service};

pub struct ServeOptions {
    pub path: Option<String>,
    pub port: Option<u16>,
    pub start: bool,
}

/// Commands the host accepts on stdin, one per line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    Start,
    Stop,
    Toggle,
    Status,
    Help,
    Quit,
}

impl FromStr for HostCommand {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "start" => Ok(HostCommand::Start),
            "stop" => Ok(HostCommand::Stop),
            "toggle" | "t" => Ok(HostCommand::Toggle),
            "status" | "s" => Ok(HostCommand::Status),
            "help" | "?" => Ok(HostCommand::Help),
            "quit" | "exit" | "q" => Ok(HostCommand::Quit),
            other => Err(format!("Unknown command: {}", other)),
        }
    }
}

pub async fn run(options: ServeOptions) -> Result<()> {
    let config = Config::load()?;
    let port = options.port.unwrap_or(config.port);
    let workspace = resolve_workspace(options.path.as_deref());
    let store = StateStore::for_workspace(&Config::state_dir()?, workspace.as_deref());

    match &workspace {
        Some(root) => println!("{} {}", "Workspace:".dimmed(), root.display()),
        None => println!("{}", "No workspace is open".yellow()),
    }

    let endpoint = Endpoint::new(search_service(&config), workspace)
        .with_timeout(config.search_timeout());
    let mut controller =
        LifecycleController::new(port, endpoint, store, Arc::new(ConsoleStatus));

    // Activation: a failed resume is reported and leaves the host usable
    let activated = if options.start {
        controller.start().await.map(|_| ())
    } else {
        controller.resume().await.map(|_| ())
    };
    if let Err(err) = activated {
        tracing::warn!(error = %err, "server not started on launch");
    }

    print_help();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        tracing::debug!("stdin closed, waiting for Ctrl+C");
                        stdin_open = false;
                        continue;
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to read stdin");
                        stdin_open = false;
                        continue;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                let command = match line.parse::<HostCommand>() {
                    Ok(command) => command,
                    Err(message) => {
                        println!("{}", message.yellow());
                        continue;
                    }
                };

                let outcome = match command {
                    HostCommand::Start => controller.start().await.map(|_| ()),
                    HostCommand::Stop => controller.stop().await,
                    HostCommand::Toggle => controller.toggle().await.map(|_| ()),
                    HostCommand::Status => {
                        print_status(&controller);
                        Ok(())
                    }
                    HostCommand::Help => {
                        print_help();
                        Ok(())
                    }
                    HostCommand::Quit => break,
                };
                if let Err(err) = outcome {
                    tracing::error!(command = ?command, error = %err, "command failed");
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.deactivate().await;
    Ok(())
}

fn print_status(controller: &LifecycleController) {
    let state = controller.status();
    match controller.local_addr() {
        Some(addr) => println!("{} {}", Theme::badge(state), format!("http://{}", addr).dimmed()),
        None => println!("{}", Theme::badge(state)),
    }
    print_persisted(&controller.persisted());
}

fn print_help() {
    println!(
        "{}",
        "Commands: start | stop | toggle | status | quit  (Ctrl+C to exit)".dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_host_commands() {
        assert_eq!("start".parse::<HostCommand>(), Ok(HostCommand::Start));
        assert_eq!(" STOP ".parse::<HostCommand>(), Ok(HostCommand::Stop));
        assert_eq!("t".parse::<HostCommand>(), Ok(HostCommand::Toggle));
        assert_eq!("status".parse::<HostCommand>(), Ok(HostCommand::Status));
        assert_eq!("exit".parse::<HostCommand>(), Ok(HostCommand::Quit));
        assert!("restart".parse::<HostCommand>().is_err());
    }
}
