use anyhow::Result;
use colored::Colorize;
use std::net::{Ipv4Addr, TcpListener};

use crate::core::config::Config;
use crate::core::state::StateStore;
use crate::ui::status::print_persisted;

use super::resolve_workspace;

pub struct StatusOptions {
    pub path: Option<String>,
}

pub async fn run(options: StatusOptions) -> Result<()> {
    let config = Config::load()?;
    let workspace = resolve_workspace(options.path.as_deref());
    let store = StateStore::for_workspace(&Config::state_dir()?, workspace.as_deref());

    println!("{}", "feic-bridge status".bold());
    println!();

    match &workspace {
        Some(root) => println!("  {} {}", "Workspace:".dimmed(), root.display()),
        None => println!("  {} {}", "Workspace:".dimmed(), "none".yellow()),
    }

    let port_state = if port_is_free(config.port) {
        "free".normal()
    } else {
        "in use".yellow()
    };
    println!("  {} {} ({})", "Port:".dimmed(), config.port, port_state);
    println!("  {} {}", "State file:".dimmed(), store.path().display());

    print_persisted(&store.load());

    Ok(())
}

fn port_is_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
}
