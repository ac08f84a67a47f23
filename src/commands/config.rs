use anyhow::Result;
use colored::Colorize;

use crate::core::config::Config;
use crate::core::scanner::normalize_extension;

pub struct ConfigOptions {
    pub port: Option<u16>,
    pub ignore_dirs: Vec<String>,
    pub file_types: Vec<String>,
    pub timeout_ms: Option<u64>,
    pub respect_gitignore: Option<bool>,
    pub show: bool,
    pub reset: bool,
}

pub async fn run(options: ConfigOptions) -> Result<()> {
    if options.reset {
        Config::default().save()?;
        println!("{}", "✓ Configuration reset to defaults".green());
        return Ok(());
    }

    let mut config = Config::load()?;

    if options.show {
        show_config(&config);
        return Ok(());
    }

    let mut updated = false;

    if let Some(port) = options.port {
        if port == 0 {
            println!("{}", "Error: port must be between 1 and 65535".red());
            return Ok(());
        }
        config.port = port;
        updated = true;
        println!("{}", "✓ Port updated".green());
    }

    if !options.ignore_dirs.is_empty() {
        config.ignore_dirs = options.ignore_dirs;
        updated = true;
        println!("{}", "✓ Ignored directories updated".green());
    }

    if !options.file_types.is_empty() {
        let types: Vec<String> = options
            .file_types
            .iter()
            .filter_map(|t| normalize_extension(t))
            .collect();
        if types.is_empty() {
            println!("{}", "Error: no usable file types given".red());
            return Ok(());
        }
        config.file_types = types;
        updated = true;
        println!("{}", "✓ Default file types updated".green());
    }

    if let Some(timeout_ms) = options.timeout_ms {
        // 0 clears the deadline
        config.search_timeout_ms = (timeout_ms > 0).then_some(timeout_ms);
        updated = true;
        println!("{}", "✓ Search timeout updated".green());
    }

    if let Some(respect) = options.respect_gitignore {
        config.respect_gitignore = respect;
        updated = true;
        println!("{}", "✓ .gitignore handling updated".green());
    }

    if updated {
        config.save()?;
    } else {
        show_config(&config);
    }

    Ok(())
}

fn show_config(config: &Config) {
    println!("{}", "Current configuration:".bold());
    println!();
    println!("  {} {}", "Port:".dimmed(), config.port);
    println!("  {} {}", "File types:".dimmed(), config.file_types.join(", "));
    println!(
        "  {} {}",
        "Ignored directories:".dimmed(),
        config.ignore_dirs.join(", ")
    );
    println!(
        "  {} {}",
        "Respect .gitignore:".dimmed(),
        config.respect_gitignore
    );
    match config.search_timeout_ms {
        Some(ms) => println!("  {} {}ms", "Search timeout:".dimmed(), ms),
        None => println!("  {} {}", "Search timeout:".dimmed(), "none".dimmed()),
    }
    if let Ok(path) = Config::config_path() {
        println!();
        println!("  {} {}", "Config file:".dimmed(), path.display());
    }
}
