use colored::Colorize;

use super::theme::{Glyphs, Theme};
use crate::core::lifecycle::{LifecycleState, StatusReporter};
use crate::core::search::MatchLocation;
use crate::core::state::{ServerState, Status};

/// Status indicator printed to the terminal
pub struct ConsoleStatus;

impl StatusReporter for ConsoleStatus {
    fn set_status(&self, state: LifecycleState, detail: &str) {
        match state {
            LifecycleState::Error => eprintln!("{} {}", Theme::badge(state), detail.red()),
            _ => println!("{} {}", Theme::badge(state), detail.dimmed()),
        }
    }
}

pub fn print_persisted(state: &ServerState) {
    let status = match state.last_status {
        Status::Running => state.last_status.as_str().color(Theme::CONNECTED),
        Status::Stopped => state.last_status.as_str().color(Theme::DIM),
        Status::Error => state.last_status.as_str().color(Theme::ERRORED),
    };
    println!("  {} {}", "Last status:".dimmed(), status);
    println!(
        "  {} {}",
        "Resumes on launch:".dimmed(),
        if state.is_running { "yes" } else { "no" }
    );
    if let Some(updated_at) = &state.updated_at {
        println!("  {} {}", "Updated:".dimmed(), updated_at);
    }
}

pub fn print_location(location: &MatchLocation) {
    println!("{} {}", Glyphs::ARROW_RIGHT.color(Theme::CONNECTED), location);
}

pub fn print_not_found(pattern: &str) {
    println!(
        "{} {}",
        Glyphs::CROSS_MARK.color(Theme::DIM),
        format!("No match for {:?}", pattern).dimmed()
    );
}
