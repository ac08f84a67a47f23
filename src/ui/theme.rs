//! Colors and glyphs for status output

use colored::{Color, ColoredString, Colorize};

use crate::core::lifecycle::LifecycleState;

pub struct Theme;

impl Theme {
    pub const CONNECTED: Color = Color::TrueColor {
        r: 57,
        g: 255,
        b: 20,
    };
    pub const PENDING: Color = Color::TrueColor {
        r: 255,
        g: 215,
        b: 0,
    }; // Gold
    pub const ERRORED: Color = Color::TrueColor {
        r: 255,
        g: 99,
        b: 71,
    }; // Tomato
    pub const DIM: Color = Color::TrueColor {
        r: 140,
        g: 140,
        b: 140,
    };

    pub fn state_color(state: LifecycleState) -> Color {
        match state {
            LifecycleState::Running => Self::CONNECTED,
            LifecycleState::Starting | LifecycleState::Stopping => Self::PENDING,
            LifecycleState::Error => Self::ERRORED,
            LifecycleState::Stopped => Self::DIM,
        }
    }

    pub fn state_icon(state: LifecycleState) -> &'static str {
        match state {
            LifecycleState::Running => Glyphs::TOWER,
            LifecycleState::Starting | LifecycleState::Stopping => Glyphs::HALF,
            LifecycleState::Error => Glyphs::CROSS_MARK,
            LifecycleState::Stopped => Glyphs::SLASHED,
        }
    }

    /// `icon label` in the state's color
    pub fn badge(state: LifecycleState) -> ColoredString {
        format!("{} {}", Self::state_icon(state), state.label())
            .color(Self::state_color(state))
            .bold()
    }
}

pub struct Glyphs;

impl Glyphs {
    pub const TOWER: &'static str = "◉";
    pub const HALF: &'static str = "◐";
    pub const SLASHED: &'static str = "⊘";
    pub const CROSS_MARK: &'static str = "✗";
    pub const ARROW_RIGHT: &'static str = "▶";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_state_has_distinct_icon_or_color() {
        assert_eq!(Theme::state_color(LifecycleState::Running), Theme::CONNECTED);
        assert_eq!(Theme::state_color(LifecycleState::Error), Theme::ERRORED);
        assert_ne!(
            Theme::state_icon(LifecycleState::Running),
            Theme::state_icon(LifecycleState::Stopped)
        );
        assert!(Theme::badge(LifecycleState::Error)
            .to_string()
            .contains("FEIC errored"));
    }
}
