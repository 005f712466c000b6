//! Color and styling helpers for CLI output.
//!
//! Semantic Color Theme:
//!   - Success/Done:   green   (completed stages)
//!   - Warning/Active: yellow  (in_progress stages, delays)
//!   - Error/Blocked:  red     (blockers, critical stages)
//!   - Info/Reference: cyan    (stage IDs)
//!   - Muted:          dimmed  (field labels, item IDs)
//!   - Emphasis:       bold    (section headers)
//!   - Chains:         truecolor from the configured palette

use crate::config::parse_color;
use crate::domain::StageStatus;
use colored::Colorize;

use super::OutputConfig;

/// Apply semantic "success" color (green) to text.
pub fn success(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.green().to_string()
}

/// Apply semantic "error" color (red) to text.
pub fn error(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.red().to_string()
}

/// Apply semantic "warning" color (yellow) to text.
pub fn warning(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.yellow().to_string()
}

/// Apply color to status text based on stage status.
pub(crate) fn colorize_status(status: StageStatus, config: &OutputConfig) -> String {
    let text = format!("{status}");
    if !config.use_colors {
        return text;
    }
    match status {
        StageStatus::Pending => text.white().to_string(),
        StageStatus::InProgress => text.yellow().to_string(),
        StageStatus::Completed => text.green().to_string(),
    }
}

/// Colorize a stage ID (cyan).
pub(crate) fn colorize_id(id: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return id.to_string();
    }
    id.cyan().to_string()
}

/// Paint text with a `#rrggbb` chain color; unparseable colors leave it plain.
pub(crate) fn chain_colored(text: &str, hex: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    match parse_color(hex) {
        Some((r, g, b)) => text.truecolor(r, g, b).to_string(),
        None => text.to_string(),
    }
}

/// Get a colored status icon, with ASCII fallback support.
pub(crate) fn colored_status_icon(status: StageStatus, config: &OutputConfig) -> String {
    let icon = if config.use_ascii {
        match status {
            StageStatus::Pending => "o",
            StageStatus::InProgress => ">",
            StageStatus::Completed => "+",
        }
    } else {
        match status {
            StageStatus::Pending => "○",
            StageStatus::InProgress => "▶",
            StageStatus::Completed => "✓",
        }
    };

    if !config.use_colors {
        return icon.to_string();
    }

    match status {
        StageStatus::Pending => icon.white().to_string(),
        StageStatus::InProgress => icon.yellow().to_string(),
        StageStatus::Completed => icon.green().to_string(),
    }
}

/// Apply dimmed style to text (for labels/field names).
pub(crate) fn dimmed(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.dimmed().to_string()
}

/// Apply bold style to text (for section headers).
pub(crate) fn bold(text: &str, config: &OutputConfig) -> String {
    if !config.use_colors {
        return text.to_string();
    }
    text.bold().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use colored::control::set_override;
    use std::sync::{Mutex, MutexGuard};

    static GLOBAL_STATE_MUTEX: Mutex<()> = Mutex::new(());

    struct ColorGuard<'a> {
        _guard: MutexGuard<'a, ()>,
    }

    impl<'a> ColorGuard<'a> {
        fn new() -> Self {
            let guard = GLOBAL_STATE_MUTEX.lock().unwrap();
            set_override(true);
            Self { _guard: guard }
        }
    }

    impl Drop for ColorGuard<'_> {
        fn drop(&mut self) {
            set_override(false);
        }
    }

    fn with_colors_enabled<F, R>(f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let _guard = ColorGuard::new();
        f()
    }

    #[test]
    fn test_colorize_status_contains_ansi_codes() {
        with_colors_enabled(|| {
            let config = OutputConfig::new(false, true);
            for status in [
                StageStatus::Pending,
                StageStatus::InProgress,
                StageStatus::Completed,
            ] {
                let text = colorize_status(status, &config);
                assert!(text.contains(&status.to_string()));
                assert!(text.contains("\x1b["), "{status} should have ANSI codes");
            }
        });
    }

    #[test]
    fn test_no_colors_returns_plain_text() {
        let config = OutputConfig::new(false, false);
        assert_eq!(colorize_status(StageStatus::InProgress, &config), "in_progress");
        assert_eq!(colorize_id("stg-a1b2", &config), "stg-a1b2");
        assert_eq!(chain_colored("chain 0", "#3b82f6", &config), "chain 0");
        assert_eq!(bold("Dependencies", &config), "Dependencies");
    }

    #[test]
    fn test_chain_colored_has_ansi_codes() {
        with_colors_enabled(|| {
            let config = OutputConfig::new(false, true);
            let text = chain_colored("chain 0", "#3b82f6", &config);
            assert!(text.contains("chain 0"));
            assert!(text.contains("\x1b["), "got {text:?}");
        });
    }

    #[test]
    fn test_chain_colored_bad_hex_is_plain() {
        with_colors_enabled(|| {
            let config = OutputConfig::new(false, true);
            assert_eq!(chain_colored("x", "blue", &config), "x");
        });
    }

    #[test]
    fn test_ascii_status_icons() {
        let config = OutputConfig::new(true, false);
        assert_eq!(colored_status_icon(StageStatus::Pending, &config), "o");
        assert_eq!(colored_status_icon(StageStatus::InProgress, &config), ">");
        assert_eq!(colored_status_icon(StageStatus::Completed, &config), "+");
    }
}
