//! Terminal awareness for logging decisions

use crossterm::tty::IsTty;

/// Whether standard output is attached to an interactive terminal.
pub fn stdout_is_interactive() -> bool {
    std::io::stdout().is_tty()
}

/// Console logging must stay on when output is piped or redirected, or log
/// records would silently vanish. Not user-overridable.
pub fn should_force_console_logging(interactive: bool) -> bool {
    !interactive
}
