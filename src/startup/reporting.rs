//! Crash reporting setup
//!
//! Installs a process-wide panic hook that records the panic through the
//! logging sink before the default hook runs. Purely additive; the previous
//! hook is preserved and chained.

use crate::config::Settings;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::error;

static INSTALLED: AtomicBool = AtomicBool::new(false);

pub fn install(settings: &Settings) {
    if settings.no_crash_reports {
        return;
    }
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return;
    }
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "unknown".to_string());
        error!(
            version = crate::cli::version(),
            %location,
            "process panicked: {info}"
        );
        previous(info);
    }));
}
