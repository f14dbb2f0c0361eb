//! Diagnostics sink injected into a waiter.

use log::Level;

/// Receives waiter diagnostics. Has no effect on control flow.
pub trait WaitLogger: Send + Sync {
    fn log(&self, level: Level, message: &str);
}

/// Forwards waiter diagnostics to the `log` facade under the `resource_waiter` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFacade;

impl WaitLogger for LogFacade {
    fn log(&self, level: Level, message: &str) {
        log::log!(target: "resource_waiter", level, "{message}");
    }
}
