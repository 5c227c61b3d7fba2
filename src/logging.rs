//! Thin severity layer on top of `log`/`pretty_env_logger`, matching the six
//! severities the host-facing contract promises (Trace, Todo, Info, Warn,
//! Error, Fatal). `log` has no `Todo` or `Fatal` level, so `Todo` is logged
//! through `log::warn!` directly at its call sites and `Fatal` is modeled
//! below as `log::Level::Error` plus a process abort.

use std::process;

/// Installs the process-wide logger. Call once, before `Engine::init`.
pub fn init() {
    pretty_env_logger::init();
}

/// `evk_Fatal` severity: logs at `error!` then aborts the process, per the
/// failure semantics in spec §4 ("Fatal severity aborts").
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)+) => {{
        log::error!(target: "evk::fatal", $($arg)+);
        $crate::logging::abort_fatal();
    }};
}

#[doc(hidden)]
pub fn abort_fatal() -> ! {
    process::abort()
}
