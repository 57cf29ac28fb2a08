//! Ctrl+C handling for the watch loop.
//!
//! The handler only flips a shared flag; the loop checks it between polls and
//! while sleeping, so a load that is already running always completes.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Exit code for SIGINT: 128 + 2.
pub const EXIT_CODE_INTERRUPTED: i32 = 130;

/// Shared "stop requested" flag.
///
/// Clones share one `AtomicBool`, so the Ctrl+C hook, the watch loop and any
/// test can all observe the same request.
///
/// # Example
///
/// ```rust
/// use template_dir::signal::ShutdownHandler;
///
/// let handler = ShutdownHandler::new();
/// let hooked = handler.clone();
///
/// hooked.request_shutdown();
/// assert!(handler.is_shutdown_requested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with the flag initially cleared.
    ///
    /// # Returns
    ///
    /// A new `ShutdownHandler` with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a stop was requested.
    ///
    /// # Returns
    ///
    /// `true` if Ctrl+C was pressed or `request_shutdown()` was called on
    /// this handler or any clone of it.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request a stop. Seen by every clone.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Hook Ctrl+C to a [`ShutdownHandler`].
///
/// The hook is installed once per process; later calls reset and return the
/// same handler. If some other code already owns the Ctrl+C hook, an
/// unhooked handler is returned, which still honours
/// [`ShutdownHandler::request_shutdown`].
///
/// # Returns
///
/// The process-wide handler the watch loop should poll.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the platform refuses the hook
/// for any reason other than an existing handler.
///
/// # Example
///
/// ```rust,no_run
/// use template_dir::signal::install_handler;
///
/// let shutdown = install_handler()?;
/// while !shutdown.is_shutdown_requested() {
///     // poll
/// #   break;
/// }
/// # Ok::<(), template_dir::signal::SignalError>(())
/// ```
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let hooked = handler.clone();
    let installed = ctrlc::set_handler(move || {
        hooked.request_shutdown();
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Finishing current poll...");
        let _ = std::io::stderr().flush();
        log::info!("Shutdown signal received");
    });
    resolve_install(installed, handler)
}

/// Register the outcome of `ctrlc::set_handler` in the global slot.
fn resolve_install(
    installed: Result<(), ctrlc::Error>,
    handler: ShutdownHandler,
) -> Result<ShutdownHandler, SignalError> {
    match installed {
        Ok(()) => Ok(GLOBAL_HANDLER.get_or_init(|| handler).clone()),
        Err(ctrlc::Error::MultipleHandlers) => {
            log::debug!("Ctrl+C is already hooked elsewhere, using an unhooked handler");
            let fallback = GLOBAL_HANDLER.get_or_init(ShutdownHandler::new);
            fallback.reset();
            Ok(fallback.clone())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
