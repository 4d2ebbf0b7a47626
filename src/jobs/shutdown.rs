//! # Termination signals for the dispatcher.
//!
//! [`ShutdownSignal::register`] installs the listeners up front so that registration
//! errors surface before the dispatcher starts consuming.
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`.
//! **Other platforms:** `Ctrl-C` via [`tokio::signal::ctrl_c`].

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Registered termination signal listeners.
pub(crate) struct ShutdownSignal {
    #[cfg(unix)]
    listeners: [Signal; 3],
}

impl ShutdownSignal {
    /// Registers the listeners. Must be called inside a tokio runtime.
    #[cfg(unix)]
    pub(crate) fn register() -> std::io::Result<Self> {
        Ok(Self {
            listeners: [
                signal(SignalKind::interrupt())?,
                signal(SignalKind::terminate())?,
                signal(SignalKind::quit())?,
            ],
        })
    }

    /// Registers the listeners.
    #[cfg(not(unix))]
    pub(crate) fn register() -> std::io::Result<Self> {
        Ok(Self {})
    }

    /// Completes when any termination signal arrives.
    #[cfg(unix)]
    pub(crate) async fn recv(&mut self) -> &'static str {
        let [sigint, sigterm, sigquit] = &mut self.listeners;
        tokio::select! {
            _ = sigint.recv() => "SIGINT",
            _ = sigterm.recv() => "SIGTERM",
            _ = sigquit.recv() => "SIGQUIT",
        }
    }

    /// Completes when Ctrl-C arrives.
    #[cfg(not(unix))]
    pub(crate) async fn recv(&mut self) -> &'static str {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "CTRL_C",
            Err(e) => {
                tracing::error!(error = %e, "ctrl-c listener failed");
                std::future::pending().await
            }
        }
    }
}
