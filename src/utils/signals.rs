//! Shutdown signal handling

use crate::logging::*;

#[cfg(unix)]
use tokio::signal::unix::{signal, Signal, SignalKind};

/// Listener for SIGINT and SIGTERM.
///
/// Handlers are registered by `install`, so a signal delivered between
/// `install` and `recv` is not lost.
pub struct ShutdownSignals {
	#[cfg(unix)]
	streams: Option<(Signal, Signal)>,
}

impl ShutdownSignals {
	/// Must be called from within the tokio runtime
	pub fn install() -> Self {
		#[cfg(unix)]
		{
			let streams = match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
				(Ok(sigterm), Ok(sigint)) => Some((sigterm, sigint)),
				(Err(e), _) | (_, Err(e)) => {
					warn!("Failed to setup signal handlers: {}. Falling back to Ctrl-C only.", e);
					None
				}
			};
			ShutdownSignals { streams }
		}
		#[cfg(not(unix))]
		{
			ShutdownSignals {}
		}
	}

	/// Wait for the next shutdown request and return the signal name
	pub async fn recv(&mut self) -> &'static str {
		#[cfg(unix)]
		{
			if let Some((sigterm, sigint)) = self.streams.as_mut() {
				return tokio::select! {
					_ = sigterm.recv() => "SIGTERM",
					_ = sigint.recv() => "SIGINT",
				};
			}
		}

		if let Err(e) = tokio::signal::ctrl_c().await {
			// Without any handler the only way out is to be killed
			error!("Failed to listen for Ctrl-C: {}", e);
			std::future::pending::<()>().await;
		}
		"SIGINT"
	}
}

// vim: ts=4
