//! One-way cancellation signal shared by the foreground and the scheduler

use tokio::sync::watch;

/// Process-wide stop request.
///
/// Starts armed; `signal()` moves it to signalled exactly once and it never
/// returns to armed.
#[derive(Debug)]
pub struct CancellationSignal {
	tx: watch::Sender<bool>,
}

impl CancellationSignal {
	pub fn new() -> Self {
		let (tx, _rx) = watch::channel(false);
		CancellationSignal { tx }
	}

	/// Request a stop. Returns true if this call made the transition.
	pub fn signal(&self) -> bool {
		!self.tx.send_replace(true)
	}

	pub fn is_signalled(&self) -> bool {
		*self.tx.borrow()
	}

	/// Resolves once the signal has been set (immediately if it already is)
	pub async fn signalled(&self) {
		let mut rx = self.tx.subscribe();
		loop {
			let done = *rx.borrow_and_update();
			if done {
				return;
			}
			if rx.changed().await.is_err() {
				return;
			}
		}
	}
}

impl Default for CancellationSignal {
	fn default() -> Self {
		Self::new()
	}
}


// vim: ts=4
