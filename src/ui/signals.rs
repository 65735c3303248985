use crate::error::{CombineError, Result};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

const RUNNING: u8 = 0;
const STOPPING: u8 = 1;
const FORCED: u8 = 2;

/// Ctrl+C state shared with the batch.
///
/// The first Ctrl+C stops the batch before the next item. The second cancels
/// the item in flight, which kills the office process and still closes the
/// session. A third exits immediately.
#[derive(Clone)]
pub struct GracefulShutdown {
    state: Arc<AtomicU8>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let state = Arc::new(AtomicU8::new(RUNNING));
        let handler_state = state.clone();

        ctrlc::set_handler(move || match handler_state.fetch_add(1, Ordering::SeqCst) {
            RUNNING => {
                eprintln!("\n🛑 Stopping after the current file... (press Ctrl+C again to cancel it)");
            }
            STOPPING => {
                eprintln!("\n🛑 Cancelling the current file...");
            }
            _ => {
                eprintln!("\n💀 Force stopping...");
                std::process::exit(130);
            }
        })
        .map_err(|e| CombineError::Config {
            message: format!("Failed to set signal handler: {}", e),
        })?;

        Ok(Self { state })
    }

    /// No signal handler registration.
    pub fn new_for_test() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(RUNNING)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.state.load(Ordering::SeqCst) == RUNNING
    }

    pub fn is_forced(&self) -> bool {
        self.state.load(Ordering::SeqCst) >= FORCED
    }

    pub fn check_shutdown(&self) -> Result<()> {
        if !self.is_running() {
            return Err(CombineError::Interrupted);
        }
        Ok(())
    }

    pub fn request_shutdown(&self) {
        let _ = self
            .state
            .compare_exchange(RUNNING, STOPPING, Ordering::SeqCst, Ordering::SeqCst);
    }

    /// Same as a second Ctrl+C.
    pub fn force_shutdown(&self) {
        self.state.fetch_max(FORCED, Ordering::SeqCst);
    }

    /// Resolves once the item in flight must be abandoned.
    pub async fn forced(&self) {
        while !self.is_forced() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Default for GracefulShutdown {
    fn default() -> Self {
        // Handler registration fails when one is already installed.
        Self::new().unwrap_or_else(|_| Self::new_for_test())
    }
}
