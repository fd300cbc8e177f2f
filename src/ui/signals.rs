use crate::error::{Result, SqlSheetError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Exit status used when the run stops because of Ctrl+C.
pub const CANCELLED_EXIT_CODE: i32 = 130;

/// Ctrl+C flag checked between documents and between pipeline files.
pub struct GracefulShutdown {
    running: Arc<AtomicBool>,
    interrupted_once: Arc<AtomicBool>,
}

impl GracefulShutdown {
    pub fn new() -> Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let interrupted_once = Arc::new(AtomicBool::new(false));

        let running_clone = running.clone();
        let interrupted_clone = interrupted_once.clone();

        ctrlc::set_handler(move || {
            running_clone.store(false, Ordering::SeqCst);

            if !interrupted_clone.swap(true, Ordering::SeqCst) {
                eprintln!("\nStopping after the current item... (press Ctrl+C again to force exit)");
            } else {
                eprintln!("\nForce stopping.");
                std::process::exit(CANCELLED_EXIT_CODE);
            }
        })
        .map_err(|e| SqlSheetError::Config {
            message: format!("Failed to set signal handler: {}", e),
        })?;

        Ok(Self {
            running,
            interrupted_once,
        })
    }

    /// Instance without a registered handler, for tests and embedding.
    pub fn new_for_test() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            interrupted_once: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn check_shutdown(&self) -> Result<()> {
        if !self.is_running() {
            return Err(SqlSheetError::Cancelled);
        }
        Ok(())
    }

    pub fn request_shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.running.store(true, Ordering::SeqCst);
        self.interrupted_once.store(false, Ordering::SeqCst);
    }

    pub fn with_shutdown_check<F, R>(&self, operation: F) -> Result<R>
    where
        F: FnOnce() -> Result<R>,
    {
        self.check_shutdown()?;
        let result = operation()?;
        self.check_shutdown()?;
        Ok(result)
    }
}
