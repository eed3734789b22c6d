//! Graceful shutdown handling.
//!
//! The first Ctrl+C sets the shutdown flag and kills registered
//! subprocesses so the dispatcher can finish logging and exit cleanly;
//! repeated interrupts force-quit with the conventional 130 exit code.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::process_registry::PROCESS_REGISTRY;

/// Global flag indicating shutdown has been requested.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Counter of received interrupts (for force-quit on repeated presses).
static INTERRUPT_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Maximum number of interrupts before force-quitting.
const MAX_INTERRUPTS: usize = 3;

/// Register the Ctrl+C handler. Call once at program startup.
pub fn register_handler() -> Result<(), String> {
    ctrlc::set_handler(move || {
        let count = INTERRUPT_COUNT.fetch_add(1, Ordering::SeqCst) + 1;

        if count >= MAX_INTERRUPTS {
            eprintln!("\nForce quit (received {} interrupts)", count);
            std::process::exit(130);
        }

        if count == 1 {
            eprintln!("\nInterrupt received. Finishing current stage...");
            eprintln!(
                "(Press Ctrl+C {} more time(s) to force quit)",
                MAX_INTERRUPTS - count
            );
            SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
            PROCESS_REGISTRY.kill_all();
        } else {
            eprintln!(
                "(Press Ctrl+C {} more time(s) to force quit)",
                MAX_INTERRUPTS - count
            );
        }
    })
    .map_err(|e| format!("failed to register Ctrl+C handler: {}", e))
}

/// Check if shutdown has been requested.
pub fn requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::SeqCst)
}

/// Programmatically request shutdown (used by tests).
pub fn request() {
    SHUTDOWN_REQUESTED.store(true, Ordering::SeqCst);
}

/// Reset the shutdown state (used by tests).
pub fn reset() {
    SHUTDOWN_REQUESTED.store(false, Ordering::SeqCst);
    INTERRUPT_COUNT.store(0, Ordering::SeqCst);
}

#[cfg(test)]
pub fn test_lock() -> std::sync::MutexGuard<'static, ()> {
    static LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());
    LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_and_reset() {
        let _guard = test_lock();
        reset();
        assert!(!requested());
        request();
        assert!(requested());
        reset();
        assert!(!requested());
    }
}
