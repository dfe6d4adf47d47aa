//! Process-wide configuration: worker thread count and status printing.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

// 0 means "use all hardware threads".
static NUM_THREADS: AtomicUsize = AtomicUsize::new(0);
static PRINT_STATUS: AtomicBool = AtomicBool::new(false);

fn hardware_threads() -> usize {
    thread::available_parallelism().map_or(1, usize::from)
}

/// Set the default number of worker threads for all kernels.
///
/// `0` restores the default (one worker per hardware thread).
/// Non-zero values are clamped to `[1, hardware_concurrency]`.
pub fn set_num_threads(threads: usize) {
    let threads = if threads == 0 {
        0
    } else {
        threads.clamp(1, hardware_threads())
    };
    NUM_THREADS.store(threads, Ordering::Relaxed);
}

/// Get the effective default number of worker threads.
#[must_use]
pub fn get_num_threads() -> usize {
    match NUM_THREADS.load(Ordering::Relaxed) {
        0 => hardware_threads(),
        n => n.min(hardware_threads()),
    }
}

/// Enable or disable the in-place status line on stdout.
pub fn set_print_status(enabled: bool) {
    PRINT_STATUS.store(enabled, Ordering::Relaxed);
}

/// Whether status printing is currently enabled.
#[must_use]
pub fn is_print() -> bool {
    PRINT_STATUS.load(Ordering::Relaxed)
}
