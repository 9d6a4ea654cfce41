//! Progress reporting hook for long-running analyses.

use std::panic::{catch_unwind, AssertUnwindSafe};

/// Callback receiving `(description, current, total)` at each checkpoint.
pub type ProgressCallback = Box<dyn Fn(&str, usize, usize) + Send + Sync>;

/// Fire-and-forget progress reporter.
///
/// A panicking callback is caught and logged; it never aborts the caller.
#[derive(Default)]
pub struct Progress {
    callback: Option<ProgressCallback>,
}

impl Progress {
    /// Reporter that discards every checkpoint.
    pub fn none() -> Self {
        Self { callback: None }
    }

    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str, usize, usize) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Box::new(callback)),
        }
    }

    /// Report a checkpoint.
    pub fn report(&self, description: &str, current: usize, total: usize) {
        let Some(ref callback) = self.callback else {
            return;
        };
        if catch_unwind(AssertUnwindSafe(|| callback(description, current, total))).is_err() {
            tracing::warn!(
                description,
                current,
                total,
                "Progress callback panicked; continuing"
            );
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("has_callback", &self.callback.is_some())
            .finish()
    }
}

/// Integer percentage for a checkpoint; `total == 0` reads as 0 %.
pub fn percent(current: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    (current.saturating_mul(100) / total).min(100) as u8
}
