//! Billing policy seam
//!
//! The completed step's modification-window summary is fully delegated
//! here; the workflow core never computes billing rules itself.

use pfw_common::db::ProgressRow;

/// Free-edit window queries against a user's finalized progress
pub trait BillingPolicy: Send + Sync {
    /// Whether the user may still edit selections without charge
    fn is_within_free_edit_window(&self, progress: &ProgressRow, window_hours: u32) -> bool;

    /// Seconds remaining in the free-edit window (zero once elapsed or
    /// when nothing was finalized yet)
    fn remaining_seconds(&self, progress: &ProgressRow, window_hours: u32) -> i64;
}

/// Default policy: the window opens at finalize time
pub struct EditWindowPolicy;

impl BillingPolicy for EditWindowPolicy {
    fn is_within_free_edit_window(&self, progress: &ProgressRow, window_hours: u32) -> bool {
        self.remaining_seconds(progress, window_hours) > 0
    }

    fn remaining_seconds(&self, progress: &ProgressRow, window_hours: u32) -> i64 {
        let Some(finalized_at) = progress.finalized_at else {
            return 0;
        };
        let deadline = finalized_at + chrono::Duration::hours(window_hours as i64);
        (deadline - chrono::Utc::now()).num_seconds().max(0)
    }
}
