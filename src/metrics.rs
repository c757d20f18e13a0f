use metrics::{counter, histogram};
use std::time::Duration;

use crate::error::Rejection;

/// Names of the metrics the message pipeline records
pub struct InterpreterMetrics {
    pub messages_total: &'static str,
    pub rejections_total: &'static str,
    pub message_duration: &'static str,
}

impl Default for InterpreterMetrics {
    fn default() -> Self {
        Self {
            messages_total: "tables_sms_messages_total",
            rejections_total: "tables_sms_rejections_total",
            message_duration: "tables_sms_message_duration_seconds",
        }
    }
}

impl InterpreterMetrics {
    /// Record a message that ended in `outcome` (`inserted`, `responded`,
    /// `not_handled` or `error`)
    pub fn record_message(&self, outcome: &'static str, duration: Duration) {
        counter!(self.messages_total, "outcome" => outcome).increment(1);
        histogram!(self.message_duration).record(duration.as_secs_f64());
    }

    /// Record why a message was not handled
    pub fn record_rejection(&self, rejection: &Rejection) {
        counter!(self.rejections_total, "reason" => rejection.reason()).increment(1);
    }
}
