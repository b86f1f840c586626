/// The single one-shot timer the tap machine multiplexes between its tap
/// and drag timeouts. Deadlines are absolute monotonic microseconds; arming
/// overwrites any earlier deadline, cancelling is idempotent.
#[derive(Debug, Default)]
pub(crate) struct OneShotTimer {
    deadline: Option<u64>,
}

impl OneShotTimer {
    pub(crate) fn new() -> Self {
        Self { deadline: None }
    }

    pub(crate) fn set(&mut self, deadline: u64) {
        self.deadline = Some(deadline);
    }

    pub(crate) fn cancel(&mut self) {
        self.deadline = None;
    }

    pub(crate) fn deadline(&self) -> Option<u64> {
        self.deadline
    }

    pub(crate) fn expired(&self, now: u64) -> bool {
        matches!(self.deadline, Some(deadline) if deadline <= now)
    }

    /// Timeout argument for `poll(2)`: milliseconds until the deadline,
    /// rounded up so we never wake before it, or `None` when unarmed.
    pub(crate) fn poll_timeout_ms(&self, now: u64) -> Option<i32> {
        self.deadline.map(|deadline| {
            let micros = deadline.saturating_sub(now);
            ((micros + 999) / 1000).min(i32::MAX as u64) as i32
        })
    }
}
