use evdev_rs::TimeVal;

const USEC_PER_SEC: i64 = 1_000_000;

pub(crate) trait AsMicros {
    /// Convert to microseconds on the monotonic clock.
    ///
    /// Assumes the device fd has been switched to `CLOCK_MONOTONIC`, so the
    /// timestamp is never meaningfully negative.
    fn as_micros(&self) -> u64;
}

impl AsMicros for TimeVal {
    fn as_micros(&self) -> u64 {
        (self.tv_sec * USEC_PER_SEC + self.tv_usec).max(0) as u64
    }
}

pub(crate) fn micros_to_timeval(micros: u64) -> TimeVal {
    TimeVal {
        tv_sec: (micros / USEC_PER_SEC as u64) as i64,
        tv_usec: (micros % USEC_PER_SEC as u64) as i64,
    }
}

/// Current `CLOCK_MONOTONIC` time in microseconds.
pub(crate) fn now_micros() -> u64 {
    let mut ts = libc::timespec {
        tv_sec: 0,
        tv_nsec: 0,
    };
    // cannot fail for CLOCK_MONOTONIC with a valid timespec
    unsafe { libc::clock_gettime(libc::CLOCK_MONOTONIC, &mut ts) };
    ts.tv_sec as u64 * 1_000_000 + ts.tv_nsec as u64 / 1_000
}
