use core::fmt;
use core::time::Duration;

/// Time source used to stamp the start of each packet.
pub trait Clock {
    type Instant: Copy + fmt::Debug;

    fn now(&self) -> Self::Instant;

    /// Time passed between `since` and now.
    fn elapsed(&self, since: Self::Instant) -> Duration;
}

/// For receivers that don't care when packets start. Time never moves, so
/// packet timeouts never fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoClock;

impl Clock for NoClock {
    type Instant = ();

    fn now(&self) {}

    fn elapsed(&self, _since: ()) -> Duration {
        Duration::ZERO
    }
}

/// Wraps a millisecond tick counter, e.g. a HAL's `millis()` or a systick
/// based uptime.
pub struct MillisClock<F> {
    millis: F,
}

impl<F: Fn() -> u64> MillisClock<F> {
    pub fn new(millis: F) -> MillisClock<F> {
        MillisClock { millis }
    }
}

impl<F> fmt::Debug for MillisClock<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MillisClock").finish_non_exhaustive()
    }
}

impl<F: Fn() -> u64> Clock for MillisClock<F> {
    type Instant = u64;

    fn now(&self) -> u64 {
        (self.millis)()
    }

    fn elapsed(&self, since: u64) -> Duration {
        Duration::from_millis(self.now().saturating_sub(since))
    }
}

#[cfg(feature = "std")]
#[derive(Debug, Clone, Copy, Default)]
pub struct StdClock;

#[cfg(feature = "std")]
impl Clock for StdClock {
    type Instant = std::time::Instant;

    fn now(&self) -> Self::Instant {
        std::time::Instant::now()
    }

    fn elapsed(&self, since: Self::Instant) -> Duration {
        since.elapsed()
    }
}
