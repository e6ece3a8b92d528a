//! Services the surrounding platform injects into the engine.

use std::thread;
use std::time::Duration;

/// Provider of the controller core clock rate.
///
/// Queried once per mode-set; platforms that rescale the core clock get
/// correct dividers on the next configure.
pub trait ClockSource {
    /// Current source clock rate, in kHz.
    fn rate_khz(&self) -> u32;
}

/// A clock that never changes rate. Covers most platforms, and tests.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FixedClock(pub u32);

impl ClockSource for FixedClock {
    fn rate_khz(&self) -> u32 {
        self.0
    }
}

/// Blocking delay used between busy-flag polls.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Delay backed by [`std::thread::sleep`].
#[derive(Debug, Default, Copy, Clone)]
pub struct HostDelay;

impl Delay for HostDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(u64::from(ms)));
    }
}

/// External power rail hook. Called with `false` before the rail should
/// drop (suspend) and `true` once the controller is back up (resume).
pub type PowerHook = Box<dyn FnMut(bool)>;
