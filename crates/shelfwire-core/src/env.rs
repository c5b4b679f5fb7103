//! Environment abstraction for deterministic testing.
//!
//! Decouples channel logic from the system clock. Production uses real time;
//! the simulation harness uses a virtual clock it advances explicitly, so
//! reconnection delays and heart-beat timeouts can be tested without waiting.

use std::{
    fmt::Debug,
    ops::{Add, Sub},
    time::Duration,
};

/// Instant type usable by the state machines.
///
/// Blanket-implemented for anything that behaves like `std::time::Instant`.
pub trait MonotonicInstant:
    Copy + Ord + Send + Sync + Debug + Sub<Output = Duration> + Add<Duration, Output = Self>
{
}

impl<T> MonotonicInstant for T where
    T: Copy + Ord + Send + Sync + Debug + Sub<Output = Duration> + Add<Duration, Output = Self>
{
}

/// Abstract environment providing time and async sleeping.
///
/// # Invariants
///
/// - `now()` never goes backwards
/// - `wall_clock_millis()` is only used for display (receipt timestamps),
///   never for scheduling
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`, simulation
    /// environments use virtual time.
    type Instant: MonotonicInstant;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only driver code awaits this; the state machines never sleep.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Milliseconds since the Unix epoch.
    fn wall_clock_millis(&self) -> i64;
}
