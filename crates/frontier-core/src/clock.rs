//! Tick counter for the Frontier simulation.
//!
//! The clock is the single source of truth for simulated time. It counts
//! ticks and converts them to simulated milliseconds using the configured
//! tick interval. All arithmetic is checked.

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,
}

/// Simulation clock.
///
/// Starts at tick 0; the first call to [`advance`](Self::advance) yields
/// tick 1, so tick numbers in summaries are one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickClock {
    tick: u64,
    tick_interval_ms: u64,
}

impl TickClock {
    /// Create a clock at tick 0.
    pub const fn new(tick_interval_ms: u64) -> Self {
        Self {
            tick: 0,
            tick_interval_ms,
        }
    }

    /// Create a clock at an arbitrary tick (state restoration, tests).
    pub const fn from_parts(tick: u64, tick_interval_ms: u64) -> Self {
        Self {
            tick,
            tick_interval_ms,
        }
    }

    /// Advance by one tick and return the new tick number.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] at `u64::MAX`.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// Current tick number.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Real-time milliseconds between ticks.
    pub const fn tick_interval_ms(&self) -> u64 {
        self.tick_interval_ms
    }

    /// Simulated milliseconds elapsed, saturating at `u64::MAX`.
    pub const fn elapsed_ms(&self) -> u64 {
        self.tick.saturating_mul(self.tick_interval_ms)
    }
}

impl Default for TickClock {
    fn default() -> Self {
        Self::new(100)
    }
}
