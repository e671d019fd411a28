use chrono::{DateTime, Duration, Utc};

/// Source of wall-clock timestamps for snapshots.
///
/// Countdown ticks never read this; they run on the async runtime's clock.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    #[must_use]
    pub fn fixed(at: DateTime<Utc>) -> Self {
        Self::Fixed(at)
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        match *self {
            Self::System => Utc::now(),
            Self::Fixed(at) => at,
        }
    }

    /// Move a fixed clock forward. A system clock is left alone.
    pub fn advance(&mut self, delta: Duration) {
        if let Self::Fixed(at) = self {
            *at += delta;
        }
    }
}

/// Render remaining seconds as `MM:SS`, or `H:MM:SS` from one hour up.
#[must_use]
pub fn format_countdown(seconds: u32) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes:02}:{secs:02}")
    }
}

/// 2023-11-14T22:13:20Z, used to stamp snapshots in tests.
pub const FIXED_TEST_TIMESTAMP: i64 = 1_700_000_000;

/// # Panics
///
/// Never in practice: the constant is a representable timestamp.
#[must_use]
pub fn fixed_now() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(FIXED_TEST_TIMESTAMP, 0)
        .expect("fixed timestamp is in range")
}

#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_now())
}
