//! Domain-specific newtypes for type safety.
//!
//! Strongly-typed wrappers for MPRIS positions/lengths and bus session ids so
//! they cannot be mixed up with plain integers and strings. Uses `derive_more`
//! to eliminate arithmetic boilerplate.

use std::fmt;
use std::ops::{AddAssign, Sub};

use derive_more::{Add as DeriveAdd, Display, From, Into};

// ============================================================================
// Microseconds
// ============================================================================

/// A duration or offset in microseconds.
///
/// MPRIS reports both `Position` and `mpris:length` in this unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, DeriveAdd, From, Into,
)]
pub struct Microseconds(pub i64);

impl Microseconds {
    /// Create a new instance.
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    /// Get the inner value.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Check if the value is zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Check if the value is strictly positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Two thirds of this duration, rounded down.
    #[must_use]
    pub const fn two_thirds(self) -> Self {
        Self(self.0.saturating_mul(2).div_euclid(3))
    }

    /// This value as a percentage of `total`; 0 when `total` is not positive.
    #[must_use]
    pub fn percent_of(self, total: Self) -> f64 {
        if total.0 <= 0 {
            return 0.0;
        }
        self.0 as f64 / total.0 as f64 * 100.0
    }
}

impl Sub for Microseconds {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Microseconds {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl fmt::Display for Microseconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_seconds = self.0 / 1_000_000;
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        match (hours, minutes) {
            (0, 0) => write!(f, "{seconds}s"),
            (0, _) => write!(f, "{minutes}m {seconds}s"),
            _ => write!(f, "{hours}h {minutes}m {seconds}s"),
        }
    }
}

// ============================================================================
// SessionId
// ============================================================================

/// Opaque identifier of one connected player, the unique bus name of the
/// sender (e.g. `:1.500`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From, Into)]
pub struct SessionId(String);

impl SessionId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
