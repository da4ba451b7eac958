use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------        Vnd        -----------------------------------------------------------
/// A whole number of Vietnamese đồng. The đồng has no minor unit, so bank transfer amounts are always integral and
/// amount comparisons are exact.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Vnd(i64);

op!(binary Vnd, Add, add);
op!(binary Vnd, Sub, sub);
op!(inplace Vnd, SubAssign, sub_assign);
op!(unary Vnd, Neg, neg);

impl Sum for Vnd {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in đồng: {0}")]
pub struct VndConversionError(String);

impl From<i64> for Vnd {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Vnd {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Vnd {}

impl TryFrom<u64> for Vnd {
    type Error = VndConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(VndConversionError(format!("Value {} is too large to convert to Vnd", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Vnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}₫", self.0)
    }
}

impl Vnd {
    pub const fn from_vnd(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Scales by an untrusted quantity. `None` on overflow.
    pub fn checked_mul(self, rhs: i64) -> Option<Self> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Applies a percentage discount, rounding down to the nearest đồng. The intermediate product is computed at
    /// i128, so any `percent` in 0..=100 is safe for the full i64 range.
    pub fn percent_off(&self, percent: i64) -> Self {
        Self((i128::from(self.0) * i128::from(percent) / 100) as i64)
    }
}
