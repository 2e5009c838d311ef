//! Epsilon-tolerant floating point comparison.
//!
//! The tolerance is the machine epsilon of each float width, found by halving
//! until `1 + eps / 2` rounds back to `1`. It is computed on first use and
//! reused for the rest of the process.

use std::cmp::Ordering;

use lazy_static::lazy_static;

lazy_static! {
    static ref EPSILON_F64: f64 = {
        let mut eps = 1.0f64;
        while 1.0 + eps / 2.0 != 1.0 {
            eps /= 2.0;
        }
        eps
    };
    static ref EPSILON_F32: f32 = {
        let mut eps = 1.0f32;
        while 1.0 + eps / 2.0 != 1.0 {
            eps /= 2.0;
        }
        eps
    };
}

/// Smallest `eps` such that `1.0 + eps != 1.0` for `f64`.
#[inline]
pub fn epsilon_f64() -> f64 {
    *EPSILON_F64
}

/// Smallest `eps` such that `1.0 + eps != 1.0` for `f32`.
#[inline]
pub fn epsilon_f32() -> f32 {
    *EPSILON_F32
}

/// Three-way compare that treats values within [`epsilon_f64`] as equal.
///
/// Identical values, infinities included, are always `Equal`. NaN never lies
/// within the tolerance, so it orders as `Greater` against everything,
/// itself included.
#[inline]
pub fn cmp_f64(a: f64, b: f64) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let eps = epsilon_f64();
    let diff = a - b;
    if diff < -eps {
        Ordering::Less
    } else if diff <= eps {
        Ordering::Equal
    } else {
        Ordering::Greater
    }
}

/// `f32` counterpart of [`cmp_f64`].
#[inline]
pub fn cmp_f32(a: f32, b: f32) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let eps = epsilon_f32();
    let diff = a - b;
    if diff < -eps {
        Ordering::Less
    } else if diff <= eps {
        Ordering::Equal
    } else {
        Ordering::Greater
    }
}
