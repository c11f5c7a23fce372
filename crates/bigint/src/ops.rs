//! Dispatch between the native fast path and the heap fallback.
//!
//! Every operation here tries the native `i64` arithmetic first and, only on
//! overflow, promotes to [`Big`] and retries — `checked_*` from the standard
//! library does the overflow detection for us.

use crate::{normalize, Big, BigInt};

pub(crate) fn add(a: &BigInt, b: &BigInt) -> BigInt {
    match (a, b) {
        (BigInt::Native(x), BigInt::Native(y)) => match x.checked_add(*y) {
            Some(sum) => BigInt::Native(sum),
            None => {
                tracing::debug!(x, y, "BigInt add overflowed i64, promoting to heap");
                normalize(Big::from_i64(*x).add(&Big::from_i64(*y)))
            }
        },
        _ => normalize(Big::from_bigint(a).add(&Big::from_bigint(b))),
    }
}

pub(crate) fn mul(a: &BigInt, b: &BigInt) -> BigInt {
    match (a, b) {
        (BigInt::Native(x), BigInt::Native(y)) => match x.checked_mul(*y) {
            Some(p) => BigInt::Native(p),
            None => {
                tracing::debug!(x, y, "BigInt mul overflowed i64, promoting to heap");
                normalize(Big::from_i64(*x).mul(&Big::from_i64(*y)))
            }
        },
        _ => normalize(Big::from_bigint(a).mul(&Big::from_bigint(b))),
    }
}

/// Returns `(quotient, remainder)`, both truncating toward zero.
///
/// Caller must have already guarded against division by zero; this module
/// trusts that guard and never checks for it itself.
pub(crate) fn div(a: &BigInt, b: &BigInt) -> (BigInt, BigInt) {
    match (a, b) {
        (BigInt::Native(x), BigInt::Native(y)) => {
            // i64::MIN / -1 is the one native division that overflows.
            if *x == i64::MIN && *y == -1 {
                tracing::debug!("BigInt div i64::MIN / -1 overflows i64, promoting to heap");
                let (q, r) = Big::from_i64(*x).divmod(&Big::from_i64(*y));
                (normalize(q), normalize(r))
            } else {
                (BigInt::Native(x / y), BigInt::Native(x % y))
            }
        }
        _ => {
            let (q, r) = Big::from_bigint(a).divmod(&Big::from_bigint(b));
            (normalize(q), normalize(r))
        }
    }
}
