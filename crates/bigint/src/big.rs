//! Heap-allocated sign-magnitude representation, used only once a value no
//! longer fits in a native `i64`.
//!
//! Magnitude is stored little-endian as `Vec<u32>` limbs (base 2^32) with no
//! trailing zero limb and never empty (the value zero is always represented
//! as `BigInt::Native(0)`, never as a `Big`).

use crate::BigInt;
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Big {
    pub(crate) negative: bool,
    /// Little-endian base-2^32 limbs, no trailing zero limb, never empty.
    pub(crate) mag: Vec<u32>,
}

impl Big {
    pub(crate) fn from_i64(v: i64) -> Self {
        let negative = v < 0;
        let abs = v.unsigned_abs();
        Big {
            negative,
            mag: vec![abs as u32, (abs >> 32) as u32],
        }
        .trimmed()
    }

    pub(crate) fn from_bigint(v: &BigInt) -> Self {
        match v {
            BigInt::Native(n) => Big::from_i64(*n),
            BigInt::Heap(b) => b.clone(),
        }
    }

    fn trimmed(mut self) -> Self {
        while self.mag.len() > 1 && *self.mag.last().unwrap() == 0 {
            self.mag.pop();
        }
        if self.mag.iter().all(|&l| l == 0) {
            self.negative = false;
        }
        self
    }

    pub(crate) fn is_zero_mag(&self) -> bool {
        self.mag.iter().all(|&l| l == 0)
    }

    pub(crate) fn neg(&self) -> Big {
        let mut b = self.clone();
        if !b.is_zero_mag() {
            b.negative = !b.negative;
        }
        b
    }

    pub(crate) fn to_i64(&self) -> Option<i64> {
        if self.mag.len() > 2 {
            return None;
        }
        let low = self.mag[0] as u64;
        let high = *self.mag.get(1).unwrap_or(&0) as u64;
        let abs = (high << 32) | low;
        if self.negative {
            if abs <= (i64::MAX as u64) + 1 {
                // i64::MIN's magnitude is i64::MAX + 1
                Some((abs as i128 * -1) as i64)
            } else {
                None
            }
        } else if abs <= i64::MAX as u64 {
            Some(abs as i64)
        } else {
            None
        }
    }

    pub(crate) fn to_f64(&self) -> f64 {
        let mut acc = 0.0f64;
        for &limb in self.mag.iter().rev() {
            acc = acc * 4294967296.0 + limb as f64;
        }
        if self.negative { -acc } else { acc }
    }

    /// Low 64 bits of the magnitude, reinterpreted as `i64`. Meaningful only
    /// for non-negative values, as used by `and_native`'s mask operation.
    pub(crate) fn low_i64(&self) -> i64 {
        let low = self.mag[0] as u64;
        let high = *self.mag.get(1).unwrap_or(&0) as u64;
        ((high << 32) | low) as i64
    }

    pub(crate) fn shr(&self, count: u32) -> Big {
        let limb_shift = (count / 32) as usize;
        let bit_shift = count % 32;
        if limb_shift >= self.mag.len() {
            return Big {
                negative: false,
                mag: vec![0],
            };
        }
        let mut out: Vec<u32> = self.mag[limb_shift..].to_vec();
        if bit_shift > 0 {
            for i in 0..out.len() {
                let lo = out[i] >> bit_shift;
                let hi = if i + 1 < out.len() {
                    out[i + 1] << (32 - bit_shift)
                } else {
                    0
                };
                out[i] = lo | hi;
            }
        }
        Big {
            negative: self.negative,
            mag: out,
        }
        .trimmed()
    }

    fn cmp_mag(a: &[u32], b: &[u32]) -> Ordering {
        if a.len() != b.len() {
            return a.len().cmp(&b.len());
        }
        for i in (0..a.len()).rev() {
            if a[i] != b[i] {
                return a[i].cmp(&b[i]);
            }
        }
        Ordering::Equal
    }

    fn add_mag(a: &[u32], b: &[u32]) -> Vec<u32> {
        let mut out = Vec::with_capacity(a.len().max(b.len()) + 1);
        let mut carry: u64 = 0;
        for i in 0..a.len().max(b.len()) {
            let x = *a.get(i).unwrap_or(&0) as u64;
            let y = *b.get(i).unwrap_or(&0) as u64;
            let sum = x + y + carry;
            out.push(sum as u32);
            carry = sum >> 32;
        }
        if carry > 0 {
            out.push(carry as u32);
        }
        out
    }

    /// Precondition: magnitude(a) >= magnitude(b).
    fn sub_mag(a: &[u32], b: &[u32]) -> Vec<u32> {
        let mut out = Vec::with_capacity(a.len());
        let mut borrow: i64 = 0;
        for i in 0..a.len() {
            let x = a[i] as i64;
            let y = *b.get(i).unwrap_or(&0) as i64;
            let mut diff = x - y - borrow;
            if diff < 0 {
                diff += 1 << 32;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out.push(diff as u32);
        }
        out
    }

    pub(crate) fn add(&self, other: &Big) -> Big {
        if self.negative == other.negative {
            Big {
                negative: self.negative,
                mag: Big::add_mag(&self.mag, &other.mag),
            }
            .trimmed()
        } else {
            match Big::cmp_mag(&self.mag, &other.mag) {
                Ordering::Equal => Big {
                    negative: false,
                    mag: vec![0],
                },
                Ordering::Greater => Big {
                    negative: self.negative,
                    mag: Big::sub_mag(&self.mag, &other.mag),
                }
                .trimmed(),
                Ordering::Less => Big {
                    negative: other.negative,
                    mag: Big::sub_mag(&other.mag, &self.mag),
                }
                .trimmed(),
            }
        }
    }

    pub(crate) fn mul(&self, other: &Big) -> Big {
        let mut out = vec![0u32; self.mag.len() + other.mag.len()];
        for (i, &x) in self.mag.iter().enumerate() {
            let mut carry: u64 = 0;
            for (j, &y) in other.mag.iter().enumerate() {
                let idx = i + j;
                let prod = x as u64 * y as u64 + out[idx] as u64 + carry;
                out[idx] = prod as u32;
                carry = prod >> 32;
            }
            let mut idx = i + other.mag.len();
            while carry > 0 {
                let sum = out[idx] as u64 + carry;
                out[idx] = sum as u32;
                carry = sum >> 32;
                idx += 1;
            }
        }
        Big {
            negative: self.negative != other.negative,
            mag: out,
        }
        .trimmed()
    }

    /// Truncating magnitude division via binary long division (shift and
    /// subtract). Simple rather than fast: this path is only reached once
    /// both operands have already overflowed `i64`.
    fn divmod_mag(a: &[u32], b: &[u32]) -> (Vec<u32>, Vec<u32>) {
        let bits = a.len() * 32;
        let mut quotient = vec![0u32; a.len()];
        let mut remainder: Vec<u32> = vec![0];
        for bit in (0..bits).rev() {
            remainder = shl_mag_one(&remainder);
            let a_bit = (a[bit / 32] >> (bit % 32)) & 1;
            if a_bit == 1 {
                remainder[0] |= 1;
            }
            if Big::cmp_mag(&remainder, b) != Ordering::Less {
                remainder = Big::sub_mag(&remainder, b);
                while remainder.len() > 1 && *remainder.last().unwrap() == 0 {
                    remainder.pop();
                }
                quotient[bit / 32] |= 1 << (bit % 32);
            }
        }
        while quotient.len() > 1 && *quotient.last().unwrap() == 0 {
            quotient.pop();
        }
        (quotient, remainder)
    }

    /// Truncating division, spec contract: `rem(a,b) = a − b·(a/b)`.
    pub(crate) fn divmod(&self, other: &Big) -> (Big, Big) {
        let (q_mag, r_mag) = Big::divmod_mag(&self.mag, &other.mag);
        let q_neg = self.negative != other.negative;
        let r_neg = self.negative;
        (
            Big {
                negative: q_neg,
                mag: q_mag,
            }
            .trimmed(),
            Big {
                negative: r_neg,
                mag: r_mag,
            }
            .trimmed(),
        )
    }

    pub(crate) fn cmp(&self, other: &Big) -> Ordering {
        match (self.negative, other.negative) {
            (false, true) => Ordering::Greater,
            (true, false) => Ordering::Less,
            (false, false) => Big::cmp_mag(&self.mag, &other.mag),
            (true, true) => Big::cmp_mag(&other.mag, &self.mag),
        }
    }
}

fn shl_mag_one(mag: &[u32]) -> Vec<u32> {
    let mut out = Vec::with_capacity(mag.len() + 1);
    let mut carry = 0u32;
    for &limb in mag {
        out.push((limb << 1) | carry);
        carry = limb >> 31;
    }
    if carry > 0 {
        out.push(carry);
    }
    out
}

impl fmt::Display for Big {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Short division by 1_000_000_000, emitting 9-decimal-digit chunks.
        let mut limbs = self.mag.clone();
        let mut chunks: Vec<u32> = Vec::new();
        loop {
            let mut rem: u64 = 0;
            for limb in limbs.iter_mut().rev() {
                let cur = (rem << 32) | *limb as u64;
                *limb = (cur / 1_000_000_000) as u32;
                rem = cur % 1_000_000_000;
            }
            chunks.push(rem as u32);
            while limbs.len() > 1 && *limbs.last().unwrap() == 0 {
                limbs.pop();
            }
            if limbs.len() == 1 && limbs[0] == 0 {
                break;
            }
        }
        if self.negative && !self.is_zero_mag() {
            write!(f, "-")?;
        }
        let mut first = true;
        for chunk in chunks.iter().rev() {
            if first {
                write!(f, "{chunk}")?;
                first = false;
            } else {
                write!(f, "{chunk:09}")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mul_matches_schoolbook_reference() {
        let a = Big::from_i64(4294967296); // 2^32
        let b = Big::from_i64(3);
        assert_eq!(a.mul(&b).to_string(), "12884901888");
    }

    #[test]
    fn divmod_mag_matches_native() {
        let a = Big::from_i64(1_000_000);
        let b = Big::from_i64(7);
        let (q, r) = a.divmod(&b);
        assert_eq!(q.to_string(), "142857");
        assert_eq!(r.to_string(), "1");
    }

    #[test]
    fn shr_crosses_limb_boundary() {
        let a = Big::from_i64(1i64 << 40);
        let shifted = a.shr(8);
        assert_eq!(shifted.to_string(), (1i64 << 32).to_string());
    }
}
