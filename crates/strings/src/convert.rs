//! String-flavor conversion primitives. Each function is pure and total over
//! validly-constructed inputs; the only failures are range/format violations
//! spelled out per-function below.

use crate::errors::StringError;
use crate::flavors::{hex_nibble, CharString, HexString, OctString, HEX_DIGITS};
use crate::flavors::BitString;
use crate::ustring::{Quadruple, UString};
use vfold_bigint::BigInt;

/// Shift-and-add; leading zero bits simply contribute nothing, which is
/// exactly "skip leading 0s".
pub fn bit2int(s: &BitString) -> BigInt {
    let two = BigInt::from_i64(2);
    s.as_bytes().iter().fold(BigInt::ZERO, |acc, &b| {
        let bit = BigInt::from_i64(if b == b'1' { 1 } else { 0 });
        acc.mul(&two).add(&bit)
    })
}

fn group_msb_first(bits: &[u8], group: usize) -> Vec<u8> {
    let pad = (group - bits.len() % group) % group;
    let mut padded = vec![b'0'; pad];
    padded.extend_from_slice(bits);
    padded
}

/// Groups of 4 bits, MSB-first, left-padded to a multiple of 4.
pub fn bit2hex(s: &BitString) -> HexString {
    let padded = group_msb_first(s.as_bytes(), 4);
    let digits: Vec<u8> = padded
        .chunks(4)
        .map(|chunk| {
            let v = chunk.iter().fold(0u8, |acc, &b| (acc << 1) | (b - b'0'));
            HEX_DIGITS[v as usize]
        })
        .collect();
    HexString::new(digits).expect("nibble values are always valid hex digits")
}

/// An octetstring is a hex-digit string with an even digit count, so this
/// is just `bit2hex` followed by the even-length pad `hex2oct` applies.
pub fn bit2oct(s: &BitString) -> OctString {
    hex2oct(&bit2hex(s))
}

pub fn hex2bit(s: &HexString) -> BitString {
    let bits: Vec<u8> = s
        .as_bytes()
        .iter()
        .flat_map(|&h| {
            let v = hex_nibble(h);
            (0..4).rev().map(move |i| if (v >> i) & 1 == 1 { b'1' } else { b'0' })
        })
        .collect();
    BitString::new(bits).expect("derived bits are always valid")
}

pub fn hex2int(s: &HexString) -> BigInt {
    let sixteen = BigInt::from_i64(16);
    s.as_bytes().iter().fold(BigInt::ZERO, |acc, &h| {
        acc.mul(&sixteen).add(&BigInt::from_i64(hex_nibble(h) as i64))
    })
}

/// An octetstring holds the hex digits themselves, one pair per octet; an
/// odd digit count is left-padded with one zero nibble so the pairing
/// lines up.
pub fn hex2oct(s: &HexString) -> OctString {
    let digits = s.as_bytes();
    let padded: Vec<u8>;
    let digits = if digits.len() % 2 == 1 {
        padded = {
            let mut v = vec![b'0'];
            v.extend_from_slice(digits);
            v
        };
        &padded[..]
    } else {
        digits
    };
    OctString::new(digits.to_vec()).expect("hex digits, padded to even length, are a valid octetstring")
}

/// Octet values are decoded from the hex-digit-pair storage, then treated
/// exactly like `hex2bit`.
pub fn oct2bit(s: &OctString) -> BitString {
    hex2bit(&oct2hex(s))
}

/// The octetstring's hex digits already are its hexstring form.
pub fn oct2hex(s: &OctString) -> HexString {
    HexString::new(s.as_bytes().to_vec()).expect("octetstring digits are already valid hex digits")
}

pub fn oct2int(s: &OctString) -> BigInt {
    hex2int(&oct2hex(s))
}

pub fn oct2char(s: &OctString) -> Result<CharString, StringError> {
    let octets = s.raw_octets();
    for (pos, &byte) in octets.iter().enumerate() {
        if byte > 127 {
            return Err(StringError::ConversionRange(byte.to_string(), pos, "char-string (0..127)"));
        }
    }
    CharString::new(octets)
}

fn require_single(bytes: &[u8], op: &'static str) -> Result<u8, StringError> {
    if bytes.len() != 1 {
        return Err(StringError::DomainValue(format!(
            "{op} requires a string of length 1, got length {}",
            bytes.len()
        )));
    }
    Ok(bytes[0])
}

pub fn char2int(s: &CharString) -> Result<BigInt, StringError> {
    Ok(BigInt::from_i64(require_single(s.as_bytes(), "char2int")? as i64))
}

pub fn char2oct(s: &CharString) -> Result<OctString, StringError> {
    let byte = require_single(s.as_bytes(), "char2oct")?;
    Ok(OctString::from_octets(&[byte]))
}

pub fn unichar2int(s: &UString) -> Result<BigInt, StringError> {
    if s.len() != 1 {
        return Err(StringError::DomainValue(format!(
            "unichar2int requires a string of length 1, got length {}",
            s.len()
        )));
    }
    Ok(BigInt::from_i64(s.quads()[0].code_point() as i64))
}

fn fits_in_bits(v: &BigInt, width: u32) -> bool {
    !v.is_negative() && v.shr(width).is_zero()
}

pub fn int2bit(v: &BigInt, n: i64) -> Result<BitString, StringError> {
    if n < 0 {
        return Err(StringError::NegativeLength(n));
    }
    if !fits_in_bits(v, n as u32) {
        return Err(StringError::ConversionRange(v.to_string(), n as usize, "bitstring"));
    }
    let n = n as usize;
    let mut bits = vec![b'0'; n];
    for i in 0..n {
        let bit = v.shr((n - 1 - i) as u32).and_native(1);
        bits[i] = if bit.as_native() == 1 { b'1' } else { b'0' };
    }
    BitString::new(bits)
}

pub fn int2hex(v: &BigInt, n: i64) -> Result<HexString, StringError> {
    if n < 0 {
        return Err(StringError::NegativeLength(n));
    }
    if !fits_in_bits(v, 4 * n as u32) {
        return Err(StringError::ConversionRange(v.to_string(), n as usize, "hexstring"));
    }
    let n = n as usize;
    let mut digits = vec![b'0'; n];
    for i in 0..n {
        let nibble = v.shr((4 * (n - 1 - i)) as u32).and_native(0xF);
        digits[i] = HEX_DIGITS[nibble.as_native() as usize];
    }
    HexString::new(digits)
}

pub fn int2oct(v: &BigInt, n: i64) -> Result<OctString, StringError> {
    if n < 0 {
        return Err(StringError::NegativeLength(n));
    }
    if !fits_in_bits(v, 8 * n as u32) {
        return Err(StringError::ConversionRange(v.to_string(), n as usize, "octetstring"));
    }
    let n = n as usize;
    let mut octets = vec![0u8; n];
    for i in 0..n {
        let byte = v.shr((8 * (n - 1 - i)) as u32).and_native(0xFF);
        octets[i] = byte.as_native() as u8;
    }
    Ok(OctString::from_octets(&octets))
}

pub fn int2char(v: &BigInt) -> Result<CharString, StringError> {
    if v.is_negative() || !v.fits_native_32() || v.as_native() > 127 {
        return Err(StringError::ConversionRange(v.to_string(), 1, "char-string (0..127)"));
    }
    CharString::new(vec![v.as_native() as u8])
}

pub fn int2unichar(v: &BigInt) -> Result<UString, StringError> {
    if v.is_negative() || !v.fits_native_32() || v.as_native() > i64::from(i32::MAX) {
        return Err(StringError::ConversionRange(v.to_string(), 1, "universal charstring (0..2^31-1)"));
    }
    Ok(UString::new(vec![Quadruple::from_code_point(v.as_native() as u32)]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit2int_skips_leading_zeros() {
        let b = BitString::new(b"00101".to_vec()).unwrap();
        assert_eq!(bit2int(&b), BigInt::from_i64(5));
    }

    #[test]
    fn bit2hex_left_pads_to_nibble_boundary() {
        let b = BitString::new(b"101".to_vec()).unwrap();
        assert_eq!(bit2hex(&b).as_bytes(), b"5");
    }

    #[test]
    fn bit2oct_groups_four_bits_per_hex_digit() {
        let b = BitString::new(b"11111111".to_vec()).unwrap();
        assert_eq!(bit2oct(&b).as_bytes(), b"FF");
        assert_eq!(bit2oct(&b).raw_octets(), vec![0xFF]);
    }

    #[test]
    fn hex_oct_roundtrip() {
        let h = HexString::new(b"1A2B".to_vec()).unwrap();
        let o = hex2oct(&h);
        assert_eq!(oct2hex(&o).as_bytes(), b"1A2B");
    }

    #[test]
    fn hex2oct_pads_odd_length_with_a_leading_zero() {
        let h = HexString::new(b"ABC".to_vec()).unwrap();
        assert_eq!(hex2oct(&h).as_bytes(), b"0ABC");
    }

    #[test]
    fn int2bit_rejects_value_too_wide_for_length() {
        assert!(int2bit(&BigInt::from_i64(256), 4).is_err());
        assert!(int2bit(&BigInt::from_i64(15), 4).is_ok());
    }

    #[test]
    fn int2char_rejects_out_of_ascii_range() {
        assert!(int2char(&BigInt::from_i64(128)).is_err());
        assert!(int2char(&BigInt::from_i64(65)).is_ok());
    }

    #[test]
    fn oct2char_fails_on_high_octet() {
        let o = OctString::from_octets(&[200]);
        assert!(oct2char(&o).is_err());
    }

    #[test]
    fn unichar2int_requires_length_one() {
        let u = UString::from_char_codes(&[65, 66]);
        assert!(unichar2int(&u).is_err());
    }
}
