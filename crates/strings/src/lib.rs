//! Byte-oriented and universal string types plus the flavor-conversion,
//! codec and regexp primitives a TTCN-3-like value layer needs.
//!
//! [`ByteString`] is the shared reference-counted core; [`BitString`],
//! [`HexString`], [`OctString`] and [`CharString`] are alphabet-validated
//! wrappers around it, and [`UString`] is the separate universal-character
//! representation (four-octet `Quadruple` elements, not bytes).

mod base64;
mod bytestring;
mod convert;
mod errors;
mod flavors;
mod regexp;
mod ustring;
mod utf8;

pub use base64::{decode_base64, encode_base64};
pub use bytestring::ByteString;
pub use convert::{
    bit2hex, bit2int, bit2oct, char2int, char2oct, hex2bit, hex2int, hex2oct, int2bit, int2char,
    int2hex, int2oct, int2unichar, oct2bit, oct2char, oct2hex, oct2int, unichar2int,
};
pub use errors::StringError;
pub use flavors::{BitString, CharString, HexString, Iso2022String, OctString};
pub use regexp::regexp;
pub use ustring::{Quadruple, UString};
pub use utf8::{decode_utf8, encode_to_utf8, get_string_encoding, remove_bom, Utf8Diagnostic};
