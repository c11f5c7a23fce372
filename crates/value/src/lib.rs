//! Polymorphic `Value`, expression algebra, and cycle-guarded constant
//! folder: the Folder & Checker component of a TTCN-3-like compiler front
//! end, generic over an external, opaque type system.

mod checker;
mod config;
mod equality;
mod errors;
mod expr;
mod folder;
mod repr;
mod traits;
mod value;

// No umbrella crate: re-export the other two crates' public types here so a
// consumer depends on `vfold-value` alone and gets the full external
// interface.
pub use vfold_bigint::BigInt;
pub use vfold_strings::{
    decode_utf8, encode_to_utf8, get_string_encoding, remove_bom, regexp, BitString, ByteString,
    CharString, HexString, Iso2022String, OctString, Quadruple, StringError, UString,
    Utf8Diagnostic,
};

pub use checker::{
    check_and_normalize, chk_expr_operandtype_any_string, chk_expr_operandtype_binary_string,
    chk_expr_operandtype_bool, chk_expr_operandtype_charstring, chk_expr_operandtype_int,
    chk_expr_operandtype_numeric, get_expr_returntype, tag_of, OperandTag, ReturnKind,
};
pub use config::FoldConfig;
pub use errors::{Diagnostic, FoldError, Severity};
pub use expr::{operator_shape, Expr, ExprState, Op, OperandShape};
pub use folder::{FoldCtx, RefChain};
pub use repr::get_string_repr;
pub use traits::{AssignmentClass, Governor, Location, RefResolver, ScopeLookup};
pub use value::{
    LengthRestriction, MacroKind, OidComponent, RefHandle, SubRef, Value, ValueKind, ValueRef,
    Verdict,
};
