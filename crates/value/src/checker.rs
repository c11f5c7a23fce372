//! Operand/return-type checking: per-operator domain checks, return-type
//! inference, and the `+`-on-strings rewrite (`"a" + "b"` is accepted as
//! `concat` with a "did you mean `&`?" warning, rather than rejected
//! outright).

use crate::errors::{Diagnostic, FoldError};
use crate::expr::{Expr, Op};
use crate::traits::{Governor, Location};
use crate::value::{ValueKind, ValueRef};

/// A coarse domain tag for an operand, enough to drive the checks below
/// without needing access to a concrete `Governor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandTag {
    Bool,
    Int,
    Real,
    Bstr,
    Hstr,
    Ostr,
    Cstr,
    Ustr,
    Compound,
    Other,
}

pub fn tag_of<G: Governor>(v: &ValueRef<G>) -> OperandTag {
    match &v.borrow().kind {
        ValueKind::Bool(_) => OperandTag::Bool,
        ValueKind::Int(_) => OperandTag::Int,
        ValueKind::Real(_) => OperandTag::Real,
        ValueKind::Bstr(_) => OperandTag::Bstr,
        ValueKind::Hstr(_) => OperandTag::Hstr,
        ValueKind::Ostr(_) => OperandTag::Ostr,
        ValueKind::Cstr(_) => OperandTag::Cstr,
        ValueKind::Ustr(_) | ValueKind::Iso2022str(_) => OperandTag::Ustr,
        ValueKind::Seq(_) | ValueKind::Set(_) | ValueKind::SeqOf(_) | ValueKind::SetOf(_)
        | ValueKind::Array(_) | ValueKind::Choice { .. } => OperandTag::Compound,
        _ => OperandTag::Other,
    }
}

fn is_string_tag(t: OperandTag) -> bool {
    matches!(t, OperandTag::Bstr | OperandTag::Hstr | OperandTag::Ostr | OperandTag::Cstr | OperandTag::Ustr)
}

/// What an operator's result looks like, independent of any concrete
/// `Governor` — operators whose result type follows a specific operand
/// (`concat`, `substr`, the rotate/shift family) resolve via `SameAsOperand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    Bool,
    Int,
    Real,
    Bstr,
    Hstr,
    Ostr,
    Cstr,
    Ustr,
    SameAsOperand(usize),
    /// Result type depends on a `Governor` this module can't see (record/set
    /// field access, choice selection) — the driver resolves it.
    Opaque,
}

pub fn get_expr_returntype(op: Op) -> ReturnKind {
    use Op::*;
    use ReturnKind::*;
    match op {
        Add | Sub | Mul | Div | Mod | Rem | UnaryPlus | UnaryMinus => SameAsOperand(0),
        Not4b | And4b | Or4b | Xor4b => SameAsOperand(0),
        ShiftLeft | ShiftRight | RotateLeft | RotateRight => SameAsOperand(0),
        Eq | Ne | Lt | Gt | Le | Ge | And | Or | Xor | Not => Bool,
        Concat => SameAsOperand(0),
        Bit2Int => Int,
        Bit2Hex => Hstr,
        Bit2Oct => Ostr,
        Hex2Bit => Bstr,
        Hex2Int => Int,
        Hex2Oct => Ostr,
        Oct2Bit => Bstr,
        Oct2Hex => Hstr,
        Oct2Int => Int,
        Oct2Char => Cstr,
        Char2Int => Int,
        Char2Oct => Ostr,
        Unichar2Int => Int,
        Int2Bit => Bstr,
        Int2Hex => Hstr,
        Int2Oct => Ostr,
        Int2Char => Cstr,
        Int2Unichar => Ustr,
        Substr | Replace => SameAsOperand(0),
        Regexp => Cstr,
        Lengthof | Sizeof => Int,
        IsValue | IsBound | IsPresent | IsChosen | IsTemplateKind => Bool,
        GetStringEncoding => Cstr,
        RemoveBom | EncodeBase64 | DecodeBase64 => Ostr,
        _ => Opaque,
    }
}

fn domain_error(op: Op, expected: &'static str, got: OperandTag) -> FoldError {
    FoldError::DomainType { expected: format!("{expected} (operand of {op:?})"), actual: format!("{got:?}") }
}

pub fn chk_expr_operandtype_bool(op: Op, tag: OperandTag) -> Result<(), FoldError> {
    if tag != OperandTag::Bool {
        return Err(domain_error(op, "bool", tag));
    }
    Ok(())
}

pub fn chk_expr_operandtype_int(op: Op, tag: OperandTag) -> Result<(), FoldError> {
    if tag != OperandTag::Int {
        return Err(domain_error(op, "int", tag));
    }
    Ok(())
}

pub fn chk_expr_operandtype_numeric(op: Op, tag: OperandTag) -> Result<(), FoldError> {
    if !matches!(tag, OperandTag::Int | OperandTag::Real) {
        return Err(domain_error(op, "int or float", tag));
    }
    Ok(())
}

pub fn chk_expr_operandtype_charstring(op: Op, tag: OperandTag) -> Result<(), FoldError> {
    if tag != OperandTag::Cstr {
        return Err(domain_error(op, "charstring", tag));
    }
    Ok(())
}

pub fn chk_expr_operandtype_binary_string(op: Op, tag: OperandTag) -> Result<(), FoldError> {
    if !matches!(tag, OperandTag::Bstr | OperandTag::Hstr | OperandTag::Ostr) {
        return Err(domain_error(op, "bitstring, hexstring or octetstring", tag));
    }
    Ok(())
}

pub fn chk_expr_operandtype_any_string(op: Op, tag: OperandTag) -> Result<(), FoldError> {
    if !is_string_tag(tag) {
        return Err(domain_error(op, "string", tag));
    }
    Ok(())
}

/// Checks `expr`'s operands against its operator's domain and silently
/// rewrites `+` between two string operands into `concat`, recording a
/// warning rather than an error — `+` on strings is a common typo for `&`
/// this checker tolerates instead of rejecting.
pub fn check_and_normalize<G: Governor>(
    expr: &mut Expr<G>,
    loc: &Location,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(), FoldError> {
    let tags: Vec<OperandTag> = expr.operands.iter().map(|v| tag_of(v)).collect();

    if expr.op == Op::Add && tags.len() == 2 && is_string_tag(tags[0]) && is_string_tag(tags[1]) {
        diagnostics.push(Diagnostic::warning(
            loc.clone(),
            "'+' between strings behaves as concatenation here; did you mean '&'?",
        ));
        expr.op = Op::Concat;
        return Ok(());
    }

    match expr.op {
        Op::Add | Op::Sub | Op::Mul | Op::Div | Op::Mod | Op::Rem => {
            for t in &tags {
                chk_expr_operandtype_numeric(expr.op, *t)?;
            }
        }
        Op::And | Op::Or | Op::Xor | Op::Not => {
            for t in &tags {
                chk_expr_operandtype_bool(expr.op, *t)?;
            }
        }
        Op::Not4b | Op::And4b | Op::Or4b | Op::Xor4b => {
            for t in &tags {
                chk_expr_operandtype_binary_string(expr.op, *t)?;
            }
        }
        Op::Regexp => {
            chk_expr_operandtype_charstring(expr.op, tags[0])?;
            chk_expr_operandtype_charstring(expr.op, tags[1])?;
        }
        Op::Concat => {
            for t in &tags {
                chk_expr_operandtype_any_string(expr.op, *t)?;
            }
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::testutil::DummyGovernor;
    use crate::value::Value;
    use vfold_strings::CharString;

    fn cstr(s: &str) -> ValueRef<DummyGovernor> {
        Value::synthetic(ValueKind::Cstr(CharString::new(s.as_bytes().to_vec()).unwrap())).into_ref()
    }

    #[test]
    fn plus_between_strings_rewrites_to_concat_with_a_warning() {
        let mut expr = Expr::new(Op::Add, vec![cstr("a"), cstr("b")], vec![], vec![], vec![]);
        let mut diags = Vec::new();
        let loc = Location::new("t.ttcn", 1, "m", "d");
        check_and_normalize(&mut expr, &loc, &mut diags).unwrap();
        assert_eq!(expr.op, Op::Concat);
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn plus_between_ints_is_left_alone() {
        let mut expr = Expr::new(Op::Add, vec![Value::new_int(1).into_ref(), Value::new_int(2).into_ref()], vec![], vec![], vec![]);
        let mut diags = Vec::new();
        let loc = Location::new("t.ttcn", 1, "m", "d");
        check_and_normalize(&mut expr, &loc, &mut diags).unwrap();
        assert_eq!(expr.op, Op::Add);
        assert!(diags.is_empty());
    }

    #[test]
    fn bool_operand_check_rejects_non_bool() {
        assert!(chk_expr_operandtype_bool(Op::And, OperandTag::Int).is_err());
    }
}
