//! End-to-end folding scenarios exercised through the public API only: a
//! `Governor`/`RefResolver` pair standing in for a compiler driver, wired
//! through `FoldCtx` exactly as a caller would.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use vfold_strings::{BitString, CharString, UString};
use vfold_value::{
    check_and_normalize, get_string_repr, AssignmentClass, Expr, FoldConfig, FoldCtx, Governor,
    Location, Op, RefHandle, RefResolver, SubRef, Value, ValueKind, ValueRef,
};

#[derive(Debug, Clone, PartialEq)]
struct UnitGovernor;

impl Governor for UnitGovernor {
    fn is_compatible(&self, _other: &Self) -> bool {
        true
    }
    fn field_type(&self, _field: &str) -> Option<Self> {
        None
    }
    fn ordinal_of(&self, _enum_id: &str) -> Option<i64> {
        None
    }
    fn component_count(&self) -> Option<usize> {
        None
    }
}

#[derive(Default)]
struct StubResolver {
    constants: HashMap<String, ValueRef<UnitGovernor>>,
    variables: Vec<String>,
}

impl RefResolver<ValueRef<UnitGovernor>, UnitGovernor> for StubResolver {
    fn classify(&self, full_name: &str) -> AssignmentClass {
        if self.constants.contains_key(full_name) {
            AssignmentClass::Constant
        } else if self.variables.iter().any(|v| v == full_name) {
            AssignmentClass::Variable
        } else {
            AssignmentClass::Unresolved
        }
    }
    fn constant_value(&self, full_name: &str) -> Option<ValueRef<UnitGovernor>> {
        self.constants.get(full_name).cloned()
    }
    fn governor_of(&self, _full_name: &str) -> Option<UnitGovernor> {
        Some(UnitGovernor)
    }
}

fn here() -> Location {
    Location::new("scenario.ttcn", 1, "M", "d")
}

fn int(v: i64) -> ValueRef<UnitGovernor> {
    Value::new_int(v).into_ref()
}

fn bool_(b: bool) -> ValueRef<UnitGovernor> {
    Value::new_bool(b).into_ref()
}

fn refd(full_name: &str) -> ValueRef<UnitGovernor> {
    Value::synthetic(ValueKind::Refd {
        reference: RefHandle { full_name: full_name.to_string(), sub_refs: vec![] },
        cached_last: RefCell::new(None),
    })
    .into_ref()
}

fn expr(op: Op, operands: Vec<ValueRef<UnitGovernor>>) -> ValueRef<UnitGovernor> {
    Value::synthetic(ValueKind::Expr(Expr::new(op, operands, vec![], vec![], vec![]))).into_ref()
}

#[test]
fn constant_reference_chain_folds_to_a_literal() {
    // const integer x := 2 + 3; the use site is a bare reference to "x".
    let sum = expr(Op::Add, vec![int(2), int(3)]);
    let mut constants = HashMap::new();
    constants.insert("x".to_string(), sum);
    let resolver = StubResolver { constants, variables: vec![] };
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let site = refd("x");
    let resolved = ctx.get_value_refd_last(&site);
    assert!(matches!(resolved.borrow().kind, ValueKind::Int(_)));
    assert_eq!(get_string_repr(&resolved.borrow()), "5");
    assert!(ctx.diagnostics.is_empty());
}

#[test]
fn self_referential_constant_is_reported_as_a_cycle_not_an_infinite_loop() {
    let mut constants = HashMap::new();
    let cyclic = refd("x");
    constants.insert("x".to_string(), cyclic.clone());
    let resolver = StubResolver { constants, variables: vec![] };
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let resolved = ctx.get_value_refd_last(&cyclic);
    assert!(resolved.borrow().is_error());
    assert_eq!(ctx.diagnostics.len(), 1);
}

#[test]
fn unresolved_variable_reference_is_left_unfoldable_rather_than_errored() {
    let resolver = StubResolver { constants: HashMap::new(), variables: vec!["v".to_string()] };
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let site = refd("v");
    assert!(ctx.is_unfoldable(&site));
    let resolved = ctx.get_value_refd_last(&site);
    assert!(!resolved.borrow().is_error());
    assert!(matches!(resolved.borrow().kind, ValueKind::Refd { .. }));
}

#[test]
fn division_by_zero_is_a_recoverable_fold_error_not_a_panic() {
    let resolver = StubResolver::default();
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let site = expr(Op::Div, vec![int(10), int(0)]);
    let resolved = ctx.get_value_refd_last(&site);
    assert!(resolved.borrow().is_error());
    assert_eq!(ctx.diagnostics.len(), 1);
}

#[test]
fn and_short_circuits_without_touching_an_unfoldable_second_operand() {
    let resolver = StubResolver { constants: HashMap::new(), variables: vec!["flag".to_string()] };
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    // false and <unresolved variable> must fold to false without erroring
    // on the second, genuinely-unfoldable operand.
    let site = expr(Op::And, vec![bool_(false), refd("flag")]);
    assert!(!ctx.is_unfoldable(&site));
    let resolved = ctx.get_value_refd_last(&site);
    assert_eq!(resolved.borrow().kind, ValueKind::Bool(false));
}

#[test]
fn plus_between_charstrings_normalizes_to_concat_with_a_warning_then_folds() {
    let c = |s: &str| Value::synthetic(ValueKind::Cstr(CharString::new(s.as_bytes().to_vec()).unwrap())).into_ref();
    let mut e = Expr::new(Op::Add, vec![c("foo"), c("bar")], vec![], vec![], vec![]);
    let mut diags = Vec::new();
    check_and_normalize(&mut e, &here(), &mut diags).unwrap();
    assert_eq!(e.op, Op::Concat);
    assert_eq!(diags.len(), 1);

    let resolver = StubResolver::default();
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);
    let site = Value::synthetic(ValueKind::Expr(e)).into_ref();
    let resolved = ctx.get_value_refd_last(&site);
    assert_eq!(get_string_repr(&resolved.borrow()), "\"foobar\"");
}

#[test]
fn charstring_concatenates_with_universal_charstring() {
    let resolver = StubResolver::default();
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let c = Value::synthetic(ValueKind::Cstr(CharString::new(b"ab".to_vec()).unwrap())).into_ref();
    let u = Value::synthetic(ValueKind::Ustr(UString::from_char_codes(&[99, 100]))).into_ref();
    let site = expr(Op::Concat, vec![c, u]);
    let resolved = ctx.get_value_refd_last(&site);
    assert!(matches!(resolved.borrow().kind, ValueKind::Ustr(_)));
}

#[test]
fn bitstring_and4b_zero_extends_the_shorter_operand() {
    let resolver = StubResolver::default();
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let a = Value::synthetic(ValueKind::Bstr(BitString::new(b"1111".to_vec()).unwrap())).into_ref();
    let b = Value::synthetic(ValueKind::Bstr(BitString::new(b"11".to_vec()).unwrap())).into_ref();
    let site = expr(Op::And4b, vec![a, b]);
    let resolved = ctx.get_value_refd_last(&site);
    match &resolved.borrow().kind {
        ValueKind::Bstr(s) => assert_eq!(s.as_bytes(), b"1100"),
        other => panic!("expected Bstr, got {other:?}"),
    }
}

#[test]
fn sub_reference_walks_a_field_access_through_a_resolved_constant() {
    let field_val = int(7);
    let rec = Value::synthetic(ValueKind::Seq(vec![("f".to_string(), field_val)])).into_ref();
    let mut constants = HashMap::new();
    constants.insert("rec".to_string(), rec);
    let resolver = StubResolver { constants, variables: vec![] };
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let site = Value::synthetic(ValueKind::Refd {
        reference: RefHandle { full_name: "rec".to_string(), sub_refs: vec![SubRef::Field("f".to_string())] },
        cached_last: RefCell::new(None),
    })
    .into_ref();
    let resolved = ctx.get_value_refd_last(&site);
    assert_eq!(resolved.borrow().kind, ValueKind::Int(vfold_bigint::BigInt::from_i64(7)));
}

#[test]
fn lengthof_counts_seq_fields_and_string_length_alike() {
    let resolver = StubResolver::default();
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let rec = Value::synthetic(ValueKind::Seq(vec![
        ("a".to_string(), int(1)),
        ("b".to_string(), int(2)),
    ]))
    .into_ref();
    let site = expr(Op::Lengthof, vec![rec]);
    let resolved = ctx.get_value_refd_last(&site);
    assert_eq!(resolved.borrow().kind, ValueKind::Int(vfold_bigint::BigInt::from_i64(2)));

    let s = Value::synthetic(ValueKind::Cstr(CharString::new(b"hello".to_vec()).unwrap())).into_ref();
    let site2 = expr(Op::Lengthof, vec![s]);
    let resolved2 = ctx.get_value_refd_last(&site2);
    assert_eq!(resolved2.borrow().kind, ValueKind::Int(vfold_bigint::BigInt::from_i64(5)));
}

#[test]
fn repeated_folding_of_an_already_checked_expression_is_idempotent() {
    let resolver = StubResolver::default();
    let config = FoldConfig::default();
    let mut ctx = FoldCtx::new(&resolver, &config);

    let site = expr(Op::Add, vec![int(1), int(1)]);
    let first = ctx.get_value_refd_last(&site);
    let second = ctx.get_value_refd_last(&site);
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(first.borrow().kind, ValueKind::Int(vfold_bigint::BigInt::from_i64(2)));
}
