//! The cycle-guarded evaluator: `is_unfoldable`, `get_value_refd_last`,
//! `evaluate_value`, and sub-reference resolution.

use crate::config::FoldConfig;
use crate::errors::{Diagnostic, FoldError};
use crate::expr::{Op, ExprState};
use crate::traits::{AssignmentClass, Governor, Location, RefResolver};
use crate::value::{RefHandle, SubRef, Value, ValueKind, ValueRef};
use std::collections::HashSet;
use std::rc::Rc;
use vfold_bigint::BigInt;
use vfold_strings as vs;

/// An ordered set of full-names, used to detect cycles while walking
/// `Refd` chains. `mark_state`/`prev_state` let each operand's visit be
/// independent so a cycle through one operand doesn't block its siblings.
#[derive(Debug, Default, Clone)]
pub struct RefChain {
    names: Vec<String>,
}

impl RefChain {
    pub fn new() -> Self {
        RefChain::default()
    }

    pub fn mark_state(&self) -> usize {
        self.names.len()
    }

    pub fn prev_state(&mut self, mark: usize) {
        self.names.truncate(mark);
    }

    /// Returns `false` iff `name` is already present — a cycle.
    pub fn add(&mut self, name: &str) -> bool {
        if self.names.iter().any(|n| n == name) {
            tracing::warn!(chain = ?self.names, name, "cycle detected in reference chain");
            false
        } else {
            self.names.push(name.to_string());
            true
        }
    }
}

fn ptr_id<G: Governor>(v: &ValueRef<G>) -> usize {
    Rc::as_ptr(v) as usize
}

/// Per-fold context: the reference chain, the `is_unfoldable` re-entry
/// guard (a process-wide set of values currently being checked, so a
/// value being unfolded as its own dependency reports as unfoldable
/// rather than recursing forever), the external resolver, config, and
/// collected diagnostics.
pub struct FoldCtx<'a, G: Governor, R: RefResolver<ValueRef<G>, G>> {
    pub resolver: &'a R,
    pub config: &'a FoldConfig,
    pub chain: RefChain,
    unfold_running: HashSet<usize>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a, G: Governor, R: RefResolver<ValueRef<G>, G>> FoldCtx<'a, G, R> {
    pub fn new(resolver: &'a R, config: &'a FoldConfig) -> Self {
        FoldCtx {
            resolver,
            config,
            chain: RefChain::new(),
            unfold_running: HashSet::new(),
            diagnostics: Vec::new(),
        }
    }

    fn report_error(&mut self, loc: &Location, msg: impl Into<String>) {
        self.diagnostics.push(Diagnostic::error(loc.clone(), msg));
    }

    /// `is_unfoldable(v)`: false iff `v` can be reduced to a literal at
    /// compile time.
    pub fn is_unfoldable(&mut self, v: &ValueRef<G>) -> bool {
        let id = ptr_id(v);
        if self.unfold_running.contains(&id) {
            // Revisiting a value already on the stack: treat as a cycle,
            // i.e. unfoldable, rather than looping.
            return true;
        }
        self.unfold_running.insert(id);
        let result = self.is_unfoldable_inner(v);
        self.unfold_running.remove(&id);
        result
    }

    fn is_unfoldable_inner(&mut self, v: &ValueRef<G>) -> bool {
        {
            let b = v.borrow();
            match &b.kind {
                ValueKind::Error => return true,
                ValueKind::Null
                | ValueKind::Bool(_)
                | ValueKind::Int(_)
                | ValueKind::Real(_)
                | ValueKind::Enum(..)
                | ValueKind::Verdict(_)
                | ValueKind::Omit
                | ValueKind::NotUsed
                | ValueKind::TtcnNull
                | ValueKind::DefaultNull
                | ValueKind::FatNull
                | ValueKind::Bstr(_)
                | ValueKind::Hstr(_)
                | ValueKind::Ostr(_)
                | ValueKind::Cstr(_)
                | ValueKind::Iso2022str(_)
                | ValueKind::Ustr(_)
                | ValueKind::Oid(_)
                | ValueKind::Roid(_)
                | ValueKind::NamedBits(_) => return false,
                _ => {}
            }
        }

        let children: Option<Vec<ValueRef<G>>> = {
            let b = v.borrow();
            match &b.kind {
                ValueKind::SeqOf(xs) | ValueKind::SetOf(xs) | ValueKind::Array(xs) => Some(xs.clone()),
                ValueKind::Seq(xs) | ValueKind::Set(xs) => Some(xs.iter().map(|(_, x)| x.clone()).collect()),
                ValueKind::Choice { alt_value, .. } => Some(vec![alt_value.clone()]),
                _ => None,
            }
        };
        if let Some(children) = children {
            return children.iter().any(|c| self.is_unfoldable(c));
        }

        let is_refd = matches!(v.borrow().kind, ValueKind::Refd { .. });
        if is_refd {
            let full_name = match &v.borrow().kind {
                ValueKind::Refd { reference, .. } => reference.full_name.clone(),
                _ => unreachable!(),
            };
            return !matches!(self.resolver.classify(&full_name), AssignmentClass::Constant);
        }

        let is_expr = matches!(v.borrow().kind, ValueKind::Expr(_));
        if is_expr {
            return self.expr_is_unfoldable(v);
        }

        // Runtime/transient/reference kinds with no folding story here.
        true
    }

    fn expr_is_unfoldable(&mut self, v: &ValueRef<G>) -> bool {
        let (op, operands) = {
            let b = v.borrow();
            match &b.kind {
                ValueKind::Expr(e) => (e.op, e.operands.clone()),
                _ => unreachable!(),
            }
        };
        if op.is_always_unfoldable() {
            return true;
        }
        if op.is_short_circuit() {
            let v1 = &operands[0];
            if self.is_unfoldable(v1) {
                return true;
            }
            let v1_determines = self.short_circuit_determines(op, v1);
            if v1_determines {
                return false;
            }
            return self.is_unfoldable(&operands[1]);
        }
        operands.iter().any(|op_v| self.is_unfoldable(op_v))
    }

    fn short_circuit_determines(&self, op: Op, v1: &ValueRef<G>) -> bool {
        let b = v1.borrow();
        match (&b.kind, op) {
            (ValueKind::Bool(false), Op::And) => true,
            (ValueKind::Bool(true), Op::Or) => true,
            _ => false,
        }
    }

    /// `get_value_refd_last`: the single entry point that resolves `Refd`
    /// chains, transitions `Expr` through its state machine, substitutes
    /// macros, and returns everything else unchanged.
    pub fn get_value_refd_last(&mut self, v: &ValueRef<G>) -> ValueRef<G> {
        self.get_value_refd_last_probing(v, false).expect("non-probing resolution always yields a value")
    }

    /// Like `get_value_refd_last`, but when `probing` is set and the chain
    /// crosses a choice field access whose alternative name doesn't match,
    /// returns `None` instead of reporting an `Incompatible` diagnostic.
    /// Used by `isbound`/`ispresent` on a sub-reference into a choice,
    /// which must fold to `false` silently rather than error out.
    fn get_value_refd_last_probing(&mut self, v: &ValueRef<G>, probing: bool) -> Option<ValueRef<G>> {
        let is_refd = matches!(v.borrow().kind, ValueKind::Refd { .. });
        if is_refd {
            return self.resolve_refd(v, probing);
        }
        let is_expr = matches!(v.borrow().kind, ValueKind::Expr(_));
        if is_expr {
            return Some(self.evaluate_expr(v));
        }
        Some(v.clone())
    }

    fn resolve_refd(&mut self, v: &ValueRef<G>, probing: bool) -> Option<ValueRef<G>> {
        let (full_name, sub_refs, cached) = match &v.borrow().kind {
            ValueKind::Refd { reference, cached_last } => {
                (reference.full_name.clone(), reference.sub_refs.clone(), cached_last.borrow().clone())
            }
            _ => unreachable!(),
        };
        if !probing {
            if let Some(cached) = cached {
                return Some(cached);
            }
        }

        let mark = self.chain.mark_state();
        if !self.chain.add(&full_name) {
            self.report_error(&v.borrow().location, format!("cyclic reference detected: {full_name}"));
            v.borrow_mut().set_error();
            self.chain.prev_state(mark);
            return Some(v.clone());
        }

        let result = match self.resolver.classify(&full_name) {
            AssignmentClass::Constant => match self.resolver.constant_value(&full_name) {
                Some(target) => {
                    let resolved = self.get_value_refd_last(&target);
                    match self.get_refd_sub_value_probing(&resolved, &sub_refs, probing) {
                        Ok(Some(sub)) => Some(sub),
                        Ok(None) => None,
                        Err(e) => {
                            self.report_error(&v.borrow().location, e.to_string());
                            v.borrow_mut().set_error();
                            Some(v.clone())
                        }
                    }
                }
                None => {
                    self.report_error(&v.borrow().location, format!("unresolved reference {full_name:?}"));
                    v.borrow_mut().set_error();
                    Some(v.clone())
                }
            },
            AssignmentClass::Unresolved => {
                self.report_error(&v.borrow().location, format!("unresolved reference {full_name:?}"));
                v.borrow_mut().set_error();
                Some(v.clone())
            }
            _ => Some(v.clone()), // variable/parameter/function/.. : not foldable, return as-is
        };

        self.chain.prev_state(mark);
        if !probing {
            if let Some(result) = &result {
                if let ValueKind::Refd { cached_last, .. } = &v.borrow().kind {
                    *cached_last.borrow_mut() = Some(result.clone());
                }
            }
        }
        result
    }

    /// Walks `FieldRef`/`ArrayRef` sub-references against a compound value.
    pub fn get_refd_sub_value(&self, base: &ValueRef<G>, subs: &[SubRef]) -> Result<ValueRef<G>, FoldError> {
        Ok(self
            .get_refd_sub_value_probing(base, subs, false)?
            .expect("non-probing sub-value resolution always yields a value"))
    }

    /// `probing` suppresses a choice field-access name mismatch into a
    /// clean `Ok(None)` instead of `Err(Incompatible(..))` — the rest of
    /// the walk (array bounds, missing record fields) still errors either
    /// way, since those aren't what `isbound`/`ispresent` probe for.
    fn get_refd_sub_value_probing(
        &self,
        base: &ValueRef<G>,
        subs: &[SubRef],
        probing: bool,
    ) -> Result<Option<ValueRef<G>>, FoldError> {
        let mut current = base.clone();
        for sub in subs {
            current = match sub {
                SubRef::Field(name) => match self.field_access(&current, name, probing)? {
                    Some(next) => next,
                    None => return Ok(None),
                },
                SubRef::Array(idx) => self.array_access(&current, *idx)?,
            };
        }
        Ok(Some(current))
    }

    fn field_access(&self, v: &ValueRef<G>, name: &str, probing: bool) -> Result<Option<ValueRef<G>>, FoldError> {
        let b = v.borrow();
        match &b.kind {
            ValueKind::Choice { alt_name, alt_value } => {
                if alt_name == name {
                    Ok(Some(alt_value.clone()))
                } else if probing {
                    Ok(None)
                } else {
                    Err(FoldError::Incompatible(format!(
                        "choice alternative is {alt_name:?}, not {name:?}"
                    )))
                }
            }
            ValueKind::Seq(fields) | ValueKind::Set(fields) => fields
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, val)| Some(val.clone()))
                .ok_or_else(|| FoldError::Unresolved(name.to_string())),
            _ => Err(FoldError::DomainType { expected: "record/set/choice".into(), actual: "other".into() }),
        }
    }

    fn array_access(&self, v: &ValueRef<G>, idx: i64) -> Result<ValueRef<G>, FoldError> {
        let b = v.borrow();
        let elems = match &b.kind {
            ValueKind::SeqOf(xs) | ValueKind::SetOf(xs) | ValueKind::Array(xs) => xs,
            _ => return Err(FoldError::DomainType { expected: "record-of/set-of/array".into(), actual: "other".into() }),
        };
        if idx < 0 || idx as usize >= elems.len() {
            return Err(FoldError::IndexOutOfBounds { index: idx, len: elems.len() });
        }
        Ok(elems[idx as usize].clone())
    }

    fn evaluate_expr(&mut self, v: &ValueRef<G>) -> ValueRef<G> {
        {
            let state = match &v.borrow().kind {
                ValueKind::Expr(e) => e.state,
                _ => unreachable!(),
            };
            match state {
                ExprState::Checked => return v.clone(),
                ExprState::Checking => {
                    if let ValueKind::Expr(e) = &mut v.borrow_mut().kind {
                        e.state = ExprState::CheckingErr;
                    }
                    self.report_error(&v.borrow().location, "cyclic expression reference");
                    v.borrow_mut().set_error();
                    return v.clone();
                }
                ExprState::CheckingErr => return v.clone(),
                ExprState::NotChecked => {
                    if let ValueKind::Expr(e) = &mut v.borrow_mut().kind {
                        e.state = ExprState::Checking;
                    }
                }
            }
        }

        let folded = self.fold_operator(v);
        match folded {
            Ok(new_kind) => {
                v.borrow_mut().kind = new_kind;
            }
            Err(e) => {
                self.report_error(&v.borrow().location, e.to_string());
                v.borrow_mut().set_error();
            }
        }
        v.clone()
    }

    fn fold_operator(&mut self, v: &ValueRef<G>) -> Result<ValueKind<G>, FoldError> {
        let (op, operands, aux_ints, aux_bools, aux_strs) = {
            let b = v.borrow();
            match &b.kind {
                ValueKind::Expr(e) => {
                    (e.op, e.operands.clone(), e.aux_ints.clone(), e.aux_bools.clone(), e.aux_strs.clone())
                }
                _ => unreachable!(),
            }
        };
        tracing::trace!(?op, "folding expression");

        // Probing predicates resolve their operand specially: a mismatched
        // choice alternative along the way answers the predicate directly
        // instead of producing an operand-level error.
        if matches!(op, Op::IsBound | Op::IsPresent) {
            return Ok(self.fold_probing_predicate(op, &operands[0]));
        }
        if op == Op::IsChosen {
            return Ok(self.fold_is_chosen(&operands[0], &aux_strs[0]));
        }

        let resolved: Vec<ValueRef<G>> = operands.iter().map(|o| self.get_value_refd_last(o)).collect();
        if resolved.iter().any(|r| r.borrow().is_error()) {
            return Ok(ValueKind::Error);
        }

        evaluate_operator(op, &resolved, &aux_ints, &aux_bools, self.config)
    }

    fn fold_probing_predicate(&mut self, op: Op, operand: &ValueRef<G>) -> ValueKind<G> {
        match self.get_value_refd_last_probing(operand, true) {
            None => ValueKind::Bool(false),
            Some(resolved) => {
                let b = resolved.borrow();
                match op {
                    Op::IsBound => ValueKind::Bool(!matches!(b.kind, ValueKind::Error)),
                    Op::IsPresent => ValueKind::Bool(!matches!(b.kind, ValueKind::Omit)),
                    _ => unreachable!(),
                }
            }
        }
    }

    /// `ischosen(x.alt)` must check `alt` against the choice `x` holds,
    /// not the value the chosen alternative holds — so this resolves the
    /// operand one sub-reference short of where the uniform operand
    /// resolution in `fold_operator` would otherwise dereference past the
    /// `Choice` and into `alt_value`.
    fn fold_is_chosen(&mut self, operand: &ValueRef<G>, alt_name: &str) -> ValueKind<G> {
        match self.resolve_up_to_choice(operand) {
            Some(resolved) => match &resolved.borrow().kind {
                ValueKind::Choice { alt_name: actual, .. } => ValueKind::Bool(actual == alt_name),
                _ => ValueKind::Bool(false),
            },
            None => ValueKind::Bool(false),
        }
    }

    fn resolve_up_to_choice(&mut self, v: &ValueRef<G>) -> Option<ValueRef<G>> {
        let is_refd = matches!(v.borrow().kind, ValueKind::Refd { .. });
        if !is_refd {
            return Some(self.get_value_refd_last(v));
        }
        let (full_name, sub_refs) = match &v.borrow().kind {
            ValueKind::Refd { reference, .. } => (reference.full_name.clone(), reference.sub_refs.clone()),
            _ => unreachable!(),
        };
        if sub_refs.is_empty() {
            return Some(self.get_value_refd_last(v));
        }
        let base = Value::synthetic(ValueKind::Refd {
            reference: RefHandle { full_name, sub_refs: vec![] },
            cached_last: std::cell::RefCell::new(None),
        })
        .into_ref();
        let resolved_base = self.get_value_refd_last(&base);
        self.get_refd_sub_value(&resolved_base, &sub_refs[..sub_refs.len() - 1]).ok()
    }
}

fn as_int<G: Governor>(v: &ValueRef<G>) -> Result<BigInt, FoldError> {
    match &v.borrow().kind {
        ValueKind::Int(i) => Ok(i.clone()),
        other => Err(FoldError::DomainType { expected: "int".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    }
}

fn as_real<G: Governor>(v: &ValueRef<G>) -> Option<f64> {
    match &v.borrow().kind {
        ValueKind::Real(r) => Some(*r),
        _ => None,
    }
}

fn as_bool<G: Governor>(v: &ValueRef<G>) -> Result<bool, FoldError> {
    match &v.borrow().kind {
        ValueKind::Bool(b) => Ok(*b),
        other => Err(FoldError::DomainType { expected: "bool".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    }
}

fn as_cstr<G: Governor>(v: &ValueRef<G>) -> Result<vs::CharString, FoldError> {
    match &v.borrow().kind {
        ValueKind::Cstr(s) => Ok(s.clone()),
        other => Err(FoldError::DomainType { expected: "charstring".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    }
}

fn as_bstr<G: Governor>(v: &ValueRef<G>) -> Result<vs::BitString, FoldError> {
    match &v.borrow().kind {
        ValueKind::Bstr(s) => Ok(s.clone()),
        other => Err(FoldError::DomainType { expected: "bitstring".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    }
}

fn as_hstr<G: Governor>(v: &ValueRef<G>) -> Result<vs::HexString, FoldError> {
    match &v.borrow().kind {
        ValueKind::Hstr(s) => Ok(s.clone()),
        other => Err(FoldError::DomainType { expected: "hexstring".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    }
}

fn as_ostr<G: Governor>(v: &ValueRef<G>) -> Result<vs::OctString, FoldError> {
    match &v.borrow().kind {
        ValueKind::Ostr(s) => Ok(s.clone()),
        other => Err(FoldError::DomainType { expected: "octetstring".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    }
}

/// Per-operator rewrite: arithmetic and comparisons are evaluated directly,
/// and the conversion/string-op family delegates straight to
/// `vfold-strings`.
fn evaluate_operator<G: Governor>(
    op: Op,
    operands: &[ValueRef<G>],
    aux_ints: &[i64],
    aux_bools: &[bool],
    config: &FoldConfig,
) -> Result<ValueKind<G>, FoldError> {
    use Op::*;
    match op {
        Add | Sub | Mul | Div | Mod | Rem => {
            if let (Some(a), Some(b)) = (as_real(&operands[0]), as_real(&operands[1])) {
                let r = match op {
                    Add => a + b,
                    Sub => a - b,
                    Mul => a * b,
                    Div => a / b,
                    _ => return Err(FoldError::DomainType { expected: "int".into(), actual: "real".into() }),
                };
                return Ok(ValueKind::Real(r));
            }
            let a = as_int(&operands[0])?;
            let b = as_int(&operands[1])?;
            if matches!(op, Div | Mod | Rem) && b.is_zero() {
                return Err(FoldError::DomainValue("division by zero".into()));
            }
            let r = match op {
                Add => a.add(&b),
                Sub => a.sub(&b),
                Mul => a.mul(&b),
                Div => a.div(&b),
                Mod => a.modulo(&b),
                Rem => a.rem(&b),
                _ => unreachable!(),
            };
            Ok(ValueKind::Int(r))
        }
        UnaryMinus => Ok(match as_real(&operands[0]) {
            Some(r) => ValueKind::Real(-r),
            None => ValueKind::Int(as_int(&operands[0])?.neg()),
        }),
        UnaryPlus => Ok(operands[0].borrow().kind.clone_for_fold()),

        Not => Ok(ValueKind::Bool(!as_bool(&operands[0])?)),
        And => {
            let a = as_bool(&operands[0])?;
            if !a {
                return Ok(ValueKind::Bool(false));
            }
            Ok(ValueKind::Bool(as_bool(&operands[1])?))
        }
        Or => {
            let a = as_bool(&operands[0])?;
            if a {
                return Ok(ValueKind::Bool(true));
            }
            Ok(ValueKind::Bool(as_bool(&operands[1])?))
        }
        Xor => Ok(ValueKind::Bool(as_bool(&operands[0])? ^ as_bool(&operands[1])?)),

        Eq | Ne | Lt | Gt | Le | Ge => {
            let a = operands[0].borrow();
            let b = operands[1].borrow();
            let result = match op {
                Eq => a.kind == b.kind,
                Ne => a.kind != b.kind,
                Lt => a.partial_cmp(&b) == Some(std::cmp::Ordering::Less),
                Gt => a.partial_cmp(&b) == Some(std::cmp::Ordering::Greater),
                Le => matches!(a.partial_cmp(&b), Some(std::cmp::Ordering::Less | std::cmp::Ordering::Equal)),
                Ge => matches!(a.partial_cmp(&b), Some(std::cmp::Ordering::Greater | std::cmp::Ordering::Equal)),
                _ => unreachable!(),
            };
            Ok(ValueKind::Bool(result))
        }

        Concat => concat(operands),

        Substr => {
            let pos = aux_ints[0];
            let n = aux_ints[1];
            string_substr(&operands[0], pos, n)
        }
        Replace => {
            let pos = aux_ints[0];
            let n = aux_ints[1];
            string_replace(&operands[0], pos, n, &operands[1])
        }
        Regexp => {
            let group = aux_ints[0];
            let nocase = aux_bools[0];
            let input = as_cstr(&operands[0])?;
            let pattern = as_cstr(&operands[1])?;
            let result = vs::regexp(&input, &pattern, group, nocase)
                .map_err(|e| FoldError::ConversionFormat(e.to_string()))?;
            Ok(ValueKind::Cstr(result))
        }

        RotateLeft => rotate_or_shift(&operands[0], aux_ints[0], true, true),
        RotateRight => rotate_or_shift(&operands[0], aux_ints[0], true, false),
        ShiftLeft => rotate_or_shift(&operands[0], aux_ints[0], false, true),
        ShiftRight => rotate_or_shift(&operands[0], aux_ints[0], false, false),

        Bit2Int => Ok(ValueKind::Int(vs::bit2int(&as_bstr(&operands[0])?))),
        Bit2Hex => Ok(ValueKind::Hstr(vs::bit2hex(&as_bstr(&operands[0])?))),
        Bit2Oct => Ok(ValueKind::Ostr(vs::bit2oct(&as_bstr(&operands[0])?))),
        Hex2Bit => Ok(ValueKind::Bstr(vs::hex2bit(&as_hstr(&operands[0])?))),
        Hex2Int => Ok(ValueKind::Int(vs::hex2int(&as_hstr(&operands[0])?))),
        Hex2Oct => Ok(ValueKind::Ostr(vs::hex2oct(&as_hstr(&operands[0])?))),
        Oct2Bit => Ok(ValueKind::Bstr(vs::oct2bit(&as_ostr(&operands[0])?))),
        Oct2Hex => Ok(ValueKind::Hstr(vs::oct2hex(&as_ostr(&operands[0])?))),
        Oct2Int => Ok(ValueKind::Int(vs::oct2int(&as_ostr(&operands[0])?))),
        Oct2Char => Ok(ValueKind::Cstr(
            vs::oct2char(&as_ostr(&operands[0])?).map_err(|e| FoldError::ConversionRange(e.to_string(), "char-string".into()))?,
        )),
        Char2Int => Ok(ValueKind::Int(
            vs::char2int(&as_cstr(&operands[0])?).map_err(|e| FoldError::DomainValue(e.to_string()))?,
        )),
        Char2Oct => Ok(ValueKind::Ostr(
            vs::char2oct(&as_cstr(&operands[0])?).map_err(|e| FoldError::DomainValue(e.to_string()))?,
        )),
        Unichar2Int => {
            let u = match &operands[0].borrow().kind {
                ValueKind::Ustr(u) => u.clone(),
                _ => return Err(FoldError::DomainType { expected: "universal charstring".into(), actual: "other".into() }),
            };
            Ok(ValueKind::Int(vs::unichar2int(&u).map_err(|e| FoldError::DomainValue(e.to_string()))?))
        }
        Int2Bit => {
            let v = as_int(&operands[0])?;
            let n = aux_ints[0];
            Ok(ValueKind::Bstr(
                vs::int2bit(&v, n).map_err(|e| FoldError::ConversionRange(v.to_string(), e.to_string()))?,
            ))
        }
        Int2Hex => {
            let v = as_int(&operands[0])?;
            let n = aux_ints[0];
            Ok(ValueKind::Hstr(
                vs::int2hex(&v, n).map_err(|e| FoldError::ConversionRange(v.to_string(), e.to_string()))?,
            ))
        }
        Int2Oct => {
            let v = as_int(&operands[0])?;
            let n = aux_ints[0];
            Ok(ValueKind::Ostr(
                vs::int2oct(&v, n).map_err(|e| FoldError::ConversionRange(v.to_string(), e.to_string()))?,
            ))
        }
        Int2Char => {
            let v = as_int(&operands[0])?;
            Ok(ValueKind::Cstr(vs::int2char(&v).map_err(|e| FoldError::ConversionRange(v.to_string(), e.to_string()))?))
        }
        Int2Unichar => {
            let v = as_int(&operands[0])?;
            Ok(ValueKind::Ustr(vs::int2unichar(&v).map_err(|e| FoldError::ConversionRange(v.to_string(), e.to_string()))?))
        }

        GetStringEncoding => {
            let o = as_ostr(&operands[0])?;
            let raw = vs::ByteString::new(o.raw_octets());
            let name = vs::get_string_encoding(&raw);
            let _ = config; // whitelist is consulted by encvalue_unichar, not here
            Ok(ValueKind::Cstr(vs::CharString::new(name.as_bytes().to_vec()).expect("ascii")))
        }
        RemoveBom => {
            let o = as_ostr(&operands[0])?;
            let raw = vs::ByteString::new(o.raw_octets());
            Ok(ValueKind::Ostr(vs::OctString::from_octets(vs::remove_bom(&raw).as_bytes())))
        }

        Lengthof => Ok(ValueKind::Int(BigInt::from_i64(length_of(&operands[0])? as i64))),
        Sizeof => Ok(ValueKind::Int(BigInt::from_i64(size_of(&operands[0])? as i64))),

        Not4b => bitwise_unary(&operands[0]),
        And4b | Or4b | Xor4b => bitwise_binary(op, &operands[0], &operands[1]),

        // `IsBound`/`IsPresent`/`IsChosen` are intercepted earlier in
        // `fold_operator`, which resolves their operand specially; they
        // never reach this function.
        IsValue => Ok(ValueKind::Bool(!matches!(
            operands[0].borrow().kind,
            ValueKind::AnyValue(_) | ValueKind::AnyOrOmit(_) | ValueKind::Omit | ValueKind::Error
        ))),

        _ => Err(FoldError::Incompatible(format!("{op:?} has no constant-folding contract"))),
    }
}

fn length_of<G: Governor>(v: &ValueRef<G>) -> Result<usize, FoldError> {
    let b = v.borrow();
    Ok(match &b.kind {
        ValueKind::Bstr(s) => s.len(),
        ValueKind::Hstr(s) => s.len(),
        ValueKind::Ostr(s) => s.len(),
        ValueKind::Cstr(s) => s.len(),
        ValueKind::Ustr(s) => s.len(),
        ValueKind::SeqOf(xs) | ValueKind::SetOf(xs) | ValueKind::Array(xs) => xs.len(),
        ValueKind::Seq(fields) | ValueKind::Set(fields) => fields.len(),
        other => return Err(FoldError::DomainType { expected: "string/list".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    })
}

/// `sizeof`: unlike `lengthof`, excludes `omit` fields from a record/set
/// count, reports an array's declared dimension rather than its live
/// element count, and on a record-of/set-of resolves an `AnyValue`/
/// `AnyOrOmit` length-restriction wildcard to its upper bound (erroring on
/// an unrestricted `*`, which has no defined size).
fn size_of<G: Governor>(v: &ValueRef<G>) -> Result<usize, FoldError> {
    let b = v.borrow();
    match &b.kind {
        ValueKind::SeqOf(xs) | ValueKind::SetOf(xs) => size_of_list(xs),
        ValueKind::Array(_) => b
            .governor
            .as_ref()
            .and_then(Governor::component_count)
            .ok_or_else(|| FoldError::DomainValue("array has no declared component count".into())),
        ValueKind::Seq(fields) | ValueKind::Set(fields) => {
            Ok(fields.iter().filter(|(_, f)| !matches!(f.borrow().kind, ValueKind::Omit)).count())
        }
        _ => length_of(v),
    }
}

fn size_of_list<G: Governor>(xs: &[ValueRef<G>]) -> Result<usize, FoldError> {
    for x in xs {
        let b = x.borrow();
        match &b.kind {
            ValueKind::AnyValue(restriction) | ValueKind::AnyOrOmit(restriction) => {
                return match restriction {
                    Some(r) => r.max.map(|m| m as usize).ok_or_else(|| {
                        FoldError::DomainValue("length-restricted wildcard has no upper bound".into())
                    }),
                    None => Err(FoldError::DomainValue("sizeof is undefined for an unrestricted '*' wildcard".into())),
                };
            }
            _ => {}
        }
    }
    Ok(xs.len())
}

fn hex_val(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}
const HEX_UP: &[u8; 16] = b"0123456789ABCDEF";

/// Bitwise NOT on a binary-string value, per element: `'0'/'1'` flip for
/// bitstrings, nibble/byte complement for hex/octetstrings.
fn bitwise_unary<G: Governor>(v: &ValueRef<G>) -> Result<ValueKind<G>, FoldError> {
    let b = v.borrow();
    Ok(match &b.kind {
        ValueKind::Bstr(s) => {
            let bits: Vec<u8> = s.as_bytes().iter().map(|&c| if c == b'1' { b'0' } else { b'1' }).collect();
            ValueKind::Bstr(vs::BitString::new(bits).expect("flipped bits stay in alphabet"))
        }
        ValueKind::Hstr(s) => {
            let digits: Vec<u8> = s.as_bytes().iter().map(|&c| HEX_UP[(!hex_val(c) & 0xF) as usize]).collect();
            ValueKind::Hstr(vs::HexString::new(digits).expect("complemented nibbles stay in alphabet"))
        }
        ValueKind::Ostr(s) => {
            let digits: Vec<u8> = s.as_bytes().iter().map(|&c| HEX_UP[(!hex_val(c) & 0xF) as usize]).collect();
            ValueKind::Ostr(vs::OctString::new(digits).expect("complemented hex digits stay in alphabet and even-length"))
        }
        other => return Err(FoldError::DomainType { expected: "binary string".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    })
}

/// Bitwise AND/OR/XOR between two same-flavor binary strings. The shorter
/// operand is zero-extended on the right to the longer one's length.
fn bitwise_binary<G: Governor>(op: Op, a: &ValueRef<G>, b: &ValueRef<G>) -> Result<ValueKind<G>, FoldError> {
    let ab = a.borrow();
    let bb = b.borrow();
    fn combine(op: Op, x: u8, y: u8, width: u8) -> u8 {
        let r = match op {
            Op::And4b => x & y,
            Op::Or4b => x | y,
            Op::Xor4b => x ^ y,
            _ => unreachable!(),
        };
        r & (if width == 8 { 0xFF } else { (1 << width) - 1 })
    }
    Ok(match (&ab.kind, &bb.kind) {
        (ValueKind::Bstr(x), ValueKind::Bstr(y)) => {
            let len = x.len().max(y.len());
            let bits: Vec<u8> = (0..len)
                .map(|i| {
                    let xb = x.as_bytes().get(i).map(|&c| c == b'1').unwrap_or(false) as u8;
                    let yb = y.as_bytes().get(i).map(|&c| c == b'1').unwrap_or(false) as u8;
                    if combine(op, xb, yb, 1) == 1 { b'1' } else { b'0' }
                })
                .collect();
            ValueKind::Bstr(vs::BitString::new(bits).expect("combined bits stay in alphabet"))
        }
        (ValueKind::Hstr(x), ValueKind::Hstr(y)) => {
            let len = x.len().max(y.len());
            let digits: Vec<u8> = (0..len)
                .map(|i| {
                    let xv = x.as_bytes().get(i).map(|&c| hex_val(c)).unwrap_or(0);
                    let yv = y.as_bytes().get(i).map(|&c| hex_val(c)).unwrap_or(0);
                    HEX_UP[combine(op, xv, yv, 4) as usize]
                })
                .collect();
            ValueKind::Hstr(vs::HexString::new(digits).expect("combined nibbles stay in alphabet"))
        }
        (ValueKind::Ostr(x), ValueKind::Ostr(y)) => {
            let len = x.as_bytes().len().max(y.as_bytes().len());
            let digits: Vec<u8> = (0..len)
                .map(|i| {
                    let xv = x.as_bytes().get(i).map(|&c| hex_val(c)).unwrap_or(0);
                    let yv = y.as_bytes().get(i).map(|&c| hex_val(c)).unwrap_or(0);
                    HEX_UP[combine(op, xv, yv, 4) as usize]
                })
                .collect();
            ValueKind::Ostr(vs::OctString::new(digits).expect("combined hex digits stay in alphabet and even-length"))
        }
        _ => return Err(FoldError::Incompatible("bitwise operands must share a binary-string tag".into())),
    })
}

fn concat<G: Governor>(operands: &[ValueRef<G>]) -> Result<ValueKind<G>, FoldError> {
    let a = operands[0].borrow();
    let b = operands[1].borrow();
    match (&a.kind, &b.kind) {
        (ValueKind::Cstr(x), ValueKind::Cstr(y)) => Ok(ValueKind::Cstr(x.concat(y))),
        (ValueKind::Cstr(x), ValueKind::Ustr(y)) => {
            Ok(ValueKind::Ustr(vs::UString::from_char_codes(&x.as_bytes().iter().map(|&b| b as u32).collect::<Vec<_>>()).concat(y)))
        }
        (ValueKind::Ustr(x), ValueKind::Cstr(y)) => {
            Ok(ValueKind::Ustr(x.concat(&vs::UString::from_char_codes(&y.as_bytes().iter().map(|&b| b as u32).collect::<Vec<_>>()))))
        }
        (ValueKind::Ustr(x), ValueKind::Ustr(y)) => Ok(ValueKind::Ustr(x.concat(y))),
        (ValueKind::Bstr(x), ValueKind::Bstr(y)) => Ok(ValueKind::Bstr(x.concat(y))),
        (ValueKind::Hstr(x), ValueKind::Hstr(y)) => Ok(ValueKind::Hstr(x.concat(y))),
        (ValueKind::Ostr(x), ValueKind::Ostr(y)) => Ok(ValueKind::Ostr(x.concat(y))),
        _ => Err(FoldError::Incompatible("concat operands must share a binary-string tag".into())),
    }
}

fn string_substr<G: Governor>(v: &ValueRef<G>, pos: i64, n: i64) -> Result<ValueKind<G>, FoldError> {
    let b = v.borrow();
    let oob = |e: vs::StringError| match e {
        vs::StringError::IndexOutOfBounds { pos, len } => FoldError::IndexOutOfBounds { index: pos, len },
        other => FoldError::DomainValue(other.to_string()),
    };
    Ok(match &b.kind {
        ValueKind::Cstr(s) => ValueKind::Cstr(s.substr(pos, n).map_err(oob)?),
        ValueKind::Bstr(s) => ValueKind::Bstr(s.substr(pos, n).map_err(oob)?),
        ValueKind::Hstr(s) => ValueKind::Hstr(s.substr(pos, n).map_err(oob)?),
        // `pos`/`n` count octets; `OctString::substr` doubles into its
        // hex-digit-pair storage internally.
        ValueKind::Ostr(s) => ValueKind::Ostr(s.substr(pos, n).map_err(oob)?),
        other => return Err(FoldError::DomainType { expected: "string".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    })
}

fn string_replace<G: Governor>(v: &ValueRef<G>, pos: i64, n: i64, with: &ValueRef<G>) -> Result<ValueKind<G>, FoldError> {
    let b = v.borrow();
    let w = with.borrow();
    let oob = |e: vs::StringError| match e {
        vs::StringError::IndexOutOfBounds { pos, len } => FoldError::IndexOutOfBounds { index: pos, len },
        other => FoldError::DomainValue(other.to_string()),
    };
    Ok(match (&b.kind, &w.kind) {
        (ValueKind::Cstr(s), ValueKind::Cstr(t)) => ValueKind::Cstr(s.replace(pos, n, t).map_err(oob)?),
        (ValueKind::Bstr(s), ValueKind::Bstr(t)) => ValueKind::Bstr(s.replace(pos, n, t).map_err(oob)?),
        (ValueKind::Hstr(s), ValueKind::Hstr(t)) => ValueKind::Hstr(s.replace(pos, n, t).map_err(oob)?),
        (ValueKind::Ostr(s), ValueKind::Ostr(t)) => ValueKind::Ostr(s.replace(pos, n, t).map_err(oob)?),
        _ => return Err(FoldError::Incompatible("replace operands must share a string tag".into())),
    })
}

fn rotate_or_shift<G: Governor>(v: &ValueRef<G>, count: i64, rotate: bool, left: bool) -> Result<ValueKind<G>, FoldError> {
    let b = v.borrow();
    macro_rules! apply {
        ($s:expr, $fill:expr) => {
            if rotate {
                if left { $s.rotate_left(count) } else { $s.rotate_right(count) }
            } else if left {
                $s.shift_left(count, $fill)
            } else {
                $s.shift_right(count, $fill)
            }
        };
    }
    Ok(match &b.kind {
        ValueKind::Bstr(s) => ValueKind::Bstr(apply!(s, b'0')),
        ValueKind::Hstr(s) => ValueKind::Hstr(apply!(s, b'0')),
        // Octetstring fill is a raw octet value, not the hex digit '0'.
        ValueKind::Ostr(s) => ValueKind::Ostr(apply!(s, 0u8)),
        ValueKind::Cstr(s) => ValueKind::Cstr(apply!(s, b'0')),
        other => return Err(FoldError::DomainType { expected: "string".into(), actual: format!("{:?}", std::mem::discriminant(other)) }),
    })
}

impl<G: Governor> ValueKind<G> {
    /// Shallow clone used only by folding (e.g. unary `+`, which is
    /// identity on its operand) — not exposed generally since most kinds
    /// own non-`Clone` children through `Rc`, which this simply clones.
    fn clone_for_fold(&self) -> ValueKind<G> {
        match self {
            ValueKind::Int(i) => ValueKind::Int(i.clone()),
            ValueKind::Real(r) => ValueKind::Real(*r),
            other => {
                // Cheap for every other kind we reach via unary `+`
                // (arithmetic-typed operands only); anything else is a
                // DomainType error the checker should have already caught.
                match other {
                    ValueKind::Bool(b) => ValueKind::Bool(*b),
                    _ => ValueKind::Error,
                }
            }
        }
    }
}
