//! Deep structural equality and ordering over `Value`.
//!
//! Ordering is defined only for `Int`, `Real`, `Enum`; everything else's
//! `PartialOrd` returns `None`, matching "Ordering is defined only for
//! Int, Real, Enum (by declared ordinal)".

use crate::traits::Governor;
use crate::value::{Value, ValueKind, ValueRef};
use std::cmp::Ordering;
use vfold_strings::UString;

fn canonical_ustring_cstr(bytes: &[u8]) -> UString {
    UString::from_char_codes(&bytes.iter().map(|&b| b as u32).collect::<Vec<_>>())
}

fn deref<G: Governor>(v: &ValueRef<G>) -> std::cell::Ref<'_, Value<G>> {
    v.borrow()
}

impl<G: Governor> PartialEq for Value<G> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl<G: Governor> PartialEq for ValueKind<G> {
    fn eq(&self, other: &Self) -> bool {
        use ValueKind::*;
        match (self, other) {
            (Null, Null) | (Omit, Omit) | (NotUsed, NotUsed) | (TtcnNull, TtcnNull)
            | (DefaultNull, DefaultNull) | (FatNull, FatNull) | (Error, Error) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            // IEEE 754: NaN never equals anything, including itself.
            (Real(a), Real(b)) => !a.is_nan() && !b.is_nan() && a == b,
            (Enum(an, ao), Enum(bn, bo)) => an == bn && ao == bo,
            (Verdict(a), Verdict(b)) => a == b,
            (Bstr(a), Bstr(b)) => a == b,
            (Hstr(a), Hstr(b)) => a == b,
            (Ostr(a), Ostr(b)) => a == b,
            (NamedBits(a), NamedBits(b)) => a == b,
            (Oid(a), Oid(b)) | (Roid(a), Roid(b)) => a == b,

            // Cstr/Ustr/Iso2022str interconvert via their canonical UString
            // form; Iso2022str only compares equal to another byte-identical
            // Iso2022str (DESIGN.md's resolution of the open question).
            (Cstr(a), Cstr(b)) => a == b,
            (Ustr(a), Ustr(b)) => a == b,
            (Cstr(a), Ustr(b)) | (Ustr(b), Cstr(a)) => canonical_ustring_cstr(a.as_bytes()) == *b,
            (Iso2022str(a), Iso2022str(b)) => a == b,

            (Choice { alt_name: an, alt_value: av }, Choice { alt_name: bn, alt_value: bv }) => {
                an == bn && *deref(av) == *deref(bv)
            }
            (SeqOf(a), SeqOf(b)) | (Array(a), Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| *deref(x) == *deref(y))
            }
            (SetOf(a), SetOf(b)) => setof_eq(a, b),
            (Seq(a), Seq(b)) | (Set(a), Set(b)) => named_eq(a, b),
            _ => false,
        }
    }
}

/// Multiset matching: every element of `a` must match a distinct,
/// not-yet-used element of `b`.
fn setof_eq<G: Governor>(a: &[ValueRef<G>], b: &[ValueRef<G>]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    'outer: for x in a {
        for (i, y) in b.iter().enumerate() {
            if !used[i] && *deref(x) == *deref(y) {
                used[i] = true;
                continue 'outer;
            }
        }
        return false;
    }
    true
}

/// Componentwise Seq/Set comparison, honoring the absent-field-equals-omit
/// rule: a field present on one side and missing on the other compares
/// against an implicit `Omit`.
fn named_eq<G: Governor>(a: &[(String, ValueRef<G>)], b: &[(String, ValueRef<G>)]) -> bool {
    let find = |list: &[(String, ValueRef<G>)], name: &str| list.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone());
    let mut names: Vec<&str> = a.iter().map(|(n, _)| n.as_str()).collect();
    for (n, _) in b {
        if !names.contains(&n.as_str()) {
            names.push(n.as_str());
        }
    }
    names.into_iter().all(|name| {
        let left = find(a, name);
        let right = find(b, name);
        match (left, right) {
            (Some(l), Some(r)) => *deref(&l) == *deref(&r),
            (Some(l), None) => matches!(deref(&l).kind, ValueKind::Omit),
            (None, Some(r)) => matches!(deref(&r).kind, ValueKind::Omit),
            (None, None) => true,
        }
    })
}

impl<G: Governor> PartialOrd for Value<G> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (&self.kind, &other.kind) {
            (ValueKind::Int(a), ValueKind::Int(b)) => a.partial_cmp(b),
            (ValueKind::Real(a), ValueKind::Real(b)) => a.partial_cmp(b),
            (ValueKind::Enum(_, a), ValueKind::Enum(_, b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::testutil::DummyGovernor;
    use crate::value::Value;
    use vfold_strings::CharString;

    fn cstr(s: &str) -> Value<DummyGovernor> {
        Value::synthetic(ValueKind::Cstr(CharString::new(s.as_bytes().to_vec()).unwrap()))
    }

    #[test]
    fn reflexivity_holds_for_non_nan_values() {
        let v = Value::<DummyGovernor>::new_int(42);
        assert_eq!(v, v);
    }

    #[test]
    fn nan_never_equals_itself() {
        let v = Value::<DummyGovernor>::synthetic(ValueKind::Real(f64::NAN));
        assert_ne!(v, v);
    }

    #[test]
    fn cstr_and_ustr_compare_via_canonical_form() {
        let c = cstr("AB");
        let u = Value::<DummyGovernor>::synthetic(ValueKind::Ustr(UString::from_char_codes(&[65, 66])));
        assert_eq!(c, u);
    }

    #[test]
    fn setof_uses_multiset_matching() {
        let a = ValueKind::SetOf(vec![Value::new_int(1).into_ref(), Value::new_int(2).into_ref()]);
        let b = ValueKind::SetOf(vec![Value::new_int(2).into_ref(), Value::new_int(1).into_ref()]);
        assert_eq!(a, b);
    }

    #[test]
    fn ordering_undefined_outside_int_real_enum() {
        let a = cstr("a");
        let b = cstr("b");
        assert_eq!(a.partial_cmp(&b), None);
    }
}
