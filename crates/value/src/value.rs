//! The `Value` tagged union and its controlled mutation, equality and
//! ordering.
//!
//! One enum (`ValueKind`) with a uniform visitor, rather than a hierarchy of
//! per-kind types; metadata every value carries (governor, location,
//! checked/needs-conversion flags) lives alongside it in [`Value`] rather
//! than being re-derived per kind.

use crate::expr::Expr;
use crate::traits::{Governor, Location};
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::rc::Rc;
use vfold_bigint::BigInt;
use vfold_strings::{BitString, CharString, HexString, Iso2022String, OctString, UString};

pub type ValueRef<G> = Rc<RefCell<Value<G>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verdict {
    None,
    Pass,
    Inconc,
    Fail,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct OidComponent {
    pub name: Option<String>,
    pub number: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthRestriction {
    pub min: u64,
    pub max: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroKind {
    FileName,
    LineNumber,
    ModuleId,
    DefinitionId,
    Scope,
    TestcaseId,
}

/// A reference target, stored as a dotted full-name (the Folder never holds
/// a raw pointer into the symbol table — see [`crate::traits::RefResolver`]).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RefHandle {
    pub full_name: String,
    pub sub_refs: Vec<SubRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SubRef {
    Field(String),
    /// Array index; stored as a plain `i64` since index expressions must
    /// already be folded constants by the time sub-reference resolution
    /// runs (see `get_refd_sub_value`).
    Array(i64),
}

pub enum ValueKind<G: Governor> {
    // Atoms
    Null,
    Bool(bool),
    Int(BigInt),
    Real(f64),
    Enum(String, i64),
    Verdict(Verdict),
    Omit,
    NotUsed,
    TtcnNull,
    DefaultNull,
    FatNull,
    // Strings
    Bstr(BitString),
    Hstr(HexString),
    Ostr(OctString),
    Cstr(CharString),
    Iso2022str(Iso2022String),
    Ustr(UString),
    // Compound
    Choice { alt_name: String, alt_value: ValueRef<G> },
    SeqOf(Vec<ValueRef<G>>),
    SetOf(Vec<ValueRef<G>>),
    Array(Vec<ValueRef<G>>),
    Seq(Vec<(String, ValueRef<G>)>),
    Set(Vec<(String, ValueRef<G>)>),
    Oid(Vec<OidComponent>),
    Roid(Vec<OidComponent>),
    NamedBits(BTreeSet<String>),
    /// A parsed character-literal aggregate, held as raw code points until
    /// `set_valuetype` demotes it to `Cstr`/`Ustr`/`Iso2022str`.
    CharSyms(Vec<u32>),
    // References & expressions
    Refd { reference: RefHandle, cached_last: RefCell<Option<ValueRef<G>>> },
    Refer(RefHandle),
    Expr(Expr<G>),
    Macro(MacroKind),
    Invoke { callee: ValueRef<G>, actual_params: Vec<ValueRef<G>> },
    Function(String),
    Altstep(String),
    Testcase(String),
    AnyValue(Option<LengthRestriction>),
    AnyOrOmit(Option<LengthRestriction>),
    // Transient
    UndefLowerId(String),
    /// Opaque raw source text awaiting re-parse by the driver into one of
    /// `NamedBits`/`SeqOf`/`SetOf`/`Seq`/`Set`/`Oid`/`Roid`/`CharSyms`.
    UndefBlock(String),
    // Error sink
    Error,
}

pub struct Value<G: Governor> {
    pub kind: ValueKind<G>,
    pub governor: Option<G>,
    pub location: Location,
    pub is_checked: bool,
    pub needs_conversion: bool,
}

/// Prints the variant tag only, not its payload — `ValueRef<G>` children
/// would otherwise need `G: Debug` to thread through every nested `Rc`,
/// which would leak into the `Governor` bound just for test output.
impl<G: Governor> std::fmt::Debug for ValueKind<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", std::mem::discriminant(self))
    }
}

impl<G: Governor> std::fmt::Debug for Value<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Value")
            .field("kind", &self.kind)
            .field("location", &self.location)
            .field("is_checked", &self.is_checked)
            .finish()
    }
}

impl<G: Governor> Value<G> {
    pub fn new(kind: ValueKind<G>, location: Location) -> Self {
        Value { kind, governor: None, location, is_checked: false, needs_conversion: false }
    }

    /// Construction with no meaningful source location — for synthetic
    /// values created by folding (e.g. the literal replacing a folded
    /// expression) rather than parsed from source.
    pub fn synthetic(kind: ValueKind<G>) -> Self {
        Value::new(kind, Location::new("<synthetic>", 0, "", ""))
    }

    pub fn new_bool(b: bool) -> Self {
        Value::synthetic(ValueKind::Bool(b))
    }

    pub fn new_int(v: i64) -> Self {
        Value::synthetic(ValueKind::Int(BigInt::from_i64(v)))
    }

    pub fn into_ref(self) -> ValueRef<G> {
        Rc::new(RefCell::new(self))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ValueKind::Error)
    }

    pub fn set_error(&mut self) {
        self.kind = ValueKind::Error;
    }

    /// Steal `other`'s representation, keeping this value's own identity
    /// (any `Rc` held by a caller still points at the same allocation).
    pub fn copy_and_destroy(&mut self, other: Value<G>) {
        self.kind = other.kind;
        self.governor = other.governor;
        self.needs_conversion = other.needs_conversion;
        // location/is_checked are this value's own, not borrowed from other.
    }

    /// The controlled mutation used by the folder. Permitted transitions
    /// are a finite closed set; anything else panics as an internal
    /// `OperatorShape`-class invariant violation.
    pub fn set_valuetype(&mut self, new_kind: ValueKind<G>) {
        let allowed = match (&self.kind, &new_kind) {
            (ValueKind::UndefLowerId(_), ValueKind::Enum(..))
            | (ValueKind::UndefLowerId(_), ValueKind::Refd { .. }) => true,
            (ValueKind::UndefBlock(_), ValueKind::NamedBits(_))
            | (ValueKind::UndefBlock(_), ValueKind::SeqOf(_))
            | (ValueKind::UndefBlock(_), ValueKind::SetOf(_))
            | (ValueKind::UndefBlock(_), ValueKind::Seq(_))
            | (ValueKind::UndefBlock(_), ValueKind::Set(_))
            | (ValueKind::UndefBlock(_), ValueKind::Oid(_))
            | (ValueKind::UndefBlock(_), ValueKind::Roid(_))
            | (ValueKind::UndefBlock(_), ValueKind::CharSyms(_)) => true,
            (ValueKind::CharSyms(_), ValueKind::Cstr(_))
            | (ValueKind::CharSyms(_), ValueKind::Ustr(_))
            | (ValueKind::CharSyms(_), ValueKind::Iso2022str(_)) => true,
            (ValueKind::Int(_), ValueKind::Real(_)) => true,
            (ValueKind::Hstr(_), ValueKind::Bstr(_)) | (ValueKind::Hstr(_), ValueKind::Ostr(_)) => true,
            (ValueKind::Bstr(_), ValueKind::Ostr(_)) => true,
            (ValueKind::Cstr(_), ValueKind::Ustr(_)) | (ValueKind::Cstr(_), ValueKind::Iso2022str(_)) => true,
            (ValueKind::Ustr(_), ValueKind::Cstr(_)) => true,
            (ValueKind::SeqOf(_), ValueKind::Seq(_))
            | (ValueKind::SeqOf(_), ValueKind::Set(_))
            | (ValueKind::SeqOf(_), ValueKind::SetOf(_))
            | (ValueKind::SeqOf(_), ValueKind::Array(_)) => true,
            (ValueKind::Seq(_), ValueKind::Choice { .. }) | (ValueKind::Seq(_), ValueKind::Set(_)) => true,
            (ValueKind::Seq(_), ValueKind::Real(_)) => true,
            (ValueKind::TtcnNull, ValueKind::DefaultNull) | (ValueKind::TtcnNull, ValueKind::FatNull) => true,
            // Any value may always collapse into the error sink.
            (_, ValueKind::Error) => true,
            _ => false,
        };
        assert!(
            allowed,
            "OperatorShape violation: illegal set_valuetype transition {:?} -> {:?}",
            std::mem::discriminant(&self.kind),
            std::mem::discriminant(&new_kind)
        );
        self.kind = new_kind;
    }
}

pub(crate) mod testutil {
    //! A minimal `Governor` used only by this crate's own unit tests, so
    //! `Value<G>`'s generic parameter has something concrete to instantiate.
    use crate::traits::Governor;

    #[derive(Debug, Clone, PartialEq)]
    pub struct DummyGovernor {
        pub name: String,
        pub ordinals: std::collections::BTreeMap<String, i64>,
        pub fields: std::collections::BTreeMap<String, Box<DummyGovernor>>,
        pub components: Option<usize>,
    }

    impl Governor for DummyGovernor {
        fn is_compatible(&self, other: &Self) -> bool {
            self.name == other.name
        }
        fn field_type(&self, field: &str) -> Option<Self> {
            self.fields.get(field).map(|g| (**g).clone())
        }
        fn ordinal_of(&self, enum_id: &str) -> Option<i64> {
            self.ordinals.get(enum_id).copied()
        }
        fn component_count(&self) -> Option<usize> {
            self.components
        }
    }
}
