//! The expression node: one flat operator tag plus a generic operand vector,
//! rather than a per-operator struct — the folder, the checker and
//! `is_unfoldable` all read which operands are live from a single
//! [`operator_shape`] table instead of each re-deriving it from the tag.

use crate::traits::Governor;
use crate::value::ValueRef;

/// Every operator kind the folder understands, grouped by what family of
/// operand types it works over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Rem,
    UnaryPlus,
    UnaryMinus,
    // Bitwise (on bit/hex/oct strings)
    Not4b,
    And4b,
    Or4b,
    Xor4b,
    ShiftLeft,
    ShiftRight,
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    // Logical
    And,
    Or,
    Xor,
    Not,
    // Concatenation
    Concat,
    // Rotation
    RotateLeft,
    RotateRight,
    // Conversions
    Bit2Int,
    Bit2Hex,
    Bit2Oct,
    Hex2Bit,
    Hex2Int,
    Hex2Oct,
    Oct2Bit,
    Oct2Hex,
    Oct2Int,
    Oct2Char,
    Char2Int,
    Char2Oct,
    Unichar2Int,
    Int2Bit,
    Int2Hex,
    Int2Oct,
    Int2Char,
    Int2Unichar,
    // String ops
    Substr,
    Replace,
    Regexp,
    Lengthof,
    Sizeof,
    // Template/value predicates
    IsValue,
    IsBound,
    IsPresent,
    IsChosen,
    IsTemplateKind,
    // Runtime surface (always unfoldable)
    Rnd,
    RndSeeded,
    Mtc,
    System,
    SelfComp,
    StarRunning,
    StarAlive,
    StarAny,
    StarAll,
    TimerRead,
    TimerRunning,
    Create,
    Activate,
    Execute,
    Match,
    GetVerdict,
    Testcasename,
    Hostid,
    Encvalue,
    Decvalue,
    EncvalueUnichar,
    DecvalueUnichar,
    Ttcn2String,
    Log2Str,
    Any2Unistr,
    Apply,
    EncodeBase64,
    DecodeBase64,
    GetStringEncoding,
    RemoveBom,
    ProfilerRunning,
}

impl Op {
    /// Side-effectful operators are always unfoldable, no matter what their
    /// operands are.
    pub fn is_always_unfoldable(self) -> bool {
        matches!(
            self,
            Op::Rnd
                | Op::RndSeeded
                | Op::Mtc
                | Op::System
                | Op::SelfComp
                | Op::StarRunning
                | Op::StarAlive
                | Op::StarAny
                | Op::StarAll
                | Op::TimerRead
                | Op::TimerRunning
                | Op::Create
                | Op::Activate
                | Op::Execute
                | Op::Match
                | Op::GetVerdict
                | Op::Testcasename
                | Op::Hostid
                | Op::Encvalue
                | Op::Decvalue
                | Op::EncvalueUnichar
                | Op::DecvalueUnichar
                | Op::Ttcn2String
                | Op::Log2Str
                | Op::Any2Unistr
                | Op::Apply
                | Op::EncodeBase64
                | Op::DecodeBase64
                | Op::RemoveBom
                | Op::ProfilerRunning
        )
        // Note: `GetStringEncoding` is deliberately absent from this list —
        // see DESIGN.md for why it folds to a literal instead.
    }

    pub fn is_short_circuit(self) -> bool {
        matches!(self, Op::And | Op::Or)
    }
}

/// How many of each kind of operand an operator consumes. `Expr::new`
/// validates against this at construction; a mismatch is a fatal
/// `OperatorShape` violation (an internal invariant violation, not a
/// recoverable `Result`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperandShape {
    pub values: u8,
    pub ints: u8,
    pub bools: u8,
    pub strs: u8,
}

pub fn operator_shape(op: Op) -> OperandShape {
    use Op::*;
    let v = |values| OperandShape { values, ints: 0, bools: 0, strs: 0 };
    match op {
        UnaryPlus | UnaryMinus | Not4b | Not | Lengthof | Sizeof | IsValue | IsBound
        | IsPresent | IsTemplateKind | Bit2Int | Bit2Hex | Bit2Oct | Hex2Bit
        | Hex2Int | Hex2Oct | Oct2Bit | Oct2Hex | Oct2Int | Oct2Char | Char2Int | Char2Oct
        | Unichar2Int | Int2Char | Int2Unichar | Ttcn2String | Log2Str | Any2Unistr
        | EncodeBase64 | DecodeBase64 | GetStringEncoding | RemoveBom | Encvalue | Decvalue
        | RndSeeded => v(1),

        // Carries the candidate alternative name so the folder can compare
        // it against the choice's `alt_name` before sub-ref resolution
        // dereferences into the chosen alternative's value.
        IsChosen => OperandShape { values: 1, ints: 0, bools: 0, strs: 1 },

        Add | Sub | Mul | Div | Mod | Rem | And4b | Or4b | Xor4b | Eq | Ne | Lt | Gt | Le
        | Ge | And | Or | Xor | Concat | Match | Apply | EncvalueUnichar | DecvalueUnichar => v(2),

        RotateLeft | RotateRight | ShiftLeft | ShiftRight => OperandShape { values: 1, ints: 1, bools: 0, strs: 0 },

        Int2Bit | Int2Hex | Int2Oct => OperandShape { values: 1, ints: 1, bools: 0, strs: 0 },

        Substr => OperandShape { values: 1, ints: 2, bools: 0, strs: 0 },
        Replace => OperandShape { values: 2, ints: 2, bools: 0, strs: 0 },
        Regexp => OperandShape { values: 2, ints: 1, bools: 1, strs: 0 },

        Rnd | Mtc | System | SelfComp | StarRunning | StarAlive | StarAny | StarAll
        | TimerRead | TimerRunning | Create | Activate | Execute | GetVerdict | Testcasename
        | Hostid | ProfilerRunning => v(0),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprState {
    NotChecked,
    Checking,
    CheckingErr,
    Checked,
}

/// One expression node: an operator, its value operands, and any auxiliary
/// non-`Value` arguments the operator needs (a length, a group index, a
/// `nocase` flag).
pub struct Expr<G: Governor> {
    pub op: Op,
    pub operands: Vec<ValueRef<G>>,
    pub aux_ints: Vec<i64>,
    pub aux_bools: Vec<bool>,
    pub aux_strs: Vec<String>,
    pub state: ExprState,
}

impl<G: Governor> Clone for Expr<G> {
    fn clone(&self) -> Self {
        Expr {
            op: self.op,
            operands: self.operands.clone(),
            aux_ints: self.aux_ints.clone(),
            aux_bools: self.aux_bools.clone(),
            aux_strs: self.aux_strs.clone(),
            state: self.state,
        }
    }
}

impl<G: Governor> std::fmt::Debug for Expr<G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Expr").field("op", &self.op).field("state", &self.state).finish()
    }
}

impl<G: Governor> Expr<G> {
    /// Panics (an `OperatorShape` fatal error) if the operand counts don't
    /// match `operator_shape(op)` — this is an internal invariant a valid
    /// parser/constructor never violates.
    pub fn new(
        op: Op,
        operands: Vec<ValueRef<G>>,
        aux_ints: Vec<i64>,
        aux_bools: Vec<bool>,
        aux_strs: Vec<String>,
    ) -> Self {
        let shape = operator_shape(op);
        assert_eq!(
            operands.len(),
            shape.values as usize,
            "OperatorShape violation: {op:?} expects {} value operand(s), got {}",
            shape.values,
            operands.len()
        );
        assert_eq!(
            aux_ints.len(),
            shape.ints as usize,
            "OperatorShape violation: {op:?} expects {} int operand(s), got {}",
            shape.ints,
            aux_ints.len()
        );
        assert_eq!(
            aux_bools.len(),
            shape.bools as usize,
            "OperatorShape violation: {op:?} expects {} bool operand(s), got {}",
            shape.bools,
            aux_bools.len()
        );
        assert_eq!(
            aux_strs.len(),
            shape.strs as usize,
            "OperatorShape violation: {op:?} expects {} string operand(s), got {}",
            shape.strs,
            aux_strs.len()
        );
        Expr { op, operands, aux_ints, aux_bools, aux_strs, state: ExprState::NotChecked }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::testutil::DummyGovernor;
    use crate::value::Value;

    #[test]
    #[should_panic(expected = "OperatorShape violation")]
    fn mismatched_operand_count_panics() {
        let v: ValueRef<DummyGovernor> = Value::new_bool(true).into_ref();
        Expr::new(Op::Add, vec![v], vec![], vec![], vec![]);
    }

    #[test]
    fn shape_table_matches_binary_arithmetic() {
        assert_eq!(operator_shape(Op::Add), OperandShape { values: 2, ints: 0, bools: 0, strs: 0 });
        assert_eq!(operator_shape(Op::Substr), OperandShape { values: 1, ints: 2, bools: 0, strs: 0 });
    }

    #[test]
    fn ischosen_carries_a_string_operand() {
        assert_eq!(operator_shape(Op::IsChosen), OperandShape { values: 1, ints: 0, bools: 0, strs: 1 });
    }
}
