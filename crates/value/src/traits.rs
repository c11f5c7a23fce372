//! External collaborator contracts ("Type", "Reference", "Scope" black
//! boxes), narrowed to exactly the operations the Folder & Checker invoke.
//! A compiler driver implements these against its own concrete type
//! system, symbol table and scope chain; this crate never depends on a
//! concrete implementation.

/// A governor Type, opaque to this crate beyond what folding needs.
pub trait Governor: Clone + PartialEq {
    fn is_compatible(&self, other: &Self) -> bool;
    fn field_type(&self, field: &str) -> Option<Self>;
    fn ordinal_of(&self, enum_id: &str) -> Option<i64>;
    fn component_count(&self) -> Option<usize>;
}

/// What a resolved full-name turns out to be (`get_refd_assignment`'s
/// result, classified).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentClass {
    Constant,
    Variable,
    Parameter,
    Function,
    Altstep,
    Testcase,
    Unresolved,
}

/// Resolves a reference (identifier + sub-references) to an
/// [`AssignmentClass`] and, for constants, to the value that backs it.
pub trait RefResolver<V, G: Governor> {
    fn classify(&self, full_name: &str) -> AssignmentClass;
    fn constant_value(&self, full_name: &str) -> Option<V>;
    fn governor_of(&self, full_name: &str) -> Option<G>;
}

/// The enclosing-scope queries the Folder needs: whether an identifier is
/// bound in scope, and the MTC/system component type for `mtc`/`system`
/// (always unfoldable here, but the checker still needs to type them).
pub trait ScopeLookup<G: Governor> {
    fn module_of(&self, full_name: &str) -> Option<&str>;
    fn has_assignment(&self, full_name: &str) -> bool;
    fn mtc_system_component_type(&self) -> Option<G>;
}

/// Source location, passed explicitly rather than threaded through a
/// global — needed by macros (`%fileName`, `%lineNumber`, …) and by every
/// diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub module_id: String,
    pub definition_id: String,
}

impl Location {
    pub fn new(file: impl Into<String>, line: u32, module_id: impl Into<String>, definition_id: impl Into<String>) -> Self {
        Location { file: file.into(), line, module_id: module_id.into(), definition_id: definition_id.into() }
    }
}
