use crate::parser::Type;
use crate::vm::Segment;
use crate::CompileError;
use std::collections::HashMap;

/// Storage classification of a declared name. Static and Field live in
/// class scope, Argument and Local in subroutine scope.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum VarKind {
    Static,
    Field,
    Argument,
    Local,
}

impl VarKind {
    pub fn segment(self) -> Segment {
        match self {
            VarKind::Static => Segment::Static,
            VarKind::Field => Segment::This,
            VarKind::Argument => Segment::Argument,
            VarKind::Local => Segment::Local,
        }
    }

    fn class_scoped(self) -> bool {
        matches!(self, VarKind::Static | VarKind::Field)
    }

    fn slot(self) -> usize {
        match self {
            VarKind::Static => 0,
            VarKind::Field => 1,
            VarKind::Argument => 2,
            VarKind::Local => 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SymbolEntry {
    pub var_type: Type,
    pub kind: VarKind,
    pub index: u16,
}

/// Two live scopes: class scope persists for the whole translation unit,
/// subroutine scope is wiped by `start_subroutine`. Indices run per kind
/// from 0 and are never reassigned.
#[derive(Debug, Default)]
pub struct SymbolTable {
    class_scope: HashMap<String, SymbolEntry>,
    subroutine_scope: HashMap<String, SymbolEntry>,
    counts: [u16; 4],
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn define(
        &mut self,
        name: &str,
        var_type: Type,
        kind: VarKind,
    ) -> Result<u16, CompileError> {
        let scope = if kind.class_scoped() {
            &mut self.class_scope
        } else {
            &mut self.subroutine_scope
        };
        if scope.contains_key(name) {
            return Err(CompileError::DuplicateDefinition {
                name: name.to_owned(),
            });
        }
        let index = self.counts[kind.slot()];
        scope.insert(
            name.to_owned(),
            SymbolEntry {
                var_type,
                kind,
                index,
            },
        );
        self.counts[kind.slot()] += 1;
        Ok(index)
    }

    /// Opens a fresh subroutine scope. Class scope and its counters are
    /// untouched.
    pub fn start_subroutine(&mut self) {
        self.subroutine_scope.clear();
        self.counts[VarKind::Argument.slot()] = 0;
        self.counts[VarKind::Local.slot()] = 0;
    }

    /// Subroutine scope shadows class scope.
    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.subroutine_scope
            .get(name)
            .or_else(|| self.class_scope.get(name))
    }

    pub fn resolve(&self, name: &str) -> Result<&SymbolEntry, CompileError> {
        self.get(name).ok_or_else(|| CompileError::UnresolvedIdentifier {
            name: name.to_owned(),
        })
    }

    pub fn kind_of(&self, name: &str) -> Result<VarKind, CompileError> {
        self.resolve(name).map(|entry| entry.kind)
    }

    pub fn type_of(&self, name: &str) -> Result<&Type, CompileError> {
        self.resolve(name).map(|entry| &entry.var_type)
    }

    pub fn index_of(&self, name: &str) -> Result<u16, CompileError> {
        self.resolve(name).map(|entry| entry.index)
    }

    pub fn var_count(&self, kind: VarKind) -> u16 {
        self.counts[kind.slot()]
    }
}

#[test]
fn test_indices_follow_definition_order_per_kind() {
    let mut table = SymbolTable::new();
    table.define("a", Type::Int, VarKind::Static).unwrap();
    table.define("b", Type::Int, VarKind::Field).unwrap();
    table.define("c", Type::Int, VarKind::Field).unwrap();
    table.define("d", Type::Boolean, VarKind::Static).unwrap();

    assert_eq!(table.index_of("a").unwrap(), 0);
    assert_eq!(table.index_of("b").unwrap(), 0);
    assert_eq!(table.index_of("c").unwrap(), 1);
    assert_eq!(table.index_of("d").unwrap(), 1);
    assert_eq!(table.var_count(VarKind::Field), 2);
}

#[test]
fn test_start_subroutine_resets_only_subroutine_counters() {
    let mut table = SymbolTable::new();
    table.define("f", Type::Int, VarKind::Field).unwrap();
    table.define("arg", Type::Int, VarKind::Argument).unwrap();
    table.define("loc", Type::Int, VarKind::Local).unwrap();

    table.start_subroutine();

    assert_eq!(table.var_count(VarKind::Argument), 0);
    assert_eq!(table.var_count(VarKind::Local), 0);
    assert_eq!(table.var_count(VarKind::Field), 1);
    assert!(table.get("arg").is_none());
    assert!(table.get("f").is_some());

    // indices restart from 0 in the new scope
    assert_eq!(table.define("x", Type::Int, VarKind::Local).unwrap(), 0);
}

#[test]
fn test_duplicate_definition_in_one_scope_fails() {
    let mut table = SymbolTable::new();
    table.define("x", Type::Int, VarKind::Local).unwrap();
    let err = table.define("x", Type::Char, VarKind::Local).unwrap_err();
    assert!(matches!(err, CompileError::DuplicateDefinition { .. }));
}

#[test]
fn test_subroutine_scope_shadows_class_scope() {
    let mut table = SymbolTable::new();
    table.define("x", Type::Int, VarKind::Field).unwrap();
    table
        .define("x", Type::Boolean, VarKind::Local)
        .expect("same name in the other scope is legal");

    assert_eq!(table.kind_of("x").unwrap(), VarKind::Local);
    assert_eq!(table.type_of("x").unwrap(), &Type::Boolean);
}

#[test]
fn test_unresolved_name_is_an_error() {
    let table = SymbolTable::new();
    let err = table.resolve("ghost").unwrap_err();
    match err {
        CompileError::UnresolvedIdentifier { name } => assert_eq!(name, "ghost"),
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_kind_to_segment_mapping() {
    assert_eq!(VarKind::Static.segment(), Segment::Static);
    assert_eq!(VarKind::Field.segment(), Segment::This);
    assert_eq!(VarKind::Argument.segment(), Segment::Argument);
    assert_eq!(VarKind::Local.segment(), Segment::Local);
}
