use crate::parser::class::SubroutineKind;
use crate::symbols::SymbolTable;
use crate::vm::VmWriter;
use crate::CompileError;
use std::io::Write;

/// Generation that may mutate the compile context: class and subroutine
/// declarations populate the symbol table, statements draw labels.
pub trait Context {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &mut CompileContext,
    ) -> Result<(), CompileError>;
}

/// Generation that only reads the context; expressions never declare
/// anything and never need labels.
pub(crate) trait Codegen {
    fn generate(
        &self,
        vm: &mut VmWriter<impl Write>,
        ctx: &CompileContext,
    ) -> Result<(), CompileError>;
}

/// Per-translation-unit state. A fresh context per class keeps label
/// numbering and scopes independent across units.
pub struct CompileContext {
    pub(crate) symbols: SymbolTable,
    pub(crate) class_name: String,
    pub(crate) subroutine: SubroutineKind,
    flow_index: usize,
}

impl CompileContext {
    pub fn new() -> Self {
        CompileContext {
            symbols: SymbolTable::new(),
            class_name: String::new(),
            subroutine: SubroutineKind::Function,
            flow_index: 0,
        }
    }

    /// Monotone per-unit counter; nested and sequential control flow can
    /// never collide.
    pub(crate) fn next_flow_index(&mut self) -> usize {
        let i = self.flow_index;
        self.flow_index += 1;
        i
    }
}

impl Default for CompileContext {
    fn default() -> Self {
        CompileContext::new()
    }
}
