use crate::node::SourceFile;
use crate::path::CanonicalPath;
use bitflags::bitflags;
use std::sync::Arc;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct SymbolFlags: u32 {
        const FUNCTION = 1 << 4;
        const CLASS = 1 << 5;
        const INTERFACE = 1 << 6;
        const VALUE_MODULE = 1 << 9;
        const NAMESPACE_MODULE = 1 << 10;
        const TYPE_ALIAS = 1 << 19;
        const ALIAS = 1 << 21;
    }
}

/// One declaration site of a symbol. Merged symbols (interfaces, ambient
/// modules) carry several, possibly across files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Resolved path of the source file containing the declaration.
    pub source_file: CanonicalPath,
}

impl Declaration {
    pub fn in_file(source_file: CanonicalPath) -> Self {
        Declaration { source_file }
    }
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub flags: SymbolFlags,
    pub declarations: Vec<Declaration>,
}

impl Symbol {
    pub fn new(
        name: impl Into<String>,
        flags: SymbolFlags,
        declarations: Vec<Declaration>,
    ) -> Self {
        Symbol {
            name: name.into(),
            flags,
            declarations,
        }
    }
}

/// The slice of the checker the builder consults: symbol lookup for module
/// names and the program-wide ambient module list.
pub trait TypeChecker {
    /// Resolve the symbol referenced by a string-literal module name
    /// appearing in `file` (an import specifier or a `declare module "..."`
    /// augmentation name). `None` when resolution failed; that is expected
    /// data, not an error.
    fn get_symbol_at_location(&self, file: &SourceFile, module_name: &str)
        -> Option<Arc<Symbol>>;

    /// Every ambient module declared anywhere in the program.
    fn get_ambient_modules(&self) -> Vec<Arc<Symbol>>;
}
