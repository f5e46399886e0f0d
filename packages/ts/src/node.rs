use crate::path::CanonicalPath;
use crate::{ModuleKind, ScriptKind};

/// A string-literal module specifier appearing in an import-like position:
/// an `import`/`export ... from` clause, a dynamic `import(...)` argument or
/// an `import type` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpecifier {
    pub text: String,
}

impl ModuleSpecifier {
    pub fn new(text: impl Into<String>) -> Self {
        ModuleSpecifier { text: text.into() }
    }
}

/// A triple-slash `/// <reference path="..." />` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference {
    pub file_name: String,
}

impl FileReference {
    pub fn new(file_name: impl Into<String>) -> Self {
        FileReference {
            file_name: file_name.into(),
        }
    }
}

/// The name of a module declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModuleName {
    /// `declare module "name"` — an ambient module or module augmentation.
    StringLiteral(String),
    /// `namespace Name` / `module Name`.
    Identifier(String),
    /// `declare global` — an augmentation of the global scope.
    Global,
}

/// A top-level statement, reduced to the shape the builder inspects. The
/// builder only needs to distinguish module declarations from everything
/// else to classify a file's effect on the global scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    ModuleDeclaration(ModuleName),
    Other,
}

impl Statement {
    /// `declare module "name" { ... }` with a string-literal name.
    pub fn is_module_with_string_literal_name(&self) -> bool {
        matches!(
            self,
            Statement::ModuleDeclaration(ModuleName::StringLiteral(_))
        )
    }
}

/// One source file of a program, reduced to the data the builder consumes.
///
/// Instances are produced by the host (or a mock) once per program; the
/// builder never mutates them. `version` is an opaque host-supplied string
/// that changes whenever the file's content changes; it is required for
/// incremental building.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// The on-disk name the file was loaded under.
    pub file_name: String,
    /// The canonicalized identity of the file, after redirection.
    pub resolved_path: CanonicalPath,
    pub version: Option<String>,
    pub script_kind: ScriptKind,
    pub is_declaration_file: bool,
    /// The module format inferred for this file from its extension and the
    /// nearest `package.json`, if any.
    pub implied_node_format: Option<ModuleKind>,
    /// Set when the file has at least one top-level `import` or `export`.
    pub external_module_indicator: bool,
    /// Set when the file uses CommonJS `require`/`module.exports` patterns.
    pub commonjs_module_indicator: bool,
    pub imports: Vec<ModuleSpecifier>,
    pub referenced_files: Vec<FileReference>,
    pub module_augmentations: Vec<ModuleName>,
    pub statements: Vec<Statement>,
}

impl SourceFile {
    pub fn is_external_or_commonjs_module(&self) -> bool {
        self.external_module_indicator || self.commonjs_module_indicator
    }

    pub fn is_json_source_file(&self) -> bool {
        self.script_kind == ScriptKind::JSON
    }

    /// Every top-level statement is an ambient module declaration with a
    /// string-literal name. Vacuously true for an empty file.
    pub fn contains_only_ambient_modules(&self) -> bool {
        self.statements
            .iter()
            .all(Statement::is_module_with_string_literal_name)
    }

    /// The file contains a `declare global { ... }` augmentation.
    pub fn contains_global_scope_augmentation(&self) -> bool {
        self.module_augmentations
            .iter()
            .any(|augmentation| matches!(augmentation, ModuleName::Global))
    }
}
