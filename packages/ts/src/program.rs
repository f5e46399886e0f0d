use crate::node::SourceFile;
use crate::path::CanonicalPath;
use crate::type_checker::TypeChecker;
use crate::{Diagnostic, ModuleKind, ScriptTarget};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompilerOptions {
    pub composite: Option<bool>,
    pub declaration: Option<bool>,
    pub declaration_dir: Option<String>,
    pub emit_declaration_only: Option<bool>,
    pub incremental: Option<bool>,
    pub isolated_modules: Option<bool>,
    pub module: Option<ModuleKind>,
    pub out: Option<String>,
    pub out_dir: Option<String>,
    pub out_file: Option<String>,
    pub skip_lib_check: Option<bool>,
    pub strict: Option<bool>,
    pub target: Option<ScriptTarget>,
}

impl CompilerOptions {
    /// The single combined output artifact, when one is configured.
    /// `outFile` wins over the legacy `out`.
    pub fn out_file(&self) -> Option<&str> {
        self.out_file.as_deref().or(self.out.as_deref())
    }

    pub fn module_kind(&self) -> ModuleKind {
        self.module.unwrap_or(ModuleKind::None)
    }
}

/// A resolved `/// <reference types="..." />` directive recorded against a
/// file by the program. Unresolved directives carry no file name.
#[derive(Debug, Clone)]
pub struct ResolvedTypeReferenceDirective {
    pub resolved_file_name: Option<String>,
}

/// Cooperative cancellation, observed only by the emit collaborator. The
/// builder itself never polls the token; it propagates `Cancelled` outward.
pub trait CancellationToken {
    fn is_cancellation_requested(&self) -> bool;
}

/// Raised out of `Program::emit` when a cancellation token fires. The
/// builder's bookkeeping is not rolled back; callers discard the build
/// state attempt wholesale.
#[derive(Debug, Error)]
#[error("operation was cancelled")]
pub struct Cancelled;

/// Receives one emitted output: (file name, text, declaration diagnostics).
pub type WriteFileCallback<'a> = dyn FnMut(&str, &str, &[Diagnostic]) + 'a;

/// The program snapshot a build state is bound to. One program, one state;
/// recompilation produces a new program and a new state.
pub trait Program {
    fn get_source_files(&self) -> &[Arc<SourceFile>];

    fn get_source_file_by_path(&self, path: &CanonicalPath) -> Option<Arc<SourceFile>>;

    fn get_compiler_options(&self) -> &CompilerOptions;

    fn get_type_checker(&self) -> &dyn TypeChecker;

    /// Canonicalize a file name into the engine's path identity.
    fn get_canonical_file_name(&self, file_name: &str) -> CanonicalPath;

    /// The project-reference redirection of a file name, if one applies.
    fn get_project_reference_redirect(&self, file_name: &str) -> Option<String>;

    fn for_each_resolved_type_reference_directive(
        &self,
        file: &SourceFile,
        callback: &mut dyn FnMut(&ResolvedTypeReferenceDirective),
    );

    fn is_source_file_default_library(&self, file: &SourceFile) -> bool;

    /// Emit one file through `write_file`. With `emit_only_declarations` the
    /// callback observes declaration outputs only; `force_declaration_emit`
    /// bypasses `noEmit`-style suppression so a signature can always be
    /// derived. Checks the cancellation token, if any, before doing work.
    fn emit(
        &self,
        file: &SourceFile,
        write_file: &mut WriteFileCallback,
        cancellation_token: Option<&dyn CancellationToken>,
        emit_only_declarations: bool,
        force_declaration_emit: bool,
    ) -> Result<(), Cancelled>;
}
