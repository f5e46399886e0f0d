use crate::host::BuildHost;
use indexmap::{IndexMap, IndexSet};
use std::cell::Cell;
use std::sync::Arc;
use ts::{
    CancellationToken, Cancelled, CanonicalPath, CompilerOptions, Declaration, Diagnostic,
    FileReference, ModuleKind, ModuleName, ModuleSpecifier, Program, ResolvedTypeReferenceDirective,
    ScriptKind, SourceFile, Statement, Symbol, SymbolFlags, TypeChecker, WriteFileCallback,
};

/// Fluent construction of [`SourceFile`] values for tests.
pub struct SourceFileBuilder {
    file_name: String,
    version: Option<String>,
    script_kind: ScriptKind,
    is_declaration_file: bool,
    implied_node_format: Option<ModuleKind>,
    external_module_indicator: bool,
    commonjs_module_indicator: bool,
    imports: Vec<ModuleSpecifier>,
    referenced_files: Vec<FileReference>,
    module_augmentations: Vec<ModuleName>,
    statements: Vec<Statement>,
}

impl SourceFileBuilder {
    pub fn new(file_name: &str) -> Self {
        SourceFileBuilder {
            file_name: file_name.to_string(),
            version: None,
            script_kind: ScriptKind::TS,
            is_declaration_file: false,
            implied_node_format: None,
            external_module_indicator: false,
            commonjs_module_indicator: false,
            imports: Vec::new(),
            referenced_files: Vec::new(),
            module_augmentations: Vec::new(),
            statements: Vec::new(),
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    pub fn script_kind(mut self, kind: ScriptKind) -> Self {
        self.script_kind = kind;
        self
    }

    pub fn declaration_file(mut self) -> Self {
        self.is_declaration_file = true;
        self
    }

    pub fn implied_format(mut self, format: ModuleKind) -> Self {
        self.implied_node_format = Some(format);
        self
    }

    pub fn external_module(mut self) -> Self {
        self.external_module_indicator = true;
        self
    }

    pub fn commonjs_module(mut self) -> Self {
        self.commonjs_module_indicator = true;
        self
    }

    /// An `import ... from "specifier"` clause. Marks the file as an
    /// external module, as an import declaration would.
    pub fn import(mut self, specifier: &str) -> Self {
        self.imports.push(ModuleSpecifier::new(specifier));
        self.external_module_indicator = true;
        self.statements.push(Statement::Other);
        self
    }

    /// A triple-slash `/// <reference path="..." />` directive.
    pub fn reference(mut self, file_name: &str) -> Self {
        self.referenced_files.push(FileReference::new(file_name));
        self
    }

    /// A `declare module "name" { ... }` augmentation in a module file.
    pub fn augments_module(mut self, name: &str) -> Self {
        self.module_augmentations
            .push(ModuleName::StringLiteral(name.to_string()));
        self.statements.push(Statement::ModuleDeclaration(
            ModuleName::StringLiteral(name.to_string()),
        ));
        self
    }

    /// A `declare global { ... }` augmentation.
    pub fn augments_global(mut self) -> Self {
        self.module_augmentations.push(ModuleName::Global);
        self.statements
            .push(Statement::ModuleDeclaration(ModuleName::Global));
        self
    }

    /// A `declare module "name" { ... }` ambient declaration.
    pub fn ambient_module(mut self, name: &str) -> Self {
        self.statements.push(Statement::ModuleDeclaration(
            ModuleName::StringLiteral(name.to_string()),
        ));
        self
    }

    /// Plain top-level code: what makes a non-module file affect the
    /// global scope.
    pub fn script_code(mut self) -> Self {
        self.statements.push(Statement::Other);
        self
    }

    pub fn build(self) -> Arc<SourceFile> {
        Arc::new(SourceFile {
            resolved_path: CanonicalPath::new(self.file_name.clone()),
            file_name: self.file_name,
            version: self.version,
            script_kind: self.script_kind,
            is_declaration_file: self.is_declaration_file,
            implied_node_format: self.implied_node_format,
            external_module_indicator: self.external_module_indicator,
            commonjs_module_indicator: self.commonjs_module_indicator,
            imports: self.imports,
            referenced_files: self.referenced_files,
            module_augmentations: self.module_augmentations,
            statements: self.statements,
        })
    }
}

/// Checker mock: import and augmentation names resolve through an explicit
/// per-file table, ambient modules through a program-wide list.
#[derive(Default)]
pub struct MockTypeChecker {
    import_resolutions: IndexMap<(CanonicalPath, String), Arc<Symbol>>,
    ambient_modules: Vec<Arc<Symbol>>,
}

impl TypeChecker for MockTypeChecker {
    fn get_symbol_at_location(
        &self,
        file: &SourceFile,
        module_name: &str,
    ) -> Option<Arc<Symbol>> {
        self.import_resolutions
            .get(&(file.resolved_path.clone(), module_name.to_string()))
            .cloned()
    }

    fn get_ambient_modules(&self) -> Vec<Arc<Symbol>> {
        self.ambient_modules.clone()
    }
}

/// In-memory program over hand-built source files. Declaration-emit text is
/// configured per file; files without any configured text emit nothing,
/// which drives the engine onto its version-fallback path.
pub struct MockProgram {
    options: CompilerOptions,
    files: Vec<Arc<SourceFile>>,
    files_by_path: IndexMap<CanonicalPath, Arc<SourceFile>>,
    checker: MockTypeChecker,
    default_libraries: IndexSet<CanonicalPath>,
    project_reference_redirects: IndexMap<String, String>,
    type_reference_directives: IndexMap<CanonicalPath, Vec<ResolvedTypeReferenceDirective>>,
    declaration_texts: IndexMap<CanonicalPath, String>,
    declaration_diagnostics: IndexMap<CanonicalPath, Vec<Diagnostic>>,
    emit_calls: Cell<usize>,
}

impl MockProgram {
    pub fn new(options: CompilerOptions) -> Self {
        MockProgram {
            options,
            files: Vec::new(),
            files_by_path: IndexMap::new(),
            checker: MockTypeChecker::default(),
            default_libraries: IndexSet::new(),
            project_reference_redirects: IndexMap::new(),
            type_reference_directives: IndexMap::new(),
            declaration_texts: IndexMap::new(),
            declaration_diagnostics: IndexMap::new(),
            emit_calls: Cell::new(0),
        }
    }

    pub fn add_file(&mut self, file: Arc<SourceFile>) -> &mut Self {
        self.files_by_path
            .insert(file.resolved_path.clone(), Arc::clone(&file));
        self.files.push(file);
        self
    }

    pub fn add_default_library(&mut self, file: Arc<SourceFile>) -> &mut Self {
        self.default_libraries.insert(file.resolved_path.clone());
        self.add_file(file)
    }

    /// Resolve `specifier`, when imported from `from`, to a symbol declared
    /// in each of `declaring` (several files model merged declarations).
    pub fn resolve_import(
        &mut self,
        from: &Arc<SourceFile>,
        specifier: &str,
        declaring: &[&Arc<SourceFile>],
    ) -> &mut Self {
        let symbol = Arc::new(Symbol::new(
            specifier,
            SymbolFlags::VALUE_MODULE,
            declaring
                .iter()
                .map(|file| Declaration::in_file(file.resolved_path.clone()))
                .collect(),
        ));
        self.checker
            .import_resolutions
            .insert((from.resolved_path.clone(), specifier.to_string()), symbol);
        self
    }

    /// Register a program-wide ambient module with one declaration site per
    /// entry of `declaring`.
    pub fn add_ambient_module(&mut self, name: &str, declaring: &[&Arc<SourceFile>]) -> &mut Self {
        self.checker.ambient_modules.push(Arc::new(Symbol::new(
            name,
            SymbolFlags::VALUE_MODULE,
            declaring
                .iter()
                .map(|file| Declaration::in_file(file.resolved_path.clone()))
                .collect(),
        )));
        self
    }

    pub fn add_type_reference_directive(
        &mut self,
        file: &Arc<SourceFile>,
        resolved_file_name: Option<&str>,
    ) -> &mut Self {
        self.type_reference_directives
            .entry(file.resolved_path.clone())
            .or_default()
            .push(ResolvedTypeReferenceDirective {
                resolved_file_name: resolved_file_name.map(str::to_string),
            });
        self
    }

    pub fn add_project_reference_redirect(&mut self, from: &str, to: &str) -> &mut Self {
        self.project_reference_redirects
            .insert(from.to_string(), to.to_string());
        self
    }

    pub fn set_declaration_text(&mut self, file: &Arc<SourceFile>, text: &str) -> &mut Self {
        self.declaration_texts
            .insert(file.resolved_path.clone(), text.to_string());
        self
    }

    pub fn set_declaration_diagnostics(
        &mut self,
        file: &Arc<SourceFile>,
        diagnostics: Vec<Diagnostic>,
    ) -> &mut Self {
        self.declaration_diagnostics
            .insert(file.resolved_path.clone(), diagnostics);
        self
    }

    /// How many times declaration emit ran.
    pub fn emit_call_count(&self) -> usize {
        self.emit_calls.get()
    }
}

impl Program for MockProgram {
    fn get_source_files(&self) -> &[Arc<SourceFile>] {
        &self.files
    }

    fn get_source_file_by_path(&self, path: &CanonicalPath) -> Option<Arc<SourceFile>> {
        self.files_by_path.get(path).cloned()
    }

    fn get_compiler_options(&self) -> &CompilerOptions {
        &self.options
    }

    fn get_type_checker(&self) -> &dyn TypeChecker {
        &self.checker
    }

    fn get_canonical_file_name(&self, file_name: &str) -> CanonicalPath {
        CanonicalPath::new(file_name)
    }

    fn get_project_reference_redirect(&self, file_name: &str) -> Option<String> {
        self.project_reference_redirects.get(file_name).cloned()
    }

    fn for_each_resolved_type_reference_directive(
        &self,
        file: &SourceFile,
        callback: &mut dyn FnMut(&ResolvedTypeReferenceDirective),
    ) {
        if let Some(directives) = self.type_reference_directives.get(&file.resolved_path) {
            for directive in directives {
                callback(directive);
            }
        }
    }

    fn is_source_file_default_library(&self, file: &SourceFile) -> bool {
        self.default_libraries.contains(&file.resolved_path)
    }

    fn emit(
        &self,
        file: &SourceFile,
        write_file: &mut WriteFileCallback,
        cancellation_token: Option<&dyn CancellationToken>,
        _emit_only_declarations: bool,
        _force_declaration_emit: bool,
    ) -> Result<(), Cancelled> {
        if let Some(token) = cancellation_token {
            if token.is_cancellation_requested() {
                return Err(Cancelled);
            }
        }
        self.emit_calls.set(self.emit_calls.get() + 1);
        if let Some(text) = self.declaration_texts.get(&file.resolved_path) {
            let diagnostics = self
                .declaration_diagnostics
                .get(&file.resolved_path)
                .cloned()
                .unwrap_or_default();
            write_file(&declaration_output_name(&file.file_name), text, &diagnostics);
        }
        Ok(())
    }
}

fn declaration_output_name(file_name: &str) -> String {
    match file_name.strip_suffix(".ts") {
        Some(stem) => format!("{stem}.d.ts"),
        None => format!("{file_name}.d.ts"),
    }
}

/// Host mock with switchable telemetry recording.
#[derive(Debug, Default)]
pub struct MockHost {
    pub store_signature_info: bool,
}

impl BuildHost for MockHost {
    fn store_signature_info(&self) -> bool {
        self.store_signature_info
    }
}

/// Token that can be flipped to cancelled from the test body.
#[derive(Debug, Default)]
pub struct TestCancellationToken {
    cancelled: Cell<bool>,
}

impl TestCancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.set(true);
    }
}

impl CancellationToken for TestCancellationToken {
    fn is_cancellation_requested(&self) -> bool {
        self.cancelled.get()
    }
}
