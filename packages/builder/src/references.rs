// Dependency extraction
//
// Derives, for one file, the set of other files it depends on, consulting
// the program and its checker. Four sources merge into one set: import
// resolutions, triple-slash file references, resolved type-reference
// directives, and ambient module declarations (both augmentations in this
// file and multi-site ambient modules anywhere in the program).

use indexmap::IndexSet;
use std::sync::Arc;
use ts::{
    is_rooted, resolve_path, CanonicalPath, ModuleName, Program, SourceFile, Symbol,
};

/// The set of files `source_file` references, or `None` when it references
/// nothing — callers skip inserting pointless empty entries into the
/// dependency relation.
pub fn get_referenced_files(
    program: &dyn Program,
    source_file: &SourceFile,
) -> Option<IndexSet<CanonicalPath>> {
    let mut referenced: IndexSet<CanonicalPath> = IndexSet::new();

    // Imports: one specifier can resolve to several declaring files when
    // the imported symbol has merged declarations.
    if !source_file.imports.is_empty() {
        let checker = program.get_type_checker();
        for import_name in &source_file.imports {
            if let Some(symbol) = checker.get_symbol_at_location(source_file, &import_name.text) {
                for declaration in &symbol.declarations {
                    referenced.insert(declaration.source_file.clone());
                }
            }
        }
    }

    let source_file_directory = source_file.resolved_path.directory().to_string();

    // Triple-slash references, resolved relative to this file's directory.
    for reference in &source_file.referenced_files {
        referenced.insert(referenced_file_from_file_name(
            &reference.file_name,
            &source_file_directory,
            program,
        ));
    }

    // Type-reference directives recorded against this file by the program.
    program.for_each_resolved_type_reference_directive(source_file, &mut |directive| {
        if let Some(file_name) = &directive.resolved_file_name {
            referenced.insert(referenced_file_from_file_name(
                file_name,
                &source_file_directory,
                program,
            ));
        }
    });

    // String-literal module augmentations declared in this file: editing
    // the augmentation can change the shape of every file the augmented
    // module is declared in.
    if !source_file.module_augmentations.is_empty() {
        let checker = program.get_type_checker();
        for augmentation in &source_file.module_augmentations {
            let ModuleName::StringLiteral(module_name) = augmentation else {
                continue;
            };
            let Some(symbol) = checker.get_symbol_at_location(source_file, module_name) else {
                continue;
            };
            add_reference_from_ambient_module(&mut referenced, &symbol, source_file);
        }
    }

    // Ambient modules declared in several places merge; editing any one
    // declaration site can change what every other site merges into.
    for ambient_module in program.get_type_checker().get_ambient_modules() {
        if ambient_module.declarations.len() > 1 {
            add_reference_from_ambient_module(&mut referenced, &ambient_module, source_file);
        }
    }

    if referenced.is_empty() {
        None
    } else {
        Some(referenced)
    }
}

fn add_reference_from_ambient_module(
    referenced: &mut IndexSet<CanonicalPath>,
    symbol: &Arc<Symbol>,
    source_file: &SourceFile,
) {
    for declaration in &symbol.declarations {
        if declaration.source_file != source_file.resolved_path {
            referenced.insert(declaration.source_file.clone());
        }
    }
}

/// Resolve a referenced file name to a path identity: apply the
/// project-reference redirect if one is configured, resolve non-rooted
/// names against the referencing file's directory, then canonicalize.
fn referenced_file_from_file_name(
    file_name: &str,
    source_file_directory: &str,
    program: &dyn Program,
) -> CanonicalPath {
    let redirect = program.get_project_reference_redirect(file_name);
    let file_name = redirect.as_deref().unwrap_or(file_name);
    if is_rooted(file_name) {
        program.get_canonical_file_name(file_name)
    } else {
        program.get_canonical_file_name(&resolve_path(source_file_directory, file_name))
    }
}
