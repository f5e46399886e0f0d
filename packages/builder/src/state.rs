// Builder state
//
// The aggregate built once per compiled program: the file-info table, the
// dependency relation, and the signature/propagation machinery that answers
// "which files must be rebuilt because this one changed".

use crate::file_info::{FileInfo, SignatureInfo};
use crate::host::BuildHost;
use crate::path_map::ManyToManyPathMap;
use crate::references::get_referenced_files;
use crate::signature::compute_signature_with_diagnostics;
use indexmap::{IndexMap, IndexSet};
use once_cell::unsync::OnceCell;
use std::sync::Arc;
use tracing::debug;
use ts::{
    CancellationToken, Cancelled, CanonicalPath, CompilerOptions, ModuleKind, Program, SourceFile,
};

/// How a shape change in one file spreads to the rest of the program, fixed
/// by the compiler options. The dependency relation exists only under
/// `Module`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    /// `module` is `None`: plain scripts whose globals are visible to every
    /// other file, so there is no per-file relation to walk.
    NonModule,
    /// A single combined output artifact (`outFile`/`out`): per-file
    /// propagation is moot since the next emit covers everything at once.
    SingleOutput,
    /// Per-file module emit, driven by the reverse dependency graph.
    Module { isolated_modules: bool },
}

impl EmitMode {
    pub fn from_options(options: &CompilerOptions) -> EmitMode {
        if options.out_file().is_some() {
            EmitMode::SingleOutput
        } else if options.module_kind() == ModuleKind::None {
            EmitMode::NonModule
        } else {
            EmitMode::Module {
                isolated_modules: options.isolated_modules.unwrap_or(false),
            }
        }
    }

    fn uses_reference_map(self) -> bool {
        matches!(self, EmitMode::Module { .. })
    }
}

/// A file affects the global scope when it augments `global` or when it is
/// not a module at all: no import/export, not JSON, not solely ambient
/// module declarations. Such a file is treated as if every other file
/// depends on it.
pub fn is_file_affecting_global_scope(source_file: &SourceFile) -> bool {
    source_file.contains_global_scope_augmentation()
        || (!source_file.is_external_or_commonjs_module()
            && !source_file.contains_only_ambient_modules()
            && !source_file.is_json_source_file())
}

/// Incremental build state bound to one program snapshot.
///
/// Created fresh by [`BuilderState::create`] for every compiled program and
/// replaced wholesale on recompilation. A new state may adopt a previous
/// state's committed (and uncommitted) signatures when the emit strategy
/// did not change; dependency sets are always recomputed.
pub struct BuilderState {
    file_infos: IndexMap<CanonicalPath, FileInfo>,
    /// Present only in `Module` emit mode.
    referenced_map: Option<ManyToManyPathMap>,
    /// Forces the cheap version-based signature path: set on a fresh,
    /// non-reused state (no baseline to compare declaration text against)
    /// and when the caller disables declaration comparison.
    use_file_version_as_signature: bool,
    /// Rollback buffer: the previous signature of each file this state has
    /// recomputed, with inner `None` standing for "previously unset".
    /// Entry presence is itself meaningful; cleared after each successful
    /// affected-files query.
    old_signatures: Option<IndexMap<CanonicalPath, Option<String>>>,
    /// Files this state has already decided on. Makes re-checks idempotent
    /// and bounds the reverse traversal on cyclic graphs.
    has_called_update_shape_signature: IndexSet<CanonicalPath>,
    signature_info: Option<IndexMap<CanonicalPath, SignatureInfo>>,
    all_file_names: OnceCell<Vec<String>>,
    all_files_excluding_default_library_file: OnceCell<Vec<Arc<SourceFile>>>,
}

impl BuilderState {
    pub fn create(
        program: &dyn Program,
        old_state: Option<&BuilderState>,
        disable_use_file_version_as_signature: bool,
    ) -> BuilderState {
        let options = program.get_compiler_options();
        let emit_mode = EmitMode::from_options(options);
        let mut referenced_map = emit_mode.uses_reference_map().then(ManyToManyPathMap::new);
        let use_old_state = Self::can_reuse_old_state(referenced_map.is_some(), old_state);

        let mut file_infos = IndexMap::new();
        for source_file in program.get_source_files() {
            let version = source_file
                .version
                .clone()
                .expect("source files of an incremental program must have versions set");

            let old_uncommitted_signature = if use_old_state {
                old_state.and_then(|old| {
                    old.old_signatures
                        .as_ref()
                        .and_then(|buffer| buffer.get(&source_file.resolved_path))
                        .cloned()
                })
            } else {
                None
            };
            let signature = match old_uncommitted_signature {
                // Never examined by the old state: adopt its committed
                // signature when reusing.
                None => {
                    if use_old_state {
                        old_state
                            .and_then(|old| old.file_infos.get(&source_file.resolved_path))
                            .and_then(|info| info.signature.clone())
                    } else {
                        None
                    }
                }
                // Examined: trust the provisional value, the unset
                // sentinel included.
                Some(uncommitted) => uncommitted,
            };

            if let Some(map) = referenced_map.as_mut() {
                // Dependency sets are never carried over: import
                // resolution can change even when the file's own version
                // did not.
                if let Some(new_references) = get_referenced_files(program, source_file) {
                    map.set(source_file.resolved_path.clone(), new_references);
                }
            }

            file_infos.insert(
                source_file.resolved_path.clone(),
                FileInfo {
                    version,
                    signature,
                    affects_global_scope: if matches!(emit_mode, EmitMode::SingleOutput) {
                        None
                    } else {
                        is_file_affecting_global_scope(source_file).then_some(true)
                    },
                    implied_format: source_file.implied_node_format,
                },
            );
        }

        BuilderState {
            file_infos,
            referenced_map,
            use_file_version_as_signature: !disable_use_file_version_as_signature && !use_old_state,
            old_signatures: None,
            has_called_update_shape_signature: IndexSet::new(),
            signature_info: None,
            all_file_names: OnceCell::new(),
            all_files_excluding_default_library_file: OnceCell::new(),
        }
    }

    /// A previous state is adoptable only when its dependency-relation
    /// presence matches the new configuration's: an emit-strategy or
    /// module-mode change invalidates everything it tracked.
    pub fn can_reuse_old_state(
        referenced_map_present: bool,
        old_state: Option<&BuilderState>,
    ) -> bool {
        old_state.is_some_and(|old| old.referenced_map.is_some() == referenced_map_present)
    }

    /// Decide whether `source_file`'s externally observable shape changed
    /// since the last build.
    ///
    /// At most one real computation happens per file per state lifetime;
    /// later calls short-circuit to "unchanged" without touching the
    /// emitter, which is what terminates affected-file propagation on
    /// cyclic graphs.
    pub fn update_shape_signature(
        &mut self,
        program: &dyn Program,
        source_file: &Arc<SourceFile>,
        cancellation_token: Option<&dyn CancellationToken>,
        host: &dyn BuildHost,
    ) -> Result<bool, Cancelled> {
        let path = &source_file.resolved_path;
        if self.has_called_update_shape_signature.contains(path) {
            return Ok(false);
        }

        let info = self
            .file_infos
            .get(path)
            .expect("file is not part of the program this state was built from");
        let prev_signature = info.signature.clone();
        let version = info.version.clone();

        let mut latest_signature = None;
        if !source_file.is_declaration_file && !self.use_file_version_as_signature {
            latest_signature =
                compute_dts_signature(program, source_file, cancellation_token, host)?;
            if latest_signature.is_some() && host.store_signature_info() {
                self.signature_info
                    .get_or_insert_with(IndexMap::new)
                    .insert(path.clone(), SignatureInfo::ComputedDts);
            }
        }
        let latest_signature = match latest_signature {
            Some(signature) => signature,
            // Conservative fallback: any content edit counts as a shape
            // change even if declarations are unaffected.
            None => {
                if host.store_signature_info() {
                    self.signature_info
                        .get_or_insert_with(IndexMap::new)
                        .insert(path.clone(), SignatureInfo::UsedVersion);
                }
                version
            }
        };

        self.old_signatures
            .get_or_insert_with(IndexMap::new)
            .insert(path.clone(), prev_signature.clone());
        self.has_called_update_shape_signature.insert(path.clone());

        let changed = prev_signature.as_deref() != Some(latest_signature.as_str());
        debug!(file = %source_file.file_name, changed, "updated shape signature");
        self.file_infos
            .get_mut(path)
            .expect("file is not part of the program this state was built from")
            .signature = Some(latest_signature);
        Ok(changed)
    }

    /// Every file whose previously-emitted output may be stale given that
    /// `path` changed shape. The rollback buffer is cleared on success; on
    /// cancellation the state's bookkeeping is left as-is and the whole
    /// state must be discarded.
    pub fn get_files_affected_by(
        &mut self,
        program: &dyn Program,
        path: &CanonicalPath,
        cancellation_token: Option<&dyn CancellationToken>,
        host: &dyn BuildHost,
    ) -> Result<Vec<Arc<SourceFile>>, Cancelled> {
        let result =
            self.get_files_affected_by_with_old_state(program, path, cancellation_token, host)?;
        if let Some(old_signatures) = self.old_signatures.as_mut() {
            old_signatures.clear();
        }
        debug!(file = %path, affected = result.len(), "computed affected files");
        Ok(result)
    }

    /// As [`BuilderState::get_files_affected_by`], but keeps the rollback
    /// buffer so the next snapshot can still adopt provisional signatures.
    pub fn get_files_affected_by_with_old_state(
        &mut self,
        program: &dyn Program,
        path: &CanonicalPath,
        cancellation_token: Option<&dyn CancellationToken>,
        host: &dyn BuildHost,
    ) -> Result<Vec<Arc<SourceFile>>, Cancelled> {
        let Some(source_file) = program.get_source_file_by_path(path) else {
            return Ok(Vec::new());
        };

        if !self.update_shape_signature(program, &source_file, cancellation_token, host)? {
            return Ok(vec![source_file]);
        }

        match EmitMode::from_options(program.get_compiler_options()) {
            EmitMode::SingleOutput => Ok(vec![source_file]),
            EmitMode::NonModule => Ok(self
                .get_all_files_excluding_default_library_file(program, Some(&source_file))
                .to_vec()),
            EmitMode::Module { isolated_modules } => self
                .files_affected_by_updated_shape_when_module_emit(
                    program,
                    source_file,
                    isolated_modules,
                    cancellation_token,
                    host,
                ),
        }
    }

    fn files_affected_by_updated_shape_when_module_emit(
        &mut self,
        program: &dyn Program,
        source_file: Arc<SourceFile>,
        isolated_modules: bool,
        cancellation_token: Option<&dyn CancellationToken>,
        host: &dyn BuildHost,
    ) -> Result<Vec<Arc<SourceFile>>, Cancelled> {
        let path = source_file.resolved_path.clone();
        let affects_global_scope = self
            .file_infos
            .get(&path)
            .and_then(|info| info.affects_global_scope)
            .unwrap_or(false);
        if affects_global_scope {
            // Global-scope shape is load-bearing for every other file's
            // type checking, regardless of the relation's contents.
            return Ok(self
                .get_all_files_excluding_default_library_file(program, Some(&source_file))
                .to_vec());
        }
        if isolated_modules {
            return Ok(vec![source_file]);
        }

        // Reverse walk, LIFO pop, first-seen-first-returned. A change
        // propagates no further than the point where a dependent's own
        // shape is unaffected.
        let mut seen: IndexMap<CanonicalPath, Option<Arc<SourceFile>>> = IndexMap::new();
        seen.insert(path.clone(), Some(source_file));
        let mut queue = self.get_referenced_by_paths(&path);
        while let Some(current_path) = queue.pop() {
            if seen.contains_key(&current_path) {
                continue;
            }
            let current_source_file = program.get_source_file_by_path(&current_path);
            seen.insert(current_path, current_source_file.clone());
            if let Some(current_source_file) = current_source_file {
                if self.update_shape_signature(
                    program,
                    &current_source_file,
                    cancellation_token,
                    host,
                )? {
                    queue.extend(self.get_referenced_by_paths(&current_source_file.resolved_path));
                }
            }
        }
        Ok(seen.into_values().flatten().collect())
    }

    /// Files that directly reference `path`, per the dependency relation.
    fn get_referenced_by_paths(&self, path: &CanonicalPath) -> Vec<CanonicalPath> {
        let referenced_map = self
            .referenced_map
            .as_ref()
            .expect("dependency relation exists under module emit");
        referenced_map
            .get_keys(path)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every file in the program except default libraries, the changed
    /// file (when given) first. Cached until [`BuilderState::release_cache`].
    pub fn get_all_files_excluding_default_library_file(
        &self,
        program: &dyn Program,
        first_source_file: Option<&Arc<SourceFile>>,
    ) -> &[Arc<SourceFile>] {
        self.all_files_excluding_default_library_file.get_or_init(|| {
            let mut result = Vec::new();
            if let Some(first) = first_source_file {
                if !program.is_source_file_default_library(first) {
                    result.push(Arc::clone(first));
                }
            }
            for source_file in program.get_source_files() {
                let is_first = first_source_file
                    .is_some_and(|first| first.resolved_path == source_file.resolved_path);
                if !is_first && !program.is_source_file_default_library(source_file) {
                    result.push(Arc::clone(source_file));
                }
            }
            result
        })
    }

    /// The transitive closure of files `source_file` depends on, as file
    /// names. Without a dependency relation, or under a single combined
    /// output, everything depends on everything.
    pub fn get_all_dependencies(
        &self,
        program: &dyn Program,
        source_file: &SourceFile,
    ) -> Vec<String> {
        if program.get_compiler_options().out_file().is_some() {
            return self.get_all_file_names(program).to_vec();
        }
        let Some(referenced_map) = &self.referenced_map else {
            return self.get_all_file_names(program).to_vec();
        };

        let mut seen: IndexSet<CanonicalPath> = IndexSet::new();
        let mut queue = vec![source_file.resolved_path.clone()];
        while let Some(path) = queue.pop() {
            if seen.insert(path.clone()) {
                if let Some(references) = referenced_map.get_values(&path) {
                    queue.extend(references.iter().cloned());
                }
            }
        }
        seen.iter()
            .map(|path| {
                program
                    .get_source_file_by_path(path)
                    .map(|file| file.file_name.clone())
                    .unwrap_or_else(|| path.to_string())
            })
            .collect()
    }

    fn get_all_file_names(&self, program: &dyn Program) -> &[String] {
        self.all_file_names.get_or_init(|| {
            program
                .get_source_files()
                .iter()
                .map(|file| file.file_name.clone())
                .collect()
        })
    }

    /// Drop the lazily-built projections so a disposed program's file list
    /// is not kept alive through this state.
    pub fn release_cache(&mut self) {
        self.all_file_names.take();
        self.all_files_excluding_default_library_file.take();
    }

    pub fn file_infos(&self) -> &IndexMap<CanonicalPath, FileInfo> {
        &self.file_infos
    }

    pub fn referenced_map(&self) -> Option<&ManyToManyPathMap> {
        self.referenced_map.as_ref()
    }

    pub fn uses_file_version_as_signature(&self) -> bool {
        self.use_file_version_as_signature
    }

    /// Per-file signature-strategy telemetry; populated only when the host
    /// opts in through `store_signature_info`.
    pub fn signature_info(&self) -> Option<&IndexMap<CanonicalPath, SignatureInfo>> {
        self.signature_info.as_ref()
    }
}

fn compute_dts_signature(
    program: &dyn Program,
    source_file: &SourceFile,
    cancellation_token: Option<&dyn CancellationToken>,
    host: &dyn BuildHost,
) -> Result<Option<String>, Cancelled> {
    let mut latest_signature = None;
    program.emit(
        source_file,
        &mut |file_name, text, diagnostics| {
            debug_assert!(
                file_name.ends_with(".d.ts")
                    || file_name.ends_with(".d.mts")
                    || file_name.ends_with(".d.cts"),
                "declaration-only emit produced a non-declaration output: {file_name}"
            );
            latest_signature = Some(compute_signature_with_diagnostics(text, diagnostics, host));
        },
        cancellation_token,
        /* emit_only_declarations */ true,
        /* force_declaration_emit */ true,
    )?;
    Ok(latest_signature)
}
