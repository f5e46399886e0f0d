/**
 * Builder State Tests
 *
 * End-to-end coverage of snapshot construction, shape-signature updates,
 * affected-file propagation across emit modes, state reuse and the cached
 * projections.
 */

#[cfg(test)]
mod tests {
    use builder::testing::{MockHost, MockProgram, SourceFileBuilder, TestCancellationToken};
    use builder::{BuilderState, DefaultBuildHost, SignatureInfo};
    use std::sync::Arc;
    use ts::{CompilerOptions, ModuleKind, SourceFile};

    const A_DTS: &str = "export declare function f(): number;\n";
    const B_DTS: &str = "export declare function g(): void;\n";

    fn module_options() -> CompilerOptions {
        CompilerOptions {
            module: Some(ModuleKind::CommonJS),
            declaration: Some(true),
            incremental: Some(true),
            ..Default::default()
        }
    }

    /// `b.ts` imports `a.ts`; declaration texts are configured so the
    /// engine can take the declaration-emit signature path.
    fn two_file_program(
        a_version: &str,
        a_dts: &str,
    ) -> (MockProgram, Arc<SourceFile>, Arc<SourceFile>) {
        let a = SourceFileBuilder::new("/src/a.ts")
            .version(a_version)
            .external_module()
            .implied_format(ModuleKind::CommonJS)
            .build();
        let b = SourceFileBuilder::new("/src/b.ts")
            .version("v1")
            .import("./a")
            .implied_format(ModuleKind::CommonJS)
            .build();
        let mut program = MockProgram::new(module_options());
        program.add_file(a.clone()).add_file(b.clone());
        program.resolve_import(&b, "./a", &[&a]);
        program.set_declaration_text(&a, a_dts);
        program.set_declaration_text(&b, B_DTS);
        (program, a, b)
    }

    fn names(files: &[Arc<SourceFile>]) -> Vec<&str> {
        files.iter().map(|file| file.file_name.as_str()).collect()
    }

    mod create_tests {
        use super::*;

        #[test]
        fn should_build_file_infos_and_dependency_relation() {
            let (program, a, b) = two_file_program("v1", A_DTS);
            let state = BuilderState::create(&program, None, false);

            assert!(state.uses_file_version_as_signature());
            let infos = state.file_infos();
            assert_eq!(infos[&a.resolved_path].version, "v1");
            assert!(infos[&a.resolved_path].signature.is_none());
            assert_eq!(infos[&a.resolved_path].affects_global_scope, None);
            assert_eq!(
                infos[&b.resolved_path].implied_format,
                Some(ModuleKind::CommonJS)
            );

            let map = state.referenced_map().unwrap();
            assert!(map
                .get_values(&b.resolved_path)
                .unwrap()
                .contains(&a.resolved_path));
            assert!(map
                .get_keys(&a.resolved_path)
                .unwrap()
                .contains(&b.resolved_path));
            assert!(
                map.get_values(&a.resolved_path).is_none(),
                "no empty entry for a file without references"
            );
        }

        #[test]
        #[should_panic(expected = "versions set")]
        fn should_panic_without_file_version() {
            let a = SourceFileBuilder::new("/src/a.ts").external_module().build();
            let mut program = MockProgram::new(module_options());
            program.add_file(a);
            BuilderState::create(&program, None, false);
        }

        #[test]
        fn should_skip_global_scope_computation_under_single_output() {
            let script = SourceFileBuilder::new("/src/global.ts")
                .version("1")
                .script_code()
                .build();
            let mut program = MockProgram::new(CompilerOptions {
                module: Some(ModuleKind::AMD),
                out_file: Some("/dist/bundle.js".to_string()),
                ..Default::default()
            });
            program.add_file(script.clone());

            let state = BuilderState::create(&program, None, false);
            assert!(state.referenced_map().is_none());
            assert_eq!(
                state.file_infos()[&script.resolved_path].affects_global_scope,
                None
            );
        }

        #[test]
        fn should_mark_global_scope_files() {
            let script = SourceFileBuilder::new("/src/global.ts")
                .version("1")
                .script_code()
                .build();
            let augmenting = SourceFileBuilder::new("/src/augment.ts")
                .version("1")
                .external_module()
                .augments_global()
                .build();
            let module = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .external_module()
                .build();
            let mut program = MockProgram::new(module_options());
            program
                .add_file(script.clone())
                .add_file(augmenting.clone())
                .add_file(module.clone());

            let state = BuilderState::create(&program, None, false);
            let infos = state.file_infos();
            assert_eq!(infos[&script.resolved_path].affects_global_scope, Some(true));
            assert_eq!(
                infos[&augmenting.resolved_path].affects_global_scope,
                Some(true)
            );
            assert_eq!(infos[&module.resolved_path].affects_global_scope, None);
        }
    }

    mod signature_tests {
        use super::*;

        #[test]
        fn should_use_version_on_first_build() {
            let (program, a, _b) = two_file_program("v1", A_DTS);
            let mut state = BuilderState::create(&program, None, false);
            let host = DefaultBuildHost;

            let changed = state
                .update_shape_signature(&program, &a, None, &host)
                .unwrap();

            assert!(changed);
            assert_eq!(program.emit_call_count(), 0, "version path must not emit");
            assert_eq!(
                state.file_infos()[&a.resolved_path].signature.as_deref(),
                Some("v1")
            );
        }

        #[test]
        fn should_short_circuit_repeat_checks() {
            let (program, a, _b) = two_file_program("v1", A_DTS);
            let mut state = BuilderState::create(&program, None, true);
            let host = DefaultBuildHost;

            let first = state
                .update_shape_signature(&program, &a, None, &host)
                .unwrap();
            assert!(first);
            assert_eq!(program.emit_call_count(), 1);

            let second = state
                .update_shape_signature(&program, &a, None, &host)
                .unwrap();
            assert!(!second, "repeat check reports unchanged");
            assert_eq!(program.emit_call_count(), 1, "emitter is not consulted again");
        }

        #[test]
        fn should_use_version_for_declaration_files() {
            let types = SourceFileBuilder::new("/src/types.d.ts")
                .version("5")
                .declaration_file()
                .build();
            let mut program = MockProgram::new(module_options());
            program.add_file(types.clone());
            let mut state = BuilderState::create(&program, None, true);

            let changed = state
                .update_shape_signature(&program, &types, None, &DefaultBuildHost)
                .unwrap();

            assert!(changed);
            assert_eq!(program.emit_call_count(), 0);
            assert_eq!(
                state.file_infos()[&types.resolved_path].signature.as_deref(),
                Some("5")
            );
        }

        #[test]
        fn should_report_unchanged_when_declaration_text_is_stable() {
            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, true);
            let host = DefaultBuildHost;
            state1
                .get_files_affected_by(&program1, &a1.resolved_path, None, &host)
                .unwrap();

            // Same declaration text, new version: a body-only edit.
            let (program2, a2, _) = two_file_program("v2", A_DTS);
            let mut state2 = BuilderState::create(&program2, Some(&state1), false);
            let changed = state2
                .update_shape_signature(&program2, &a2, None, &host)
                .unwrap();
            assert!(!changed);
        }
    }

    mod propagation_tests {
        use super::*;

        #[test]
        fn should_not_propagate_past_stable_declarations() {
            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, true);
            let host = DefaultBuildHost;
            state1
                .get_files_affected_by(&program1, &a1.resolved_path, None, &host)
                .unwrap();

            let (program2, a2, _) = two_file_program("v2", A_DTS);
            let mut state2 = BuilderState::create(&program2, Some(&state1), false);
            let affected = state2
                .get_files_affected_by(&program2, &a2.resolved_path, None, &host)
                .unwrap();

            assert_eq!(names(&affected), vec!["/src/a.ts"]);
        }

        #[test]
        fn should_propagate_when_declaration_shape_changes() {
            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, true);
            let host = DefaultBuildHost;
            state1
                .get_files_affected_by(&program1, &a1.resolved_path, None, &host)
                .unwrap();

            let (program2, a2, _) =
                two_file_program("v2", "export declare function f(): string;\n");
            let mut state2 = BuilderState::create(&program2, Some(&state1), false);
            let affected = state2
                .get_files_affected_by(&program2, &a2.resolved_path, None, &host)
                .unwrap();

            assert_eq!(names(&affected), vec!["/src/a.ts", "/src/b.ts"]);
        }

        #[test]
        fn should_terminate_on_cycles() {
            let a = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .import("./b")
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("1")
                .import("./c")
                .build();
            let c = SourceFileBuilder::new("/src/c.ts")
                .version("1")
                .import("./a")
                .build();
            let mut program = MockProgram::new(module_options());
            program
                .add_file(a.clone())
                .add_file(b.clone())
                .add_file(c.clone());
            program.resolve_import(&a, "./b", &[&b]);
            program.resolve_import(&b, "./c", &[&c]);
            program.resolve_import(&c, "./a", &[&a]);

            // Fresh state: every recomputation in the chain is forced.
            let mut state = BuilderState::create(&program, None, false);
            let affected = state
                .get_files_affected_by(&program, &a.resolved_path, None, &DefaultBuildHost)
                .unwrap();

            assert_eq!(affected.len(), 3);
            let affected_names = names(&affected);
            assert!(affected_names.contains(&"/src/a.ts"));
            assert!(affected_names.contains(&"/src/b.ts"));
            assert!(affected_names.contains(&"/src/c.ts"));
        }

        #[test]
        fn should_return_all_files_when_global_scope_file_changes() {
            let lib = SourceFileBuilder::new("/lib/lib.d.ts")
                .version("1")
                .declaration_file()
                .script_code()
                .build();
            let global = SourceFileBuilder::new("/src/global.ts")
                .version("1")
                .script_code()
                .build();
            let a = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .external_module()
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("1")
                .external_module()
                .build();
            let mut program = MockProgram::new(module_options());
            program.add_default_library(lib);
            program
                .add_file(global.clone())
                .add_file(a.clone())
                .add_file(b.clone());

            let mut state = BuilderState::create(&program, None, false);
            let affected = state
                .get_files_affected_by(&program, &global.resolved_path, None, &DefaultBuildHost)
                .unwrap();

            assert_eq!(
                names(&affected),
                vec!["/src/global.ts", "/src/a.ts", "/src/b.ts"]
            );
        }

        #[test]
        fn should_return_only_file_under_isolated_modules() {
            let a = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .external_module()
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("1")
                .import("./a")
                .build();
            let mut options = module_options();
            options.isolated_modules = Some(true);
            let mut program = MockProgram::new(options);
            program.add_file(a.clone()).add_file(b.clone());
            program.resolve_import(&b, "./a", &[&a]);

            let mut state = BuilderState::create(&program, None, false);
            let affected = state
                .get_files_affected_by(&program, &a.resolved_path, None, &DefaultBuildHost)
                .unwrap();

            assert_eq!(names(&affected), vec!["/src/a.ts"]);
        }

        #[test]
        fn should_return_only_file_under_single_output() {
            let a = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .external_module()
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("1")
                .import("./a")
                .build();
            let mut program = MockProgram::new(CompilerOptions {
                module: Some(ModuleKind::AMD),
                out_file: Some("/dist/bundle.js".to_string()),
                ..Default::default()
            });
            program.add_file(a.clone()).add_file(b.clone());
            program.resolve_import(&b, "./a", &[&a]);

            let mut state = BuilderState::create(&program, None, false);
            let affected = state
                .get_files_affected_by(&program, &a.resolved_path, None, &DefaultBuildHost)
                .unwrap();

            assert_eq!(names(&affected), vec!["/src/a.ts"]);
        }

        #[test]
        fn should_return_all_files_in_non_module_mode() {
            let lib = SourceFileBuilder::new("/lib/lib.d.ts")
                .version("1")
                .declaration_file()
                .script_code()
                .build();
            let a = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .script_code()
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("1")
                .script_code()
                .build();
            let mut program = MockProgram::new(CompilerOptions::default());
            program.add_default_library(lib);
            program.add_file(a.clone()).add_file(b.clone());

            let mut state = BuilderState::create(&program, None, false);
            let affected = state
                .get_files_affected_by(&program, &a.resolved_path, None, &DefaultBuildHost)
                .unwrap();

            assert_eq!(names(&affected), vec!["/src/a.ts", "/src/b.ts"]);
        }

        #[test]
        fn should_return_empty_for_unknown_path() {
            let (program, _a, _b) = two_file_program("v1", A_DTS);
            let mut state = BuilderState::create(&program, None, false);
            let affected = state
                .get_files_affected_by(
                    &program,
                    &ts::CanonicalPath::new("/src/missing.ts"),
                    None,
                    &DefaultBuildHost,
                )
                .unwrap();
            assert!(affected.is_empty());
        }
    }

    mod reuse_tests {
        use super::*;

        #[test]
        fn should_carry_signatures_on_full_reuse() {
            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, true);
            let host = DefaultBuildHost;
            state1
                .get_files_affected_by(&program1, &a1.resolved_path, None, &host)
                .unwrap();

            let (program2, _, _) = two_file_program("v1", A_DTS);
            let state2 = BuilderState::create(&program2, Some(&state1), false);

            assert_eq!(state1.file_infos(), state2.file_infos());
            assert!(!state2.uses_file_version_as_signature());
            assert_eq!(program2.emit_call_count(), 0, "reuse triggers no recomputation");
        }

        #[test]
        fn should_not_reuse_across_emit_strategy_change() {
            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, true);
            state1
                .get_files_affected_by(&program1, &a1.resolved_path, None, &DefaultBuildHost)
                .unwrap();

            let a = SourceFileBuilder::new("/src/a.ts")
                .version("v1")
                .external_module()
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("v1")
                .import("./a")
                .build();
            let mut bundled = MockProgram::new(CompilerOptions {
                module: Some(ModuleKind::AMD),
                out_file: Some("/dist/bundle.js".to_string()),
                ..Default::default()
            });
            bundled.add_file(a.clone()).add_file(b);
            let state2 = BuilderState::create(&bundled, Some(&state1), false);

            assert!(state2.file_infos()[&a.resolved_path].signature.is_none());
            assert!(state2.uses_file_version_as_signature());
        }

        #[test]
        fn should_roll_back_uncommitted_signatures() {
            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, true);
            let host = DefaultBuildHost;

            // The with-old-state variant keeps the rollback buffer alive.
            let affected = state1
                .get_files_affected_by_with_old_state(&program1, &a1.resolved_path, None, &host)
                .unwrap();
            assert_eq!(affected.len(), 2);
            assert!(state1.file_infos()[&a1.resolved_path].signature.is_some());

            let (program2, a2, b2) = two_file_program("v1", A_DTS);
            let state2 = BuilderState::create(&program2, Some(&state1), false);

            // The tentative signatures never committed, so the new state
            // starts from their pre-query values: unset.
            assert!(state2.file_infos()[&a2.resolved_path].signature.is_none());
            assert!(state2.file_infos()[&b2.resolved_path].signature.is_none());
        }

        #[test]
        fn should_adopt_committed_signatures_after_query_completes() {
            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, true);
            let host = DefaultBuildHost;
            state1
                .get_files_affected_by(&program1, &a1.resolved_path, None, &host)
                .unwrap();

            let (program2, a2, b2) = two_file_program("v1", A_DTS);
            let state2 = BuilderState::create(&program2, Some(&state1), false);

            assert_eq!(
                state2.file_infos()[&a2.resolved_path].signature,
                state1.file_infos()[&a2.resolved_path].signature
            );
            assert!(state2.file_infos()[&b2.resolved_path].signature.is_some());
        }
    }

    mod cache_tests {
        use super::*;

        #[test]
        fn should_cache_all_files_projection_until_released() {
            let lib = SourceFileBuilder::new("/lib/lib.d.ts")
                .version("1")
                .declaration_file()
                .script_code()
                .build();
            let (mut program, a, b) = two_file_program("v1", A_DTS);
            program.add_default_library(lib);
            let mut state = BuilderState::create(&program, None, false);

            let first: Vec<String> = state
                .get_all_files_excluding_default_library_file(&program, Some(&a))
                .iter()
                .map(|file| file.file_name.clone())
                .collect();
            assert_eq!(first, vec!["/src/a.ts", "/src/b.ts"]);

            let cached: Vec<String> = state
                .get_all_files_excluding_default_library_file(&program, Some(&b))
                .iter()
                .map(|file| file.file_name.clone())
                .collect();
            assert_eq!(cached, first, "projection is cached across calls");

            state.release_cache();
            let rebuilt: Vec<String> = state
                .get_all_files_excluding_default_library_file(&program, Some(&b))
                .iter()
                .map(|file| file.file_name.clone())
                .collect();
            assert_eq!(rebuilt, vec!["/src/b.ts", "/src/a.ts"]);
        }

        #[test]
        fn should_compute_all_dependencies() {
            let a = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .import("./b")
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("1")
                .import("./c")
                .build();
            let c = SourceFileBuilder::new("/src/c.ts")
                .version("1")
                .external_module()
                .build();
            let mut program = MockProgram::new(module_options());
            program
                .add_file(a.clone())
                .add_file(b.clone())
                .add_file(c.clone());
            program.resolve_import(&a, "./b", &[&b]);
            program.resolve_import(&b, "./c", &[&c]);

            let state = BuilderState::create(&program, None, false);
            let dependencies = state.get_all_dependencies(&program, &a);
            assert_eq!(dependencies, vec!["/src/a.ts", "/src/b.ts", "/src/c.ts"]);

            let leaf_dependencies = state.get_all_dependencies(&program, &c);
            assert_eq!(leaf_dependencies, vec!["/src/c.ts"]);
        }

        #[test]
        fn should_treat_everything_as_dependency_under_single_output() {
            let a = SourceFileBuilder::new("/src/a.ts")
                .version("1")
                .external_module()
                .build();
            let b = SourceFileBuilder::new("/src/b.ts")
                .version("1")
                .external_module()
                .build();
            let mut program = MockProgram::new(CompilerOptions {
                module: Some(ModuleKind::AMD),
                out_file: Some("/dist/bundle.js".to_string()),
                ..Default::default()
            });
            program.add_file(a.clone()).add_file(b);

            let state = BuilderState::create(&program, None, false);
            let dependencies = state.get_all_dependencies(&program, &a);
            assert_eq!(dependencies, vec!["/src/a.ts", "/src/b.ts"]);
        }
    }

    mod telemetry_tests {
        use super::*;

        #[test]
        fn should_record_signature_strategies() {
            let host = MockHost {
                store_signature_info: true,
            };

            let (program1, a1, _) = two_file_program("v1", A_DTS);
            let mut state1 = BuilderState::create(&program1, None, false);
            state1
                .get_files_affected_by(&program1, &a1.resolved_path, None, &host)
                .unwrap();
            let info1 = state1.signature_info().unwrap();
            assert_eq!(info1[&a1.resolved_path], SignatureInfo::UsedVersion);

            let (program2, a2, _) = two_file_program("v2", A_DTS);
            let mut state2 = BuilderState::create(&program2, Some(&state1), false);
            state2
                .get_files_affected_by(&program2, &a2.resolved_path, None, &host)
                .unwrap();
            let info2 = state2.signature_info().unwrap();
            assert_eq!(info2[&a2.resolved_path], SignatureInfo::ComputedDts);

            let json = serde_json::to_string(info2).unwrap();
            assert!(json.contains("ComputedDts"));
        }
    }

    mod cancellation_tests {
        use super::*;

        #[test]
        fn should_propagate_cancellation_from_emit() {
            let (program, a, _) = two_file_program("v1", A_DTS);
            let mut state = BuilderState::create(&program, None, true);
            let token = TestCancellationToken::new();
            token.cancel();

            let result = state.get_files_affected_by(
                &program,
                &a.resolved_path,
                Some(&token),
                &DefaultBuildHost,
            );
            assert!(result.is_err());
            assert_eq!(program.emit_call_count(), 0);
        }
    }
}
