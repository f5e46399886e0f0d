// Shape-signature hashing
//
// A file's shape signature is a hash over its declaration-emit text plus
// any declaration diagnostics, so that an error appearing in (or vanishing
// from) the emitted declarations changes the signature too.

use crate::host::BuildHost;
use ts::{flatten_diagnostic_message_text, Diagnostic};

/// Default content hash: blake3, hex-encoded.
pub fn hash_text(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub(crate) fn compute_signature_with_diagnostics(
    text: &str,
    diagnostics: &[Diagnostic],
    host: &dyn BuildHost,
) -> String {
    if diagnostics.is_empty() {
        return host.create_hash(text);
    }

    let mut combined = String::from(text);
    for diagnostic in diagnostics {
        combined.push('\n');
        if let Some(file) = &diagnostic.file {
            combined.push_str(file);
            combined.push('(');
            combined.push_str(&diagnostic.start.unwrap_or(0).to_string());
            combined.push_str("): ");
        }
        combined.push_str(&flatten_diagnostic_message_text(
            &diagnostic.message_text,
            0,
        ));
    }
    host.create_hash(&combined)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::DefaultBuildHost;
    use ts::DiagnosticMessageChain;

    mod signature_tests {
        use super::*;

        #[test]
        fn should_hash_plain_text_stably() {
            assert_eq!(hash_text("declare const a: number;"), hash_text("declare const a: number;"));
            assert_ne!(hash_text("declare const a: number;"), hash_text("declare const a: string;"));
        }

        #[test]
        fn should_fold_diagnostics_into_signature() {
            let host = DefaultBuildHost;
            let text = "export declare function f(): number;\n";
            let clean = compute_signature_with_diagnostics(text, &[], &host);

            let diagnostic = Diagnostic {
                category: ts::DiagnosticCategory::Error,
                code: 4025,
                file: Some("/src/a.ts".to_string()),
                start: Some(12),
                length: Some(1),
                message_text: DiagnosticMessageChain::new(
                    "Exported variable has or is using private name",
                ),
            };
            let dirty = compute_signature_with_diagnostics(text, &[diagnostic], &host);
            assert_ne!(clean, dirty);
        }
    }
}
