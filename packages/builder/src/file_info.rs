use serde::{Deserialize, Serialize};
use ts::ModuleKind;

/// Per-file metadata tracked across builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Opaque host-supplied content version. Two files with equal version
    /// are assumed content-identical.
    pub version: String,
    /// The last computed shape signature: a hash of the file's
    /// declaration-emit text, or the raw `version` on the fallback path.
    /// `None` means never computed.
    pub signature: Option<String>,
    /// `Some(true)` when the file is treated as if every other file depends
    /// on it. Computed once at snapshot-build time; `None` both for files
    /// that do not affect the global scope and when the snapshot skipped the
    /// computation (single-output mode, where it is never consulted).
    pub affects_global_scope: Option<bool>,
    pub implied_format: Option<ModuleKind>,
}

/// Which strategy produced a file's current shape signature. Recorded per
/// file when the host opts in through `store_signature_info`; exposed for
/// tooling and telemetry, never consulted by the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureInfo {
    /// Hash of the declaration-emit text and its diagnostics.
    ComputedDts,
    /// Raw file version; any content edit counts as a shape change.
    UsedVersion,
}
