use crate::signature;

/// Host hooks for the build-state engine.
pub trait BuildHost {
    /// Opt-in recording of which signature strategy was used per file.
    fn store_signature_info(&self) -> bool {
        false
    }

    /// Hash used for shape signatures. Hosts may substitute their own.
    fn create_hash(&self, data: &str) -> String {
        signature::hash_text(data)
    }
}

/// Host with default behavior: blake3 signatures, no telemetry.
#[derive(Debug, Default)]
pub struct DefaultBuildHost;

impl BuildHost for DefaultBuildHost {}
