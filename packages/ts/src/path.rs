use serde::{Deserialize, Serialize};
use std::fmt;

/// A canonicalized, absolute file path in POSIX form.
///
/// This is the identity every map in the build-state engine is keyed by. It
/// is distinct from a file's on-disk name: the program may redirect a file
/// name (e.g. through project references) before canonicalizing it, so two
/// different names can resolve to one `CanonicalPath`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    pub fn new(path: impl Into<String>) -> Self {
        CanonicalPath(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The directory portion of this path, without the trailing separator.
    pub fn directory(&self) -> &str {
        dirname(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a path starts from a filesystem root.
pub fn is_rooted(path: &str) -> bool {
    path.starts_with('/')
}

/// The directory portion of a POSIX path, without the trailing separator.
/// The root directory is its own dirname.
pub fn dirname(path: &str) -> &str {
    match path.rfind('/') {
        Some(0) => "/",
        Some(index) => &path[..index],
        None => "",
    }
}

/// Join `file_name` onto `base_dir` and collapse `.` and `..` segments.
/// Rooted file names are normalized as-is, ignoring the base.
pub fn resolve_path(base_dir: &str, file_name: &str) -> String {
    let joined = if is_rooted(file_name) {
        file_name.to_string()
    } else {
        format!("{}/{}", base_dir.trim_end_matches('/'), file_name)
    };

    let rooted = is_rooted(&joined);
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.pop().is_none() && !rooted {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let body = segments.join("/");
    if rooted {
        format!("/{}", body)
    } else {
        body
    }
}
