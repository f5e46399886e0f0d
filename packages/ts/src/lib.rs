//! TypeScript-compatible interfaces and types for the incremental builder.
//! This crate serves as a shared compatibility layer: the narrow surface of
//! the program, checker and emitter that the build-state engine consumes.

use std::fmt;

pub mod node;
pub mod path;
pub mod program;
pub mod type_checker;

pub use node::*;
pub use path::*;
pub use program::*;
pub use type_checker::*;

// --- Enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptTarget {
    ES5,
    ES2015,
    ES2020,
    ES2022,
    ESNext,
    Latest,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleKind {
    None,
    CommonJS,
    AMD,
    UMD,
    System,
    ES2015,
    ES2020,
    ES2022,
    ESNext,
    Node16,
    NodeNext,
}

/// The flavor of a source file, as detected from its extension and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    TS,
    TSX,
    JS,
    JSX,
    JSON,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Suggestion,
    Message,
}

// --- Diagnostic Structures ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticMessageChain {
    String(String),
    Chain {
        message_text: String,
        category: DiagnosticCategory,
        code: i32,
        next: Option<Vec<DiagnosticMessageChain>>,
    },
}

impl DiagnosticMessageChain {
    pub fn new(message: impl Into<String>) -> Self {
        Self::String(message.into())
    }
}

impl From<&str> for DiagnosticMessageChain {
    fn from(s: &str) -> Self {
        DiagnosticMessageChain::String(s.to_string())
    }
}

impl fmt::Display for DiagnosticMessageChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticMessageChain::String(s) => write!(f, "{}", s),
            DiagnosticMessageChain::Chain { message_text, .. } => write!(f, "{}", message_text),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: i32,
    pub file: Option<String>,
    pub start: Option<usize>,
    pub length: Option<usize>,
    pub message_text: DiagnosticMessageChain,
}

impl Diagnostic {
    pub fn error(code: i32, message: impl Into<String>) -> Self {
        Diagnostic {
            category: DiagnosticCategory::Error,
            code,
            file: None,
            start: None,
            length: None,
            message_text: DiagnosticMessageChain::new(message),
        }
    }
}

/// Flatten a diagnostic message chain into a single string, one line per
/// chained message, indented by depth.
pub fn flatten_diagnostic_message_text(chain: &DiagnosticMessageChain, indent: usize) -> String {
    match chain {
        DiagnosticMessageChain::String(s) => s.clone(),
        DiagnosticMessageChain::Chain {
            message_text, next, ..
        } => {
            let mut result = String::new();
            for _ in 0..indent {
                result.push_str("  ");
            }
            result.push_str(message_text);
            if let Some(next) = next {
                for entry in next {
                    result.push('\n');
                    result.push_str(&flatten_diagnostic_message_text(entry, indent + 1));
                }
            }
            result
        }
    }
}
