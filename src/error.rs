//! Error types for lexhost.

use thiserror::Error;

/// Why a load request contributed zero lexers.
///
/// A load never fails from the host's point of view: a library that cannot
/// be opened, or that exports no capability entry point, still produces an
/// inert registry record. The reason is retained here and surfaced through
/// [`LoadReport`](crate::LoadReport) for hosts that want diagnostics. The
/// loader error text is captured as a string so reports stay cheap to clone.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The shared library could not be opened at all.
    #[error("failed to open lexer library `{path}`: {reason}")]
    Open {
        /// Path the host asked for.
        path: String,
        /// Error text from the dynamic loader.
        reason: String,
    },

    /// The library opened but exports no `GetLexerCount` entry point.
    #[error("lexer library `{path}` exports no lexer capability entry point")]
    NoCapability {
        /// Path the host asked for.
        path: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_display() {
        let err = LoadError::Open {
            path: "/tmp/liblex.so".to_string(),
            reason: "no such file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "failed to open lexer library `/tmp/liblex.so`: no such file"
        );
    }

    #[test]
    fn test_no_capability_display() {
        let err = LoadError::NoCapability {
            path: "liblex.so".to_string(),
        };
        assert!(err.to_string().contains("no lexer capability entry point"));
    }
}
