//! Ordered regex patterns used to classify an error's combined
//! message+traceback text into an [`ErrorCategory`] (spec.md §4.4 step 1).
//!
//! Grounded directly on `original_source/core/self_heal.py::ERROR_PATTERNS`.
//! Category order matters: the first category with any matching pattern
//! wins, exactly as the original's dict-iteration-then-break does.

use itak_types::heal::ErrorCategory;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

fn ci(pattern: &str) -> Regex {
    RegexBuilder::new(pattern).case_insensitive(true).build().expect("valid pattern")
}

struct CategoryPatterns {
    category: ErrorCategory,
    patterns: Vec<Regex>,
}

static ERROR_PATTERNS: Lazy<Vec<CategoryPatterns>> = Lazy::new(|| {
    vec![
        CategoryPatterns {
            category: ErrorCategory::Dependency,
            patterns: vec![
                ci("ModuleNotFoundError"),
                ci("ImportError"),
                ci("No module named"),
                ci("pip install"),
                ci("package .* not found"),
            ],
        },
        CategoryPatterns {
            category: ErrorCategory::Network,
            patterns: vec![
                ci("ConnectionRefusedError"),
                ci("ConnectionError"),
                ci("TimeoutError"),
                ci("ConnectTimeoutError"),
                ci(r"HTTPError.*(?:429|502|503|504)"),
                ci("ECONNREFUSED"),
                ci("ConnectionResetError"),
                ci("SSLError"),
            ],
        },
        CategoryPatterns {
            category: ErrorCategory::Config,
            patterns: vec![
                ci(r"KeyError.*(?:API|KEY|TOKEN|URL|PORT)"),
                ci(r"FileNotFoundError.*(?:config|\.env|\.json)"),
                ci(r"Invalid.*(?:host|port|url|token)"),
                ci("PermissionError"),
            ],
        },
        CategoryPatterns {
            category: ErrorCategory::Runtime,
            patterns: vec![
                ci("TypeError"),
                ci("ValueError"),
                ci("AttributeError"),
                ci("KeyError"),
                ci("IndexError"),
                ci("JSONDecodeError"),
                ci("SyntaxError"),
                ci("NameError"),
            ],
        },
        CategoryPatterns {
            category: ErrorCategory::Resource,
            patterns: vec![
                ci("MemoryError"),
                ci(r"OSError.*(?:No space|Disk quota)"),
                ci("ResourceWarning"),
                ci(r"CUDA.*(?:out of memory|OOM)"),
            ],
        },
        CategoryPatterns {
            category: ErrorCategory::Security,
            patterns: vec![
                ci("Unauthorized"),
                ci("Forbidden"),
                ci("AuthenticationError"),
                ci("CredentialError"),
                ci("SECURITY_BLOCKED"),
            ],
        },
        CategoryPatterns {
            category: ErrorCategory::Data,
            patterns: vec![
                ci("IntegrityError"),
                ci("CorruptedError"),
                ci("DatabaseError"),
                ci("ChecksumMismatch"),
            ],
        },
    ]
});

/// Classifies `full_text` (an error message plus traceback) into a
/// category, returning [`ErrorCategory::Unknown`] if nothing matches.
pub fn classify_text(full_text: &str) -> ErrorCategory {
    for category_patterns in ERROR_PATTERNS.iter() {
        if category_patterns.patterns.iter().any(|re| re.is_match(full_text)) {
            return category_patterns.category;
        }
    }
    ErrorCategory::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_dependency_errors() {
        assert_eq!(classify_text("ModuleNotFoundError: No module named 'foo'"), ErrorCategory::Dependency);
    }

    #[test]
    fn classifies_network_errors() {
        assert_eq!(classify_text("ConnectionRefusedError: [Errno 111]"), ErrorCategory::Network);
    }

    #[test]
    fn classifies_security_errors_as_security() {
        assert_eq!(classify_text("Unauthorized: invalid credentials"), ErrorCategory::Security);
    }

    #[test]
    fn unmatched_text_is_unknown() {
        assert_eq!(classify_text("something entirely unrecognized happened"), ErrorCategory::Unknown);
    }

    #[test]
    fn dependency_checked_before_runtime_for_overlapping_text() {
        // "No module named" matches Dependency; ensure category order wins
        // even though the text also happens to contain "Error" generically.
        assert_eq!(classify_text("ImportError: No module named 'requests'"), ErrorCategory::Dependency);
    }
}
