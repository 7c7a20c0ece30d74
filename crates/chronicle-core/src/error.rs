use std::fmt;

/// Machine-readable error codes surfaced by the CLI and in JSON reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    CatalogNotFound,
    CatalogParseError,
    CatalogShapeInvalid,
    IdentityTableNotFound,
    IdentityTableParseError,
    ConfigParseError,
    UnknownRule,
    CatalogWriteFailed,
    LockContention,
    ValidationFailed,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::CatalogNotFound => "E1001",
            Self::CatalogParseError => "E1002",
            Self::CatalogShapeInvalid => "E1003",
            Self::IdentityTableNotFound => "E1101",
            Self::IdentityTableParseError => "E1102",
            Self::ConfigParseError => "E1201",
            Self::UnknownRule => "E1202",
            Self::CatalogWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::ValidationFailed => "E7001",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::CatalogNotFound => "Catalog file not found",
            Self::CatalogParseError => "Catalog file is not valid JSON",
            Self::CatalogShapeInvalid => "Catalog file has an unexpected structure",
            Self::IdentityTableNotFound => "Country identity table not found",
            Self::IdentityTableParseError => "Country identity table parse error",
            Self::ConfigParseError => "Config file parse error",
            Self::UnknownRule => "Unknown matching rule in config",
            Self::CatalogWriteFailed => "Catalog write failed",
            Self::LockContention => "Lock contention",
            Self::ValidationFailed => "Catalog consistency violations found",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::CatalogNotFound => Some("Pass --catalog with the path to events.json."),
            Self::CatalogParseError => Some("Fix the JSON syntax in the catalog and retry."),
            Self::CatalogShapeInvalid => {
                Some("The catalog must be an object with an `events` array.")
            }
            Self::IdentityTableNotFound => {
                Some("Pass --countries-table with the path to country_mappings.json.")
            }
            Self::IdentityTableParseError => {
                Some("The identity table must be an object with a `countries` array.")
            }
            Self::ConfigParseError => Some("Fix syntax in chronicle.toml and retry."),
            Self::UnknownRule => Some(
                "Use rule names: shared_external_link, exact_title_key, near_identical_title, category_mismatch, fuzzy_title.",
            ),
            Self::CatalogWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => {
                Some("Retry after the other `chron` process releases its lock.")
            }
            Self::ValidationFailed => {
                Some("Inspect the reported violations, fix the records, and rerun `chron check`.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::ErrorCode;
    use std::collections::HashSet;

    const ALL: [ErrorCode; 11] = [
        ErrorCode::CatalogNotFound,
        ErrorCode::CatalogParseError,
        ErrorCode::CatalogShapeInvalid,
        ErrorCode::IdentityTableNotFound,
        ErrorCode::IdentityTableParseError,
        ErrorCode::ConfigParseError,
        ErrorCode::UnknownRule,
        ErrorCode::CatalogWriteFailed,
        ErrorCode::LockContention,
        ErrorCode::ValidationFailed,
        ErrorCode::InternalUnexpected,
    ];

    #[test]
    fn all_codes_are_unique() {
        let mut seen = HashSet::new();
        for code in ALL {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        for code in ALL {
            let text = code.code();
            assert_eq!(text.len(), 5);
            assert!(text.starts_with('E'));
            assert!(text.chars().skip(1).all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn display_matches_code() {
        assert_eq!(ErrorCode::LockContention.to_string(), "E5002");
    }
}
