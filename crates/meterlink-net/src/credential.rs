//! ---
//! meterlink_section: "05-networking-external-interfaces"
//! meterlink_subsection: "module"
//! meterlink_type: "source"
//! meterlink_scope: "code"
//! meterlink_description: "Opaque bearer credential."
//! meterlink_version: "v0.1.0"
//! meterlink_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

/// Opaque bearer token presented to the collector.
///
/// Always non-empty. Cloning is cheap and `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Arc<str>);

impl Credential {
    /// Wrap a token, trimming surrounding whitespace. Returns `None` when
    /// nothing is left.
    pub fn new(token: impl AsRef<str>) -> Option<Self> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(Arc::from(trimmed)))
        }
    }

    /// Raw token for the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential(<{} chars redacted>)", self.0.chars().count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_tokens_are_rejected() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   \n").is_none());
    }

    #[test]
    fn token_is_trimmed() {
        let credential = Credential::new("  abc123\n").unwrap();
        assert_eq!(credential.expose(), "abc123");
    }

    #[test]
    fn debug_output_redacts_secret() {
        let credential = Credential::new("super-secret").unwrap();
        let rendered = format!("{credential:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("12 chars"));
    }
}
