//! Email admission gate
//!
//! Pure policy check run before an account is created or a login is
//! attempted: address syntax, then the disposable-provider lists.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::domain::result::{Error, Result};

static EMAIL_SYNTAX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

const DISPOSABLE_DOMAINS: &[&str] = &[
    "mailinator.com",
    "yopmail.com",
    "10minutemail.com",
    "guerrillamail.com",
    "trashmail.com",
    "sharklasers.com",
    "getnada.com",
    "maildrop.cc",
    "dispostable.com",
    "mailnesia.com",
    "tempmail.com",
    "tempmailo.com",
    "throwawaymail.com",
    "minuteinbox.com",
    "moakt.com",
    "fakeinbox.com",
    "temp-mail.org",
    "emailondeck.com",
    "mailcatch.com",
];

const DISPOSABLE_KEYWORDS: &[&str] = &[
    "mailinator",
    "yopmail",
    "tempmail",
    "10min",
    "guerrilla",
    "trashmail",
    "sharklasers",
    "getnada",
    "maildrop",
    "dispostable",
    "mailnesia",
    "throwaway",
    "minuteinbox",
    "moakt",
    "fakeinbox",
    "emailondeck",
    "mailcatch",
    "temp-mail",
];

/// Why an address was turned away
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    InvalidFormat,
    DisposableDomain(String),
    DisposableKeyword(String),
}

impl RejectReason {
    /// User-facing message
    pub fn message(&self) -> &'static str {
        match self {
            RejectReason::InvalidFormat => "Invalid email format",
            RejectReason::DisposableDomain(_) | RejectReason::DisposableKeyword(_) => {
                "Disposable email addresses are not allowed"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Rejected(RejectReason),
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }
}

/// Syntax and disposable-provider filter for email addresses
pub struct EmailAdmissionGate {
    domains: HashSet<String>,
    keywords: Vec<String>,
}

impl EmailAdmissionGate {
    /// Gate with the built-in policy lists only
    pub fn new() -> Self {
        Self::with_extra(&[], &[])
    }

    /// Gate with the built-in lists plus configured entries
    pub fn with_extra(extra_domains: &[String], extra_keywords: &[String]) -> Self {
        let domains = DISPOSABLE_DOMAINS
            .iter()
            .map(|d| d.to_string())
            .chain(extra_domains.iter().map(|d| d.trim().to_lowercase()))
            .filter(|d| !d.is_empty())
            .collect();
        let keywords = DISPOSABLE_KEYWORDS
            .iter()
            .map(|k| k.to_string())
            .chain(extra_keywords.iter().map(|k| k.trim().to_lowercase()))
            .filter(|k| !k.is_empty())
            .collect();

        Self { domains, keywords }
    }

    pub fn admit(&self, email: &str) -> Admission {
        let email = email.trim().to_lowercase();
        if !EMAIL_SYNTAX.is_match(&email) {
            return Admission::Rejected(RejectReason::InvalidFormat);
        }
        // The syntax check guarantees exactly one '@'
        let domain = match email.rsplit_once('@') {
            Some((_, domain)) => domain,
            None => return Admission::Rejected(RejectReason::InvalidFormat),
        };

        let root = registrable_root(domain);
        if self.domains.contains(root) {
            return Admission::Rejected(RejectReason::DisposableDomain(root.to_string()));
        }
        if let Some(keyword) = self.keywords.iter().find(|k| domain.contains(k.as_str())) {
            return Admission::Rejected(RejectReason::DisposableKeyword(keyword.clone()));
        }
        Admission::Admitted
    }

    /// `admit` as a `Result`, for boundary operations
    pub fn check(&self, email: &str) -> Result<()> {
        match self.admit(email) {
            Admission::Admitted => Ok(()),
            Admission::Rejected(reason) => Err(Error::validation(reason.message())),
        }
    }
}

impl Default for EmailAdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Last two labels of a domain with more than two
fn registrable_root(domain: &str) -> &str {
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() > 2 {
        let keep = labels[labels.len() - 2].len() + labels[labels.len() - 1].len() + 1;
        &domain[domain.len() - keep..]
    } else {
        domain
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_disposable_domain_rejected() {
        let gate = EmailAdmissionGate::new();
        assert_eq!(
            gate.admit("a@mailinator.com"),
            Admission::Rejected(RejectReason::DisposableDomain("mailinator.com".to_string()))
        );
    }

    #[test]
    fn test_subdomain_stripped_to_root() {
        let gate = EmailAdmissionGate::new();
        assert_eq!(
            gate.admit("a@mail.yopmail.com"),
            Admission::Rejected(RejectReason::DisposableDomain("yopmail.com".to_string()))
        );
    }

    #[test]
    fn test_keyword_catches_other_tlds() {
        let gate = EmailAdmissionGate::new();
        assert_eq!(
            gate.admit("a@guerrillamail.net"),
            Admission::Rejected(RejectReason::DisposableKeyword("guerrilla".to_string()))
        );
        assert!(!gate.admit("a@my10minbox.io").is_admitted());
    }

    #[test]
    fn test_ordinary_address_admitted() {
        let gate = EmailAdmissionGate::new();
        assert_eq!(gate.admit("user@example.com"), Admission::Admitted);
        assert_eq!(gate.admit("  User@Example.COM "), Admission::Admitted);
        assert_eq!(gate.admit("first.last@mail.example.co"), Admission::Admitted);
    }

    #[test]
    fn test_malformed_addresses_rejected() {
        let gate = EmailAdmissionGate::new();
        for bad in ["not-an-email", "a@b", "@example.com", "a b@example.com", "a@@example.com", ""] {
            assert_eq!(
                gate.admit(bad),
                Admission::Rejected(RejectReason::InvalidFormat),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_configured_entries_extend_lists() {
        let gate = EmailAdmissionGate::with_extra(
            &["burner.dev".to_string()],
            &["spamhole".to_string()],
        );
        assert!(!gate.admit("x@burner.dev").is_admitted());
        assert!(!gate.admit("x@spamhole.example").is_admitted());
        assert!(!gate.admit("x@mailinator.com").is_admitted());
        assert!(gate.admit("x@example.com").is_admitted());
    }

    #[test]
    fn test_check_maps_to_validation_error() {
        let err = EmailAdmissionGate::new().check("a@yopmail.com").unwrap_err();
        assert!(matches!(err, Error::Validation(msg) if msg.contains("Disposable")));
    }

    #[test]
    fn test_registrable_root() {
        assert_eq!(registrable_root("a.b.example.com"), "example.com");
        assert_eq!(registrable_root("example.com"), "example.com");
    }
}
