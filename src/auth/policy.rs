// Authorization Policy
// Decides whether a verified identity may proceed into the application

use regex::{Regex, RegexBuilder};

use super::error::AuthError;
use super::identity::Identity;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Allow-list applied to identities coming from non-exempt verifiers
#[derive(Debug, Clone, Default)]
pub struct AuthorizationRule {
    valid_matches: Vec<Regex>,
    empty_email_matches: bool,
}

impl AuthorizationRule {
    /// Compile a comma-separated list of case-insensitive patterns.
    ///
    /// An empty list allows every identity that has an email.
    pub fn new(valid_matches: &str, empty_email_matches: bool) -> Result<Self, AuthError> {
        let valid_matches = valid_matches
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| AuthError::InvalidConfig {
                        key: "authorization.valid_matches".to_string(),
                        reason: format!("invalid pattern {:?}: {}", pattern, e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            valid_matches,
            empty_email_matches,
        })
    }

    pub fn pattern_count(&self) -> usize {
        self.valid_matches.len()
    }

    fn matches(&self, email: &str) -> bool {
        self.valid_matches.is_empty() || self.valid_matches.iter().any(|re| re.is_match(email))
    }
}

pub fn authorize(identity: &Identity, exempt: bool, rule: &AuthorizationRule) -> Decision {
    if exempt {
        return Decision::Allow;
    }

    let allowed = if identity.has_email() {
        rule.matches(&identity.email)
    } else {
        rule.empty_email_matches
    };

    if allowed {
        Decision::Allow
    } else {
        Decision::Deny
    }
}
