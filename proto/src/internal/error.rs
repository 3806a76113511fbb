use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/* ===== errors ===== */

/// Why a wire filter string could not be turned back into criteria. Each variant
/// carries the fragment that was being parsed when the problem was found.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FilterError {
    NotEnclosed(String),
    MultipleLeafComponents(String),
    UnknownMatchingRule(String),
    Unbalanced(String),
}

impl Display for FilterError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            FilterError::NotEnclosed(frag) => write!(
                f,
                "{} - filter components must be enclosed in round brackets",
                frag
            ),
            FilterError::MultipleLeafComponents(frag) => write!(
                f,
                "{} - invalid filter syntax - multiple leaf components detected",
                frag
            ),
            FilterError::UnknownMatchingRule(frag) => write!(
                f,
                "{} - invalid filter syntax - unknown matching rule used",
                frag
            ),
            FilterError::Unbalanced(frag) => {
                write!(f, "{} - unbalanced or misplaced round brackets", frag)
            }
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthError {
    NoSuchPrincipal(String),
    NoPassword(String),
    InvalidCredentials(String),
    AnonymousNotAllowed,
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            AuthError::NoSuchPrincipal(dn) => write!(f, "User {} does not exist", dn),
            AuthError::NoPassword(dn) => write!(f, "User {} has no password entry", dn),
            AuthError::InvalidCredentials(dn) => write!(f, "Incorrect password for {}", dn),
            AuthError::AnonymousNotAllowed => f.write_str("Anonymous bind is not allowed"),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "lowercase")]
pub enum OperationError {
    // Query and filter errors.
    FilterSyntax(FilterError),
    NotImplemented(String),
    AmbiguousResult(usize),

    // Lookup errors.
    NoSuchObject(String),
    NoObjectClasses(String),
    UnknownObjectType(String),
    MissingAttribute(String),

    // Object bookkeeping.
    LockedAttribute(String),

    // Bind state.
    Authentication(AuthError),
    NotAuthenticated,
    SessionExpired,

    // Transport, storage and setup.
    Backend(String),
    InvalidConfig(String),
    FixtureError(String),
}

impl PartialEq for OperationError {
    fn eq(&self, other: &Self) -> bool {
        // We only compare the kind of error. Generally we only use the PartialEq for
        // TESTING anyway, and the details are checked with matches! where needed.
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}

impl Display for OperationError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        let mut output = format!("{:?}", self)
            .split('(')
            .next()
            .unwrap_or("")
            .to_string();

        if let Some(msg) = self.message() {
            output += &format!(" - {}", msg);
        };
        f.write_str(&output)
    }
}

impl OperationError {
    /// Return the message associated with the error if there is one.
    pub fn message(&self) -> Option<String> {
        match self {
            Self::FilterSyntax(err) => Some(format!("Filter parsing error: {}", err)),
            Self::NotImplemented(what) => Some(format!("Not implemented: {}", what)),
            Self::AmbiguousResult(count) => Some(format!(
                "Found {} results when expecting only one!",
                count
            )),
            Self::NoSuchObject(dn) => Some(format!("No such object: {}", dn)),
            Self::NoObjectClasses(dn) => Some(format!("The object {} has no object classes!", dn)),
            Self::UnknownObjectType(dn) => Some(format!("Unknown Kolab object type for DN {}", dn)),
            Self::MissingAttribute(attr) => Some(format!("Missing attribute: {}", attr)),
            Self::LockedAttribute(attr) => Some(format!(
                "The attribute {} is locked after the object has been saved",
                attr
            )),
            Self::Authentication(err) => Some(err.to_string()),
            Self::NotAuthenticated => None,
            Self::SessionExpired => Some("The directory bind has expired".into()),
            Self::Backend(msg) => Some(msg.clone()),
            Self::InvalidConfig(msg) => Some(msg.clone()),
            Self::FixtureError(msg) => Some(msg.clone()),
        }
    }

    /// Errors that mean the current bind can no longer be trusted. The session drops
    /// back to unbound when it sees one of these.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::Authentication(_) | Self::NotAuthenticated | Self::SessionExpired
        )
    }
}

#[test]
fn test_operationerror_as_nice_string() {
    assert_eq!(
        OperationError::NotAuthenticated.to_string(),
        "NotAuthenticated".to_string()
    );
    assert_eq!(
        OperationError::AmbiguousResult(2).to_string(),
        "AmbiguousResult - Found 2 results when expecting only one!".to_string()
    );
    assert_eq!(
        OperationError::FilterSyntax(FilterError::NotEnclosed("mail=a".to_string())).to_string(),
        "FilterSyntax - Filter parsing error: mail=a - filter components must be enclosed in round brackets".to_string()
    );
    assert_eq!(
        OperationError::Authentication(AuthError::AnonymousNotAllowed).to_string(),
        "Authentication - Anonymous bind is not allowed".to_string()
    );
}

#[test]
fn test_operationerror_auth_classification() {
    assert!(OperationError::SessionExpired.is_auth_failure());
    assert!(
        OperationError::Authentication(AuthError::NoPassword("cn=a".to_string()))
            .is_auth_failure()
    );
    assert!(!OperationError::Backend("io".to_string()).is_auth_failure());
}
