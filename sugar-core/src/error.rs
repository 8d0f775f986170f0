//! Error types shared by the reactive primitives, the host and the portal.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A dependency could not be evaluated.
    #[error("invalid dependency at index {index}: {reason}")]
    InvalidDependency { index: usize, reason: String },

    /// The post-update phase of an observer ran without a pre-update snapshot.
    #[error("missing evaluated dependencies: post-update ran without a pre-update phase")]
    ObserverProtocolViolation,

    #[error("portal should not have children ({children} found), pass content instead")]
    PortalMisuse { children: usize },

    #[error("element `{name}` is already defined")]
    AlreadyRegistered { name: String },

    #[error("`{name}` is not a valid custom element name")]
    InvalidElementName { name: String },

    #[error("element `{name}` is not defined")]
    UnknownElement { name: String },

    #[error("hierarchy request error: {reason}")]
    HierarchyRequest { reason: String },

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn invalid_dependency(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDependency {
            index,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn hierarchy(reason: impl Into<String>) -> Self {
        Self::HierarchyRequest {
            reason: reason.into(),
        }
    }
}
