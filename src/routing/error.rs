//! Route registration errors

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid HTTP method {0:?}")]
    InvalidMethod(String),

    #[error("path {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("path {path:?} conflicts with an existing wildcard or sibling route")]
    WildcardConflict { path: String },

    #[error("wildcard *{requested} in path {path:?} conflicts with existing wildcard *{existing}")]
    WildcardNameConflict {
        path: String,
        existing: String,
        requested: String,
    },

    #[error("segment {segment:?} in path {path:?} conflicts with a parameter or literal sibling")]
    ParameterConflict { path: String, segment: String },

    #[error("parameter :{requested} in path {path:?} conflicts with existing parameter :{existing}")]
    ParameterNameConflict {
        path: String,
        existing: String,
        requested: String,
    },

    #[error("duplicate route {method} {path}")]
    DuplicateRoute { method: String, path: String },
}
