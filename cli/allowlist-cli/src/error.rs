use thiserror::Error;

/// Errors surfaced by the allowlist library.
///
/// Build-time failures (`InvalidEntry`, `EmptyAllowlist`, `DuplicateEntry`)
/// abort the whole build. A proof that simply does not match a root is not an
/// error; [`crate::verify`] returns `false` for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllowlistError {
    #[error("invalid allowlist entry: {0}")]
    InvalidEntry(String),

    #[error("allowlist is empty")]
    EmptyAllowlist,

    #[error("duplicate allowlist entry {0}")]
    DuplicateEntry(String),

    #[error("{0} is not in the allowlist")]
    LeafNotFound(String),

    #[error("invalid proof: {0}")]
    InvalidProof(String),

    #[error("invalid tree: {0}")]
    InvalidTree(String),
}

pub type Result<T> = std::result::Result<T, AllowlistError>;
