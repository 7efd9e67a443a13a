//! The module contains the errors the engine can throw.
//!
//! Business-rule failures carry a short, user-facing message. Persistence
//! failures are wrapped in [`Database`] and must never be shown verbatim to
//! end users.
//!
//!  [`Database`]: EngineError::Database
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("This email is already registered.")]
    DuplicateEmail,
    #[error("Invalid email, password or role.")]
    InvalidCredentials,
    #[error("Your business account is awaiting admin approval.")]
    PendingApproval,
    #[error("Your account has been rejected by an administrator.")]
    Rejected,
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Invalid state: {0}")]
    InvalidState(String),
    #[error("\"{0}\" not found!")]
    NotFound(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("password hashing failed: {0}")]
    PasswordHash(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Validation(a), Self::Validation(b)) => a == b,
            (Self::DuplicateEmail, Self::DuplicateEmail) => true,
            (Self::InvalidCredentials, Self::InvalidCredentials) => true,
            (Self::PendingApproval, Self::PendingApproval) => true,
            (Self::Rejected, Self::Rejected) => true,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::InvalidState(a), Self::InvalidState(b)) => a == b,
            (Self::NotFound(a), Self::NotFound(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::PasswordHash(a), Self::PasswordHash(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
