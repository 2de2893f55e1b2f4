// Token Verification Port
// JWT handling lives outside the core; only the verification contract is modelled here

use crate::domain::UserId;
use thiserror::Error;

/// Claims the real-time layer needs from a verified access token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: UserId,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Access token missing")]
    MissingToken,

    #[error("Access token invalid")]
    InvalidToken,

    #[error("Access token expired")]
    Expired,
}

#[cfg_attr(test, mockall::automock)]
pub trait TokenVerifier: Send + Sync {
    fn verify_access_token(&self, token: &str) -> Result<Claims, AuthError>;
}
