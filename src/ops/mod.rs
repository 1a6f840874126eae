pub mod poll;
pub mod stats;

use thiserror::Error;

/// The authenticated caller as handed over by the identity provider.
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

#[derive(Debug, Error)]
pub enum OpError {
    #[error("{entity} {id} does not exist")]
    NotFound { entity: &'static str, id: i32 },

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("authentication required")]
    Unauthorized,

    #[error("staff access required")]
    Forbidden,

    #[error("storage unavailable: {0}")]
    Storage(#[from] anyhow::Error),
}

impl From<sqlx::Error> for OpError {
    fn from(e: sqlx::Error) -> OpError {
        OpError::Storage(e.into())
    }
}

pub fn require_user(principal: Option<&Principal>) -> Result<&Principal, OpError> {
    match principal {
        None => Err(OpError::Unauthorized),
        Some(v) => Ok(v),
    }
}

pub fn require_staff(principal: Option<&Principal>) -> Result<&Principal, OpError> {
    let user = require_user(principal)?;

    if !user.is_staff {
        return Err(OpError::Forbidden);
    }

    Ok(user)
}
