use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use super::signed::Token;

/// Token handed back to a client after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    pub token: String,
    /// Expiry as Unix seconds.
    pub expires: i64,
}

impl AccessToken {
    pub fn new(token: &Token, expires: DateTime<Utc>) -> Self {
        Self {
            token: token.to_string(),
            expires: expires.timestamp(),
        }
    }
}
