use std::collections::HashMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Expiration time, milliseconds since the epoch.
pub const CLAIM_EXPIRY: &str = "exp";
/// Not-before time, milliseconds since the epoch.
pub const CLAIM_NOT_BEFORE: &str = "nbf";
/// Issued-at time, milliseconds since the epoch.
pub const CLAIM_ISSUED_AT: &str = "iat";

pub const CLAIM_USER_ID: &str = "uid";
pub const CLAIM_EMAIL: &str = "email";
pub const CLAIM_SCOPES: &str = "scp";

pub const SCOPE_USERS_READ: &str = "users:read";
pub const SCOPE_USERS_WRITE: &str = "users:write";

/// Value of a single claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClaimValue {
    Number(f64),
    String(String),
    Strings(Vec<String>),
}

impl ClaimValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            ClaimValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ClaimValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            ClaimValue::Strings(v) => Some(v),
            _ => None,
        }
    }
}

/// Timestamps are stored as floating-point milliseconds, the form verification reads back.
impl From<DateTime<Utc>> for ClaimValue {
    fn from(t: DateTime<Utc>) -> Self {
        ClaimValue::Number(t.timestamp_millis() as f64)
    }
}

impl From<f64> for ClaimValue {
    fn from(n: f64) -> Self {
        ClaimValue::Number(n)
    }
}

/// Claims are JSON doubles: integers beyond ±2^53 lose precision, so large
/// identifiers belong in string claims.
impl From<i64> for ClaimValue {
    fn from(n: i64) -> Self {
        ClaimValue::Number(n as f64)
    }
}

impl From<i32> for ClaimValue {
    fn from(n: i32) -> Self {
        ClaimValue::Number(n.into())
    }
}

impl From<u32> for ClaimValue {
    fn from(n: u32) -> Self {
        ClaimValue::Number(n.into())
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        ClaimValue::String(s)
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        ClaimValue::String(s.to_string())
    }
}

impl From<Vec<String>> for ClaimValue {
    fn from(v: Vec<String>) -> Self {
        ClaimValue::Strings(v)
    }
}

impl From<&[&str]> for ClaimValue {
    fn from(v: &[&str]) -> Self {
        ClaimValue::Strings(v.iter().map(|s| s.to_string()).collect())
    }
}

/// Claim set carried in a token payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(HashMap<String, ClaimValue>);

impl Claims {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a claim, replacing any existing value with the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ClaimValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ClaimValue> {
        self.0.get(name)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ClaimValue::as_number)
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ClaimValue::as_str)
    }

    pub fn strings(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(ClaimValue::as_strings)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClaimValue)> {
        self.0.iter()
    }
}

impl<K, V> FromIterator<(K, V)> for Claims
where
    K: Into<String>,
    V: Into<ClaimValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut claims = Claims::new();
        for (name, value) in iter {
            claims.insert(name, value);
        }
        claims
    }
}
