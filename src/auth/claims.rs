use serde::{Deserialize, Serialize};

/// JWT payload issued to authenticated users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // username
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>, // user id, decimal
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}
