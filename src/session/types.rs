//! Wire and domain types for the GradeX auth backend. Token-bearing payloads
//! are converted into `SecretString` as soon as they are decoded and must
//! never be logged.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Platform role carried on every user record.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    /// Only teachers and admins may use the admin dashboard.
    #[must_use]
    pub const fn can_use_dashboard(self) -> bool {
        matches!(self, Self::Teacher | Self::Admin)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Admin => "admin",
        }
    }
}

/// User record as returned by `/auth/login` and `/auth/profile`.
///
/// Unknown fields are ignored. `xp` and `streak` are passed through to the UI
/// untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct User {
    #[serde(alias = "_id")]
    pub id: String,
    pub email: String,
    #[serde(default, alias = "full_name")]
    pub name: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub xp: Option<i64>,
    #[serde(default)]
    pub streak: Option<i64>,
}

/// Access and refresh token held together so they are always stored as a unit.
#[derive(Clone)]
pub struct CredentialPair {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
}

impl CredentialPair {
    #[must_use]
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::from(access_token.into()),
            refresh_token: SecretString::from(refresh_token.into()),
        }
    }
}

impl std::fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .finish()
    }
}

impl PartialEq for CredentialPair {
    fn eq(&self, other: &Self) -> bool {
        self.access_token.expose_secret() == other.access_token.expose_secret()
            && self.refresh_token.expose_secret() == other.refresh_token.expose_secret()
    }
}

/// Successful OTP verification: fresh credentials plus the resolved user.
#[derive(Clone, Debug)]
pub struct LoginGrant {
    pub tokens: CredentialPair,
    pub user: User,
}

#[derive(Serialize)]
pub(crate) struct RequestOtpBody<'a> {
    pub email: &'a str,
}

#[derive(Serialize)]
pub(crate) struct LoginBody<'a> {
    pub email: &'a str,
    pub otp: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RefreshTokenBody<'a> {
    pub refresh_token: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
}

impl From<TokenResponse> for CredentialPair {
    fn from(response: TokenResponse) -> Self {
        Self::new(response.access_token, response.refresh_token)
    }
}

#[derive(Deserialize)]
pub(crate) struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenResponse,
    pub user: User,
}
