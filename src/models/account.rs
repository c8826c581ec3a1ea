//! Login accounts, roles and JWT claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

/// Account role. Librarians are the privileged actors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Librarian,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Librarian => "librarian",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "member" => Ok(Role::Member),
            "librarian" => Ok(Role::Librarian),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Login account
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Account {
    pub id: i32,
    pub login: String,
    /// Hashed password (argon2)
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    /// Member record the account acts for (member role only)
    pub member_id: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Create account request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateAccount {
    #[validate(length(min = 3, message = "Login must be at least 3 characters"))]
    pub login: String,
    #[validate(length(min = 4, message = "Password must be at least 4 characters"))]
    pub password: String,
    pub role: Role,
    pub member_id: Option<i32>,
}

/// Login request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub login: String,
    pub password: String,
    /// Expected role; login fails when the account has another role
    pub role: Option<Role>,
}

/// Login response
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoginResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub account: Account,
}

/// JWT claims for authenticated accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountClaims {
    pub sub: String,
    pub account_id: i32,
    pub role: Role,
    pub member_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl AccountClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(&Header::default(), self, &EncodingKey::from_secret(secret.as_bytes()))
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())?;
        Ok(token_data.claims)
    }

    pub fn is_privileged(&self) -> bool {
        self.role == Role::Librarian
    }

    pub fn require_librarian(&self) -> Result<(), AppError> {
        if self.is_privileged() {
            Ok(())
        } else {
            Err(AppError::Authorization("Librarian privileges required".to_string()))
        }
    }

    /// Librarians may act on any member, member accounts only on their own record
    pub fn can_access_member(&self, member_id: i32) -> bool {
        self.is_privileged() || self.member_id == Some(member_id)
    }

    pub fn require_member_access(&self, member_id: i32) -> Result<(), AppError> {
        if self.can_access_member(member_id) {
            Ok(())
        } else {
            Err(AppError::Authorization("Access to this member is not allowed".to_string()))
        }
    }
}
