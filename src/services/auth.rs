//! Authentication and account management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    models::account::{Account, AccountClaims, CreateAccount, LoginRequest, LoginResponse, Role},
    repository::Repository,
};

#[derive(Clone)]
pub struct AuthService {
    repository: Repository,
    config: AuthConfig,
}

impl AuthService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by login and password and return a JWT token
    pub async fn login(&self, request: &LoginRequest) -> AppResult<LoginResponse> {
        let account = match self.repository.accounts.get_by_login(&request.login).await? {
            Some(account) if verify_password(&account.password, &request.password)? => account,
            _ => {
                tracing::warn!("Failed login attempt for {}", request.login);
                return Err(AppError::Authentication("Invalid login or password".to_string()));
            }
        };

        if let Some(expected) = request.role {
            if expected != account.role {
                tracing::warn!("Login {} refused: account is not a {} account", account.login, expected);
                return Err(AppError::Authentication(format!("This account is not a {} account", expected)));
            }
        }

        let expires_in = self.config.jwt_expiration_hours as i64 * 3600;
        let token = self.create_token(&account, expires_in)?;
        tracing::info!("Account {} logged in as {}", account.login, account.role);

        Ok(LoginResponse {
            token,
            token_type: "Bearer".to_string(),
            expires_in,
            account,
        })
    }

    fn create_token(&self, account: &Account, expires_in: i64) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let claims = AccountClaims {
            sub: account.login.clone(),
            account_id: account.id,
            role: account.role,
            member_id: account.member_id,
            exp: now + expires_in,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Get account by ID
    pub async fn get_account(&self, id: i32) -> AppResult<Account> {
        self.repository.accounts.get_by_id(id).await
    }

    /// Create an account. Member accounts must reference an existing member.
    pub async fn create_account(&self, account: CreateAccount) -> AppResult<Account> {
        account.validate()?;

        let member_id = match (account.role, account.member_id) {
            (Role::Member, Some(member_id)) => {
                self.repository.members.get_by_id(member_id).await?;
                Some(member_id)
            }
            (Role::Member, None) => {
                return Err(AppError::Validation("A member account needs a member_id".to_string()));
            }
            (Role::Librarian, Some(_)) => {
                return Err(AppError::Validation(
                    "A librarian account cannot be linked to a member".to_string(),
                ));
            }
            (Role::Librarian, None) => None,
        };

        if self.repository.accounts.login_exists(&account.login).await? {
            return Err(AppError::Conflict(format!("Login {} is already taken", account.login)));
        }

        let hash = hash_password(&account.password)?;
        let created = self
            .repository
            .accounts
            .create(&account.login, &hash, account.role, member_id)
            .await?;
        tracing::info!("Account {} created with role {}", created.login, created.role);
        Ok(created)
    }

    /// Create the configured librarian account when it does not exist yet
    pub async fn ensure_bootstrap_librarian(&self) -> AppResult<()> {
        let (Some(login), Some(password)) = (&self.config.bootstrap_login, &self.config.bootstrap_password) else {
            return Ok(());
        };

        if self.repository.accounts.login_exists(login).await? {
            return Ok(());
        }

        let hash = hash_password(password)?;
        self.repository.accounts.create(login, &hash, Role::Librarian, None).await?;
        tracing::info!("Bootstrap librarian account {} created", login);
        Ok(())
    }
}

/// Hash a password with argon2, PHC string format
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let hash = hash_password("s3cret").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "s3cret").unwrap());
        assert!(!verify_password(&hash, "wrong").unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn test_malformed_hash_is_an_internal_error() {
        assert!(matches!(verify_password("plain", "plain"), Err(AppError::Internal(_))));
    }
}
