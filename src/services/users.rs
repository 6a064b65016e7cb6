//! Account service: credentials, tokens, registration, bootstrap

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;
use validator::Validate;

use crate::{
    config::{AuthConfig, BootstrapConfig},
    error::{AppError, AppResult},
    models::user::{RegisterRequest, Role, UpdateUser, User, UserClaims},
    repository::Repository,
};

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username/password and return a bearer token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<(String, User)> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| {
                AppError::Authentication("Invalid username or password".to_string())
            })?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        let token = self.create_token_for_user(&user)?;
        Ok((token, user))
    }

    fn create_token_for_user(&self, user: &User) -> AppResult<String> {
        let issued_at = Utc::now().timestamp();
        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            role: user.role,
            exp: issued_at + self.config.jwt_expiration_hours as i64 * 3600,
            iat: issued_at,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Token signing failed: {}", e)))
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password_hash)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Argon2 hash with a fresh random salt
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
    }

    /// Register a new patron account. The role is fixed server-side;
    /// librarian accounts are provisioned via bootstrap.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<User> {
        request.validate()?;

        if self.repository.users.username_exists(&request.username).await? {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if self.repository.users.email_exists(&request.email).await? {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }

        let password_hash = self.hash_password(&request.password)?;
        self.repository
            .users
            .create(&request.username, &request.email, &password_hash, Role::Patron)
            .await
    }

    /// Get user by ID
    pub async fn get_by_id(&self, id: i32) -> AppResult<User> {
        self.repository.users.get_by_id(id).await
    }

    /// Update an account; a new password is hashed before it is stored
    pub async fn update_user(&self, id: i32, request: UpdateUser) -> AppResult<User> {
        request.validate()?;

        let current = self.repository.users.get_by_id(id).await?;

        if let Some(username) = request.username.as_deref() {
            if username != current.username
                && self.repository.users.username_exists(username).await?
            {
                return Err(AppError::Conflict("Username already taken".to_string()));
            }
        }
        if let Some(email) = request.email.as_deref() {
            if email != current.email && self.repository.users.email_exists(email).await? {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
        }

        let password_hash = match request.password.as_deref() {
            Some(password) => Some(self.hash_password(password)?),
            None => None,
        };

        self.repository
            .users
            .update(
                id,
                request.username.as_deref(),
                request.email.as_deref(),
                password_hash.as_deref(),
            )
            .await
    }

    /// Delete a user. Rejected while the user holds an active loan;
    /// completed history is preserved with the user reference nulled.
    pub async fn delete_user(&self, id: i32) -> AppResult<()> {
        self.repository.users.get_by_id(id).await?;

        if self.repository.users.has_active_loans(id).await? {
            return Err(AppError::Conflict(
                "User has outstanding loans".to_string(),
            ));
        }

        self.repository.users.delete(id).await
    }

    /// Create the initial librarian account when none exists yet
    pub async fn ensure_admin(&self, bootstrap: &BootstrapConfig) -> AppResult<()> {
        if self.repository.users.librarian_exists().await? {
            return Ok(());
        }

        let password_hash = self.hash_password(&bootstrap.admin_password)?;
        let admin = self
            .repository
            .users
            .create(
                &bootstrap.admin_username,
                &bootstrap.admin_email,
                &password_hash,
                Role::Librarian,
            )
            .await?;

        tracing::info!("Created bootstrap librarian account '{}'", admin.username);
        Ok(())
    }
}
