use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};
use validator::Validate;

use patient_registry_data::models::{NewUser, UserRecord};
use patient_registry_data::repository::{RepositoryError, UserRepository, UserRepositoryTrait};

use crate::auth::logging::{log_auth_event, log_failed_login, log_token_refresh, AuthEvent, AuthEventType};
use crate::auth::password::{hash_password, verify_password, PasswordError};
use crate::auth::{SecurityError, TokenManager, TokenType};
use crate::entities::conversions::convert_to_user_response;
use crate::entities::user::{LoginRequest, RegisterRequest, TokenPair, TokenVerification, UserResponse};
use crate::validation::format_validation_errors;

/// Account and token errors
#[derive(Debug, Error, PartialEq)]
pub enum AuthServiceError {
    /// Validation error
    #[error("{0}")]
    Validation(String),

    #[error("Email already registered")]
    EmailTaken,

    #[error("Username already taken")]
    UsernameTaken,

    /// Unknown user or wrong password
    #[error("Incorrect username or password")]
    InvalidCredentials,

    /// Bad, expired or wrongly typed token, or its user is gone
    #[error("Could not validate credentials")]
    InvalidToken,

    /// Token rejected by the verify endpoint
    #[error("Invalid token")]
    TokenRejected,

    #[error("Inactive user")]
    InactiveUser,

    /// Token could not be issued
    #[error("Token error: {0}")]
    Token(String),

    /// Password could not be hashed or checked
    #[error("Password error: {0}")]
    Password(String),

    /// Repository error
    #[error("Repository error: {0}")]
    Repository(String),
}

impl From<RepositoryError> for AuthServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict { field: "email", .. } => AuthServiceError::EmailTaken,
            RepositoryError::Conflict { field: "username", .. } => AuthServiceError::UsernameTaken,
            other => {
                error!("User repository failure: {}", other);
                AuthServiceError::Repository(other.to_string())
            }
        }
    }
}

impl From<PasswordError> for AuthServiceError {
    fn from(err: PasswordError) -> Self {
        error!("Password hashing failed: {}", err);
        AuthServiceError::Password(err.to_string())
    }
}

impl From<SecurityError> for AuthServiceError {
    fn from(err: SecurityError) -> Self {
        error!("Token issuing failed: {}", err);
        AuthServiceError::Token(err.to_string())
    }
}

/// Trait for account and token lifecycle operations
#[async_trait]
pub trait UserServiceTrait {
    /// Create an account
    async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AuthServiceError>;

    /// Check a password and issue a token pair
    async fn login(&self, request: LoginRequest) -> Result<TokenPair, AuthServiceError>;

    /// Trade a refresh token for a new pair
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthServiceError>;

    /// Account behind an access token
    async fn current_user(&self, access_token: &str) -> Result<UserResponse, AuthServiceError>;

    /// Report whether a token is valid and whose it is
    async fn verify(&self, token: &str) -> Result<TokenVerification, AuthServiceError>;
}

/// Account service backed by a user repository
pub struct UserService<R: UserRepositoryTrait> {
    repository: R,
    tokens: Arc<TokenManager>,
    password_cost: u32,
}

impl<R: UserRepositoryTrait> UserService<R> {
    pub fn new(repository: R, tokens: Arc<TokenManager>, password_cost: u32) -> Self {
        Self {
            repository,
            tokens,
            password_cost,
        }
    }

    fn issue_pair(&self, username: &str) -> Result<TokenPair, AuthServiceError> {
        Ok(TokenPair::bearer(
            self.tokens.generate_token(username, TokenType::Access)?,
            self.tokens.generate_token(username, TokenType::Refresh)?,
        ))
    }

    /// Resolve a token of the expected type to its stored user
    async fn user_for_token(&self, token: &str, expected: TokenType) -> Result<UserRecord, AuthServiceError> {
        let claims = self.tokens.validate_typed(token, expected).map_err(|e| {
            debug!("Rejected {} token: {}", expected, e);
            AuthServiceError::InvalidToken
        })?;

        self.repository
            .get_by_username(&claims.sub)
            .await?
            .ok_or(AuthServiceError::InvalidToken)
    }
}

#[async_trait]
impl<R: UserRepositoryTrait + Send + Sync> UserServiceTrait for UserService<R> {
    async fn register(&self, request: RegisterRequest) -> Result<UserResponse, AuthServiceError> {
        request
            .validate()
            .map_err(|e| AuthServiceError::Validation(format_validation_errors(&e)))?;

        if self.repository.get_by_email(&request.email).await?.is_some() {
            warn!("Registration with taken email");
            return Err(AuthServiceError::EmailTaken);
        }
        if self.repository.get_by_username(&request.username).await?.is_some() {
            warn!("Registration with taken username: {}", request.username);
            return Err(AuthServiceError::UsernameTaken);
        }

        let hashed_password = hash_password(request.password, self.password_cost).await?;
        let user = self
            .repository
            .create(NewUser {
                email: request.email,
                username: request.username,
                full_name: request.full_name,
                hashed_password,
            })
            .await?;

        info!("New user registered: {}", user.username);
        log_auth_event(
            AuthEvent::new(AuthEventType::Registration, Some(&user.username), true)
                .with_auth_method("password"),
        );

        Ok(convert_to_user_response(user))
    }

    async fn login(&self, request: LoginRequest) -> Result<TokenPair, AuthServiceError> {
        let start_time = Instant::now();

        let user = self.repository.get_by_username(&request.username).await?;
        let verified = match &user {
            Some(user) => verify_password(request.password, user.hashed_password.clone()).await?,
            None => false,
        };
        let Some(user) = user.filter(|_| verified) else {
            log_failed_login(&request.username, "Incorrect username or password");
            return Err(AuthServiceError::InvalidCredentials);
        };

        let pair = self.issue_pair(&user.username)?;

        info!("User logged in: {}", user.username);
        log_auth_event(
            AuthEvent::new(AuthEventType::Login, Some(&user.username), true)
                .with_duration(start_time.elapsed().as_millis() as u64)
                .with_auth_method("password"),
        );

        Ok(pair)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthServiceError> {
        let user = match self.user_for_token(refresh_token, TokenType::Refresh).await {
            Ok(user) => user,
            Err(e) => {
                log_token_refresh(None, false, Some(&e.to_string()));
                return Err(e);
            }
        };

        let pair = self.issue_pair(&user.username)?;
        log_token_refresh(Some(&user.username), true, None);

        Ok(pair)
    }

    async fn current_user(&self, access_token: &str) -> Result<UserResponse, AuthServiceError> {
        let user = self.user_for_token(access_token, TokenType::Access).await?;
        if !user.is_active {
            return Err(AuthServiceError::InactiveUser);
        }
        Ok(convert_to_user_response(user))
    }

    async fn verify(&self, token: &str) -> Result<TokenVerification, AuthServiceError> {
        let event = AuthEvent::new(AuthEventType::TokenValidation, None, false).with_resource("/auth/verify");

        match self.tokens.validate_token(token) {
            Ok(claims) => {
                log_auth_event(AuthEvent {
                    username: Some(claims.sub.clone()),
                    success: true,
                    ..event
                });
                Ok(TokenVerification {
                    valid: true,
                    username: claims.sub,
                })
            }
            Err(e) => {
                log_auth_event(event.with_details(e.to_string()));
                Err(AuthServiceError::TokenRejected)
            }
        }
    }
}

/// Create the default user service over a shared repository
pub fn create_user_service(
    repository: UserRepository,
    tokens: Arc<TokenManager>,
    password_cost: u32,
) -> impl UserServiceTrait + Send + Sync {
    UserService::new(repository, tokens, password_cost)
}
