use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::Claims;
use crate::config::AuthConfig;

/// Security errors for authentication and token operations
#[derive(Debug, Error, PartialEq)]
pub enum SecurityError {
    /// JWT validation error
    #[error("Token validation error: {0}")]
    TokenValidation(String),

    /// Expired token
    #[error("Token has expired")]
    TokenExpired,

    /// Invalid token structure
    #[error("Invalid token format")]
    InvalidToken,

    /// Invalid issuer
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// A refresh token presented where an access token is needed, or the reverse
    #[error("Expected a {expected} token")]
    WrongTokenType { expected: TokenType },

    /// Token could not be signed
    #[error("Failed to encode token: {0}")]
    Encoding(String),
}

/// Token types for authentication
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived access token
    Access,
    /// Long-lived refresh token
    Refresh,
}

impl std::fmt::Display for TokenType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenType::Access => write!(f, "access"),
            TokenType::Refresh => write!(f, "refresh"),
        }
    }
}

/// Issues and checks HS256 tokens with a fixed secret and issuer
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    access_lifetime: Duration,
    refresh_lifetime: Duration,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.issuer)
            .field("access_lifetime", &self.access_lifetime)
            .field("refresh_lifetime", &self.refresh_lifetime)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.issuer.clone(),
            access_lifetime: Duration::minutes(config.access_token_minutes),
            refresh_lifetime: Duration::days(config.refresh_token_days),
        }
    }

    /// Lifetime of a token of the given type
    pub fn lifetime(&self, token_type: TokenType) -> Duration {
        match token_type {
            TokenType::Access => self.access_lifetime,
            TokenType::Refresh => self.refresh_lifetime,
        }
    }

    /// Sign a new token for `subject`
    pub fn generate_token(&self, subject: &str, token_type: TokenType) -> Result<String, SecurityError> {
        let now = Utc::now();
        let expiration = now + self.lifetime(token_type);

        let claims = Claims {
            sub: subject.to_string(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            token_type,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to encode JWT token: {}", e);
            SecurityError::Encoding(e.to_string())
        })?;

        debug!("Generated {} token for {} expiring at {}", token_type, subject, expiration);

        Ok(token)
    }

    /// Decode a token and check its signature, issuer and expiry
    pub fn validate_token(&self, token: &str) -> Result<Claims, SecurityError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[self.issuer.as_str()]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => SecurityError::TokenExpired,
                jsonwebtoken::errors::ErrorKind::InvalidToken => SecurityError::InvalidToken,
                jsonwebtoken::errors::ErrorKind::InvalidIssuer => SecurityError::InvalidIssuer,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                    SecurityError::TokenValidation("Invalid signature".to_string())
                }
                _ => SecurityError::TokenValidation(e.to_string()),
            }
        })?;

        Ok(token_data.claims)
    }

    /// Validate a token and require a specific type
    pub fn validate_typed(&self, token: &str, expected: TokenType) -> Result<Claims, SecurityError> {
        let claims = self.validate_token(token)?;
        if claims.token_type != expected {
            return Err(SecurityError::WrongTokenType { expected });
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new(&AuthConfig {
            jwt_secret: "test_secret_key_for_testing_only".to_string(),
            issuer: "test-issuer".to_string(),
            access_token_minutes: 30,
            refresh_token_days: 7,
            bcrypt_cost: 4,
        })
    }

    #[test]
    fn test_generate_and_validate_token() {
        let manager = manager();

        let token = manager.generate_token("maria", TokenType::Access).unwrap();
        assert!(!token.is_empty());

        let claims = manager.validate_token(&token).unwrap();
        assert_eq!(claims.sub, "maria");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn test_token_expiration() {
        let manager = manager();

        let claims = Claims {
            sub: "maria".to_string(),
            iss: "test-issuer".to_string(),
            iat: Utc::now().timestamp() - 7200,
            exp: Utc::now().timestamp() - 3600,
            token_type: TokenType::Access,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test_secret_key_for_testing_only"),
        )
        .unwrap();

        assert_eq!(manager.validate_token(&token), Err(SecurityError::TokenExpired));
    }

    #[test]
    fn test_invalid_token() {
        let result = manager().validate_token("invalid.token.format");

        match result {
            Err(SecurityError::InvalidToken) | Err(SecurityError::TokenValidation(_)) => {}
            other => panic!("Expected InvalidToken or TokenValidation error, got {:?}", other),
        }
    }

    #[test]
    fn test_foreign_secret_rejected() {
        let other = TokenManager::new(&AuthConfig {
            jwt_secret: "another-secret".to_string(),
            issuer: "test-issuer".to_string(),
            ..AuthConfig::default()
        });
        let token = other.generate_token("maria", TokenType::Access).unwrap();

        assert!(manager().validate_token(&token).is_err());
    }

    #[test]
    fn test_wrong_issuer_rejected() {
        let other = TokenManager::new(&AuthConfig {
            jwt_secret: "test_secret_key_for_testing_only".to_string(),
            issuer: "someone-else".to_string(),
            ..AuthConfig::default()
        });
        let token = other.generate_token("maria", TokenType::Access).unwrap();

        assert_eq!(manager().validate_token(&token), Err(SecurityError::InvalidIssuer));
    }

    #[test]
    fn test_typed_validation() {
        let manager = manager();
        let refresh = manager.generate_token("maria", TokenType::Refresh).unwrap();

        assert!(manager.validate_typed(&refresh, TokenType::Refresh).is_ok());
        assert_eq!(
            manager.validate_typed(&refresh, TokenType::Access),
            Err(SecurityError::WrongTokenType { expected: TokenType::Access })
        );
    }

    #[test]
    fn test_lifetimes() {
        let manager = manager();
        assert_eq!(manager.lifetime(TokenType::Access), Duration::minutes(30));
        assert_eq!(manager.lifetime(TokenType::Refresh), Duration::days(7));
    }
}
