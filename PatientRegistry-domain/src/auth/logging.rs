use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Types of authentication events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthEventType {
    /// Account created
    Registration,
    /// Successful login
    Login,
    /// Failed login attempt
    FailedLogin,
    /// Token pair rotated
    TokenRefresh,
    /// Bearer token checked by the middleware or the verify endpoint
    TokenValidation,
}

impl std::fmt::Display for AuthEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthEventType::Registration => write!(f, "REGISTRATION"),
            AuthEventType::Login => write!(f, "LOGIN"),
            AuthEventType::FailedLogin => write!(f, "FAILED_LOGIN"),
            AuthEventType::TokenRefresh => write!(f, "TOKEN_REFRESH"),
            AuthEventType::TokenValidation => write!(f, "TOKEN_VALIDATION"),
        }
    }
}

/// Authentication event record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthEvent {
    pub event_type: AuthEventType,
    /// Username, when known
    pub username: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub details: Option<String>,
    /// Request path the event relates to
    pub resource: Option<String>,
    pub duration_ms: Option<u64>,
    /// password, access_token, refresh_token
    pub auth_method: Option<String>,
}

impl AuthEvent {
    pub fn new(event_type: AuthEventType, username: Option<&str>, success: bool) -> Self {
        Self {
            event_type,
            username: username.map(String::from),
            timestamp: Utc::now(),
            success,
            details: None,
            resource: None,
            duration_ms: None,
            auth_method: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_auth_method(mut self, auth_method: impl Into<String>) -> Self {
        self.auth_method = Some(auth_method.into());
        self
    }
}

/// Emit an authentication event as a structured log line
pub fn log_auth_event(event: AuthEvent) {
    let username = event.username.as_deref().unwrap_or("anonymous");
    let details = event.details.as_deref().unwrap_or("");
    let resource = event.resource.as_deref().unwrap_or("");
    let method = event.auth_method.as_deref().unwrap_or("");

    if event.success {
        info!(
            event_type = %event.event_type,
            username,
            resource,
            auth_method = method,
            duration_ms = event.duration_ms,
            "AUTH-LOG [{}] [{}] [SUCCESS] {}",
            event.event_type,
            username,
            details
        );
    } else {
        warn!(
            event_type = %event.event_type,
            username,
            resource,
            auth_method = method,
            duration_ms = event.duration_ms,
            "AUTH-LOG [{}] [{}] [FAILURE] {}",
            event.event_type,
            username,
            details
        );
    }
}

/// Log a failed login attempt
pub fn log_failed_login(username: &str, reason: &str) {
    let event = AuthEvent::new(AuthEventType::FailedLogin, Some(username), false)
        .with_details(reason)
        .with_auth_method("password");

    log_auth_event(event);
}

/// Log a token refresh
pub fn log_token_refresh(username: Option<&str>, success: bool, details: Option<&str>) {
    let mut event = AuthEvent::new(AuthEventType::TokenRefresh, username, success)
        .with_auth_method("refresh_token");

    if let Some(d) = details {
        event = event.with_details(d);
    }

    log_auth_event(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_auth_event() {
        let event = AuthEvent::new(AuthEventType::Login, Some("maria"), true)
            .with_details("Login successful")
            .with_resource("/auth/login")
            .with_duration(12)
            .with_auth_method("password");

        assert_eq!(event.event_type, AuthEventType::Login);
        assert_eq!(event.username.as_deref(), Some("maria"));
        assert!(event.success);
        assert_eq!(event.resource.as_deref(), Some("/auth/login"));
        assert_eq!(event.duration_ms, Some(12));
        assert_eq!(event.auth_method.as_deref(), Some("password"));
    }

    #[test]
    fn test_event_type_display() {
        assert_eq!(AuthEventType::Registration.to_string(), "REGISTRATION");
        assert_eq!(AuthEventType::FailedLogin.to_string(), "FAILED_LOGIN");
        assert_eq!(AuthEventType::TokenValidation.to_string(), "TOKEN_VALIDATION");
    }
}
