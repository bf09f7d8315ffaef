use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::user::{NewUser, UserRecord};
use super::errors::RepositoryError;
use super::in_memory::InMemoryStorage;

/// Repository trait for user accounts
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait UserRepositoryTrait {
    /// Store a new user. Fails with a conflict when the email or username is taken.
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError>;

    /// Get a user by ID
    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError>;

    /// Get a user by username
    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Get a user by email
    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError>;

    /// Number of stored users
    async fn count(&self) -> Result<usize, RepositoryError>;
}

/// Repository for user accounts backed by in-memory storage
#[derive(Debug, Clone, Default)]
pub struct UserRepository {
    storage: InMemoryStorage<UserRecord>,
}

impl UserRepository {
    /// Create a new repository
    pub fn new() -> Self {
        Self {
            storage: InMemoryStorage::new(),
        }
    }
}

#[async_trait]
impl UserRepositoryTrait for UserRepository {
    async fn create(&self, user: NewUser) -> Result<UserRecord, RepositoryError> {
        let record = user.into_record(Utc::now());
        debug!("Storing user: {}", record.username);

        let email = record.email.clone();
        let username = record.username.clone();
        self.storage.insert_unique(record.id, record, |existing| {
            if existing.email == email {
                Some(RepositoryError::conflict("email", email.as_str()))
            } else if existing.username == username {
                Some(RepositoryError::conflict("username", username.as_str()))
            } else {
                None
            }
        })
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepositoryError> {
        self.storage.get(&id)
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<UserRecord>, RepositoryError> {
        debug!("Getting user by username: {}", username);
        self.storage.find(|user| user.username == username)
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepositoryError> {
        self.storage.find(|user| user.email == email)
    }

    async fn count(&self) -> Result<usize, RepositoryError> {
        self.storage.count()
    }
}
