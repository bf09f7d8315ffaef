use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Storage model for a user account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,

    /// Login email, unique
    pub email: String,

    /// Login name, unique
    pub username: String,

    pub full_name: Option<String>,

    /// Salted password hash, never the password itself
    pub hashed_password: String,

    pub is_active: bool,

    pub is_admin: bool,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input data for storing a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub hashed_password: String,
}

impl NewUser {
    /// New accounts start active and without admin rights
    pub fn into_record(self, now: DateTime<Utc>) -> UserRecord {
        UserRecord {
            id: Uuid::new_v4(),
            email: self.email,
            username: self.username,
            full_name: self.full_name,
            hashed_password: self.hashed_password,
            is_active: true,
            is_admin: false,
            created_at: now,
            updated_at: now,
        }
    }
}
