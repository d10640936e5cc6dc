use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "roles", rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Doctor => "doctor",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "gender_enum", rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
    Other,
}

/// Base identity shared by every role.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub gender: Gender,
    pub phone_number: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Builds a fresh identity with a time-ordered id.
    pub fn new(
        password_hash: String,
        first_name: String,
        last_name: String,
        gender: Gender,
        phone_number: String,
        role: Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            password: password_hash,
            first_name,
            last_name,
            gender,
            phone_number,
            role,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Patient extension row, keyed by the owning user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Patient {
    pub user_id: Uuid,
    pub hospital_id: String,
    pub birth_date: Option<NaiveDate>,
    pub id_card_number: Option<String>,
    pub address: Option<String>,
    pub allergies: Option<String>,
    pub emergency_contact: Option<String>,
    pub blood_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Patient {
    pub fn new(user_id: Uuid, hospital_id: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            hospital_id,
            birth_date: None,
            id_card_number: None,
            address: None,
            allergies: None,
            emergency_contact: None,
            blood_type: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Doctor extension row, keyed by the owning user's id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Doctor {
    pub user_id: Uuid,
    pub username: String,
    pub specialty: Option<String>,
    pub bio: Option<String>,
    pub years_experience: Option<i32>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Doctor {
    pub fn new(user_id: Uuid, username: String) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            username,
            specialty: None,
            bio: None,
            years_experience: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_is_never_serialized() {
        let user = User::new(
            "$argon2id$v=19$secret".to_string(),
            "Ada".to_string(),
            "Lovelace".to_string(),
            Gender::Female,
            "0800000000".to_string(),
            Role::Patient,
        );
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["role"], "patient");
        assert_eq!(json["gender"], "female");
    }

    #[test]
    fn test_user_ids_are_v7() {
        let first = User::new(String::new(), "a".into(), "b".into(), Gender::Other, String::new(), Role::Doctor);
        let second = User::new(String::new(), "a".into(), "b".into(), Gender::Other, String::new(), Role::Doctor);
        assert_eq!(first.id.get_version_num(), 7);
        assert_ne!(first.id, second.id);
    }
}
