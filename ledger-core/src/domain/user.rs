//! User domain model

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::result::{Error, Result};

/// Longest value accepted for any user field
const MAX_FIELD_LEN: usize = 50;

/// The owner of zero or more accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

/// Display fields supplied when creating or updating a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl NewUser {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
        }
    }

    /// Trim every field and check it is non-empty and short enough
    pub fn validate(&self) -> Result<NewUser> {
        let check = |name: &str, value: &str| -> Result<String> {
            let value = value.trim();
            if value.is_empty() {
                return Err(Error::invalid(format!("{} cannot be empty", name)));
            }
            if value.chars().count() > MAX_FIELD_LEN {
                return Err(Error::invalid(format!(
                    "{} cannot exceed {} characters",
                    name, MAX_FIELD_LEN
                )));
            }
            Ok(value.to_string())
        };

        Ok(NewUser {
            first_name: check("first name", &self.first_name)?,
            last_name: check("last name", &self.last_name)?,
            email: check("email", &self.email)?,
        })
    }
}

impl User {
    pub fn from_new(id: Uuid, fields: NewUser) -> Self {
        Self {
            id,
            first_name: fields.first_name,
            last_name: fields.last_name,
            email: fields.email,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_creation() {
        let fields = NewUser::new(" Ada ", "Lovelace", "ada@example.com")
            .validate()
            .unwrap();
        let user = User::from_new(Uuid::new_v4(), fields);
        assert_eq!(user.first_name, "Ada");
        assert_eq!(user.email, "ada@example.com");
    }

    #[test]
    fn test_user_validation() {
        assert!(NewUser::new("", "x", "y").validate().is_err());
        assert!(NewUser::new("x", "x", "e".repeat(51)).validate().is_err());
    }
}
