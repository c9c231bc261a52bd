//! User service - account owners

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::{NewUser, User};
use crate::ports::LedgerStore;

pub struct UserService<S: LedgerStore> {
    store: Arc<S>,
}

impl<S: LedgerStore> UserService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn create_user(&self, fields: NewUser) -> Result<Uuid> {
        let user = User::from_new(Uuid::new_v4(), fields.validate()?);
        self.store.run_atomic(|tx| tx.insert_user(&user))?;
        tracing::info!(user_id = %user.id, "User created");
        Ok(user.id)
    }

    pub fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.store
            .run_atomic(|tx| tx.get_user(user_id))?
            .ok_or_else(|| Error::not_found(format!("user {}", user_id)))
    }

    /// Replace the display fields of a user
    pub fn update_user(&self, user_id: Uuid, fields: NewUser) -> Result<User> {
        let user = User::from_new(user_id, fields.validate()?);
        let updated = self.store.run_atomic(|tx| tx.update_user(&user))?;
        if !updated {
            return Err(Error::not_found(format!("user {}", user_id)));
        }
        tracing::info!(user_id = %user_id, "User updated");
        Ok(user)
    }

    /// Delete a user that no longer owns any account
    pub fn delete_user(&self, user_id: Uuid) -> Result<Uuid> {
        self.store.run_atomic(|tx| {
            if tx.get_user(user_id)?.is_none() {
                return Err(Error::not_found(format!("user {}", user_id)));
            }
            let owned = tx.accounts_for_user(user_id)?.len();
            if owned > 0 {
                return Err(Error::invalid(format!(
                    "user {} still owns {} account(s)",
                    user_id, owned
                )));
            }
            tx.delete_user(user_id)?;
            Ok(())
        })?;
        tracing::info!(user_id = %user_id, "User deleted");
        Ok(user_id)
    }
}
