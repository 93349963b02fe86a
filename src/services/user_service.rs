use chrono::{Duration, Utc};
use serde::Deserialize;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use validator::Validate;

use crate::auth::{hash_password, hash_reset_token};
use crate::database::models::{Role, User};
use crate::database::{Repository, Resource};
use crate::error::ApiError;
use crate::services::required;

/// Account payload for self-registration and admin creation
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUser {
    #[validate(required(message = "Please add a name"), length(min = 1, message = "Please add a name"))]
    pub name: Option<String>,
    #[validate(required(message = "Please add an email"), email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[validate(
        required(message = "Please add a password"),
        length(min = 6, message = "Password must be at least 6 characters")
    )]
    pub password: Option<String>,
    pub role: Option<Role>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateDetails {
    #[validate(length(min = 1, message = "Please add a name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
}

/// Admin update; passwords only change through the auth routes
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUser {
    #[validate(length(min = 1, message = "Please add a name"))]
    pub name: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    pub role: Option<Role>,
}

pub struct UserService {
    pool: PgPool,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(pool: &PgPool, bcrypt_cost: u32) -> Self {
        Self {
            pool: pool.clone(),
            bcrypt_cost,
        }
    }

    /// Self-registration may only pick `user` or `publisher`
    pub async fn register(&self, input: CreateUser) -> Result<User, ApiError> {
        if input.role == Some(Role::Admin) {
            return Err(ApiError::validation(vec![
                "Role must be either user or publisher".to_string(),
            ]));
        }
        self.create(input).await
    }

    pub async fn create(&self, input: CreateUser) -> Result<User, ApiError> {
        let name = required(input.name, "Please add a name")?;
        let email = required(input.email, "Please add an email")?;
        let password = required(input.password, "Please add a password")?;
        let role = input.role.unwrap_or_default();

        let hashed = hash_password(password, self.bcrypt_cost).await?;

        let query = format!(
            "INSERT INTO users (id, name, email, role, password) VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            User::COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(Uuid::new_v4())
            .bind(name.trim())
            .bind(email.trim())
            .bind(role.as_str())
            .bind(hashed)
            .fetch_one(&self.pool)
            .await?;

        tracing::info!("User {} created with role {}", user.id, user.role);
        Ok(user)
    }

    pub async fn get(&self, id: Uuid) -> Result<User, ApiError> {
        Ok(Repository::<User>::new(&self.pool).select_404(id).await?)
    }

    pub async fn find(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(Repository::<User>::new(&self.pool).select_optional(id).await?)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, ApiError> {
        let query = format!("SELECT {} FROM users WHERE email = $1", User::COLUMNS);
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn update_details(&self, id: Uuid, input: UpdateDetails) -> Result<User, ApiError> {
        self.update(
            id,
            UpdateUser {
                name: input.name,
                email: input.email,
                role: None,
            },
        )
        .await
    }

    pub async fn update(&self, id: Uuid, input: UpdateUser) -> Result<User, ApiError> {
        let mut qb = sqlx::QueryBuilder::<Postgres>::new("UPDATE users SET ");
        let mut sets = qb.separated(", ");
        let mut changed = false;

        if let Some(name) = input.name {
            sets.push("name = ").push_bind_unseparated(name.trim().to_string());
            changed = true;
        }
        if let Some(email) = input.email {
            sets.push("email = ").push_bind_unseparated(email.trim().to_string());
            changed = true;
        }
        if let Some(role) = input.role {
            sets.push("role = ").push_bind_unseparated(role.as_str());
            changed = true;
        }

        if !changed {
            return self.get(id).await;
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(User::COLUMNS);
        qb.build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("No {} found with the id of {}", User::LABEL, id)))
    }

    /// Store a new password hash and drop any pending reset token
    pub async fn set_password(&self, id: Uuid, password: String) -> Result<(), ApiError> {
        let hashed = hash_password(password, self.bcrypt_cost).await?;
        sqlx::query(
            "UPDATE users SET password = $1, reset_password_token = NULL, reset_password_expire = NULL \
             WHERE id = $2",
        )
        .bind(hashed)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn set_reset_token(&self, id: Uuid, hashed: &str, expiry_minutes: i64) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET reset_password_token = $1, reset_password_expire = $2 WHERE id = $3")
            .bind(hashed)
            .bind(Utc::now() + Duration::minutes(expiry_minutes))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn clear_reset_token(&self, id: Uuid) -> Result<(), ApiError> {
        sqlx::query("UPDATE users SET reset_password_token = NULL, reset_password_expire = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// The user holding this emailed token, if it has not expired
    pub async fn find_by_reset_token(&self, token: &str) -> Result<Option<User>, ApiError> {
        let query = format!(
            "SELECT {} FROM users WHERE reset_password_token = $1 AND reset_password_expire > now()",
            User::COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(hash_reset_token(token))
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let deleted = Repository::<User>::new(&self.pool).delete(id).await?;
        if deleted == 0 {
            return Err(ApiError::not_found(format!(
                "No {} found with the id of {}",
                User::LABEL,
                id
            )));
        }
        tracing::info!("User {} deleted", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn short_passwords_and_bad_emails_fail_validation() {
        let input: CreateUser = serde_json::from_value(json!({
            "name": "John Doe",
            "email": "not-an-email",
            "password": "123"
        }))
        .unwrap();
        let err: ApiError = input.validate().unwrap_err().into();
        assert_eq!(
            err.to_json()["error"],
            json!(["Please add a valid email", "Password must be at least 6 characters"])
        );
    }

    #[test]
    fn role_parses_from_lowercase() {
        let input: CreateUser = serde_json::from_value(json!({
            "name": "Jane",
            "email": "jane@gmail.com",
            "password": "123456",
            "role": "publisher"
        }))
        .unwrap();
        assert!(input.validate().is_ok());
        assert_eq!(input.role, Some(Role::Publisher));
    }
}
