use uuid::Uuid;

use crate::database::models::User;
use crate::error::ApiError;

pub mod advanced_results;
pub mod bootcamp_service;
pub mod course_service;
pub mod geocoder;
pub mod mailer;
pub mod review_service;
pub mod user_service;

pub use advanced_results::{advanced_results, Populate};
pub use bootcamp_service::{BootcampService, UploadedFile};
pub use course_service::CourseService;
pub use geocoder::{Geocoder, MapQuestGeocoder, StaticGeocoder};
pub use mailer::{Email, Mailer, RecordingMailer, SmtpMailer};
pub use review_service::ReviewService;
pub use user_service::UserService;

/// Only the owning user or an admin may touch a record
pub fn ensure_owner(user: &User, owner_id: Uuid, action: &str, label: &str) -> Result<(), ApiError> {
    if user.id == owner_id || user.is_admin() {
        return Ok(());
    }
    Err(ApiError::forbidden(format!(
        "User {} is not authorized to {} this {}",
        user.id, action, label
    )))
}

/// Unwrap a payload field that validation has already marked required
pub(crate) fn required<T>(value: Option<T>, message: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::validation(vec![message.to_string()]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Role;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Test".to_string(),
            email: "test@example.com".to_string(),
            role,
            password: String::new(),
            reset_password_token: None,
            reset_password_expire: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn owners_and_admins_pass() {
        let publisher = user(Role::Publisher);
        assert!(ensure_owner(&publisher, publisher.id, "update", "bootcamp").is_ok());
        assert!(ensure_owner(&user(Role::Admin), publisher.id, "update", "bootcamp").is_ok());
    }

    #[test]
    fn strangers_are_forbidden() {
        let stranger = user(Role::Publisher);
        let err = ensure_owner(&stranger, Uuid::new_v4(), "delete", "course").unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::FORBIDDEN);
        assert_eq!(
            err.message(),
            format!("User {} is not authorized to delete this course", stranger.id)
        );
    }
}
