use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec, ResourceSchema};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub rating: i32,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub static REVIEW_SCHEMA: ResourceSchema = ResourceSchema {
    table: "reviews",
    fields: &[
        FieldSpec::new("id", "id", FieldKind::Uuid),
        FieldSpec::new("title", "title", FieldKind::Text),
        FieldSpec::new("text", "text", FieldKind::Text),
        FieldSpec::new("rating", "rating", FieldKind::Number),
        FieldSpec::new("bootcamp", "bootcamp_id", FieldKind::Uuid),
        FieldSpec::new("user", "user_id", FieldKind::Uuid),
        FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
    ],
};
