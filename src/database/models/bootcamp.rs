use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec, ResourceSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Career {
    #[serde(rename = "Mobile Development")]
    MobileDevelopment,
    #[serde(rename = "Web Development")]
    WebDevelopment,
    #[serde(rename = "Data Science")]
    DataScience,
    Business,
    #[serde(rename = "UI/UX")]
    UiUx,
    Others,
}

impl Career {
    pub fn as_str(&self) -> &'static str {
        match self {
            Career::MobileDevelopment => "Mobile Development",
            Career::WebDevelopment => "Web Development",
            Career::DataScience => "Data Science",
            Career::Business => "Business",
            Career::UiUx => "UI/UX",
            Career::Others => "Others",
        }
    }
}

/// GeoJSON-style point plus the address parts the geocoder resolved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: String,
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub formatted_address: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zipcode: Option<String>,
    pub country: Option<String>,
}

impl Location {
    pub fn point(longitude: f64, latitude: f64) -> Self {
        Self {
            kind: "Point".to_string(),
            coordinates: [longitude, latitude],
            formatted_address: None,
            street: None,
            city: None,
            state: None,
            zipcode: None,
            country: None,
        }
    }

    pub fn longitude(&self) -> f64 {
        self.coordinates[0]
    }

    pub fn latitude(&self) -> f64 {
        self.coordinates[1]
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Bootcamp {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub location: Option<Json<Location>>,
    pub careers: Vec<String>,
    pub average_rating: Option<f64>,
    pub average_cost: Option<f64>,
    pub photo: String,
    pub housing: bool,
    pub job_assistance: bool,
    pub job_guarantee: bool,
    pub accept_gi: bool,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// The slice of a bootcamp embedded into populated courses and reviews
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BootcampSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
}

pub static BOOTCAMP_SCHEMA: ResourceSchema = ResourceSchema {
    table: "bootcamps",
    fields: &[
        FieldSpec::new("id", "id", FieldKind::Uuid),
        FieldSpec::new("name", "name", FieldKind::Text),
        FieldSpec::new("slug", "slug", FieldKind::Text),
        FieldSpec::new("description", "description", FieldKind::Text),
        FieldSpec::new("website", "website", FieldKind::Text),
        FieldSpec::new("phone", "phone", FieldKind::Text),
        FieldSpec::new("email", "email", FieldKind::Text),
        FieldSpec::new("location", "location", FieldKind::Document),
        FieldSpec::new("careers", "careers", FieldKind::TextArray),
        FieldSpec::new("averageRating", "average_rating", FieldKind::Number),
        FieldSpec::new("averageCost", "average_cost", FieldKind::Number),
        FieldSpec::new("photo", "photo", FieldKind::Text),
        FieldSpec::new("housing", "housing", FieldKind::Bool),
        FieldSpec::new("jobAssistance", "job_assistance", FieldKind::Bool),
        FieldSpec::new("jobGuarantee", "job_guarantee", FieldKind::Bool),
        FieldSpec::new("acceptGi", "accept_gi", FieldKind::Bool),
        FieldSpec::new("user", "user_id", FieldKind::Uuid),
        FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
    ],
};

/// Lowercase, collapse every run of non-alphanumerics into one hyphen, trim hyphens
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_hyphen = false;

    for c in name.chars() {
        if c.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_hyphen = true;
        }
    }
    slug
}
