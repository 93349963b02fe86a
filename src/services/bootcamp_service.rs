use axum::body::Bytes;
use serde::Deserialize;
use sqlx::{types::Json, PgPool, Postgres};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::config::UploadConfig;
use crate::database::models::{slugify, Bootcamp, BootcampSummary, Career, Location, User};
use crate::database::{Repository, Resource};
use crate::error::ApiError;
use crate::server::AppState;
use crate::services::geocoder::Geocoder;
use crate::services::{ensure_owner, required};

/// Mean Earth radius used to turn a distance into an angle
pub const EARTH_RADIUS_KM: f64 = 6378.0;

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBootcamp {
    #[validate(
        required(message = "Please add a name"),
        length(max = 50, message = "Name can not be more than 50 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Please add a description"),
        length(max = 500, message = "Description can not be more than 500 characters")
    )]
    pub description: Option<String>,
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    #[validate(required(message = "Please add an address"))]
    pub address: Option<String>,
    #[validate(
        required(message = "Please add at least one career"),
        length(min = 1, message = "Please add at least one career")
    )]
    pub careers: Option<Vec<Career>>,
    #[serde(default)]
    pub housing: bool,
    #[serde(default)]
    pub job_assistance: bool,
    #[serde(default)]
    pub job_guarantee: bool,
    #[serde(default)]
    pub accept_gi: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBootcamp {
    #[validate(length(min = 1, max = 50, message = "Name can not be more than 50 characters"))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 500, message = "Description can not be more than 500 characters"))]
    pub description: Option<String>,
    #[validate(url(message = "Please use a valid URL with HTTP or HTTPS"))]
    pub website: Option<String>,
    #[validate(length(max = 20, message = "Phone number can not be longer than 20 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    pub address: Option<String>,
    #[validate(length(min = 1, message = "Please add at least one career"))]
    pub careers: Option<Vec<Career>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

/// A photo received from a multipart upload
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

pub struct BootcampService {
    pool: PgPool,
    geocoder: Arc<dyn Geocoder>,
    uploads: UploadConfig,
}

fn ensure_http_url(website: Option<&str>) -> Result<(), ApiError> {
    match website {
        Some(url) if !(url.starts_with("http://") || url.starts_with("https://")) => Err(
            ApiError::validation(vec!["Please use a valid URL with HTTP or HTTPS".to_string()]),
        ),
        _ => Ok(()),
    }
}

fn career_names(careers: &[Career]) -> Vec<String> {
    careers.iter().map(|c| c.as_str().to_string()).collect()
}

impl BootcampService {
    pub fn new(state: &AppState) -> Self {
        Self {
            pool: state.pool.clone(),
            geocoder: state.geocoder.clone(),
            uploads: state.config.uploads.clone(),
        }
    }

    async fn locate(&self, address: &str) -> Result<Location, ApiError> {
        Ok(self.geocoder.geocode(address).await?)
    }

    pub async fn create(&self, owner: &User, input: CreateBootcamp) -> Result<Bootcamp, ApiError> {
        ensure_http_url(input.website.as_deref())?;

        if !owner.is_admin() {
            let published: bool =
                sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM bootcamps WHERE user_id = $1)")
                    .bind(owner.id)
                    .fetch_one(&self.pool)
                    .await?;
            if published {
                return Err(already_published(owner.id));
            }
        }

        let name = required(input.name, "Please add a name")?.trim().to_string();
        let description = required(input.description, "Please add a description")?;
        let address = required(input.address, "Please add an address")?;
        let careers = required(input.careers, "Please add at least one career")?;
        let location = self.locate(&address).await?;

        let query = format!(
            "INSERT INTO bootcamps (id, name, slug, description, website, phone, email, location, careers, \
             housing, job_assistance, job_guarantee, accept_gi, user_id, publisher_slot) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15) RETURNING {}",
            Bootcamp::COLUMNS
        );

        let bootcamp = sqlx::query_as::<_, Bootcamp>(&query)
            .bind(Uuid::new_v4())
            .bind(&name)
            .bind(slugify(&name))
            .bind(description)
            .bind(input.website)
            .bind(input.phone)
            .bind(input.email)
            .bind(Json(location))
            .bind(career_names(&careers))
            .bind(input.housing)
            .bind(input.job_assistance)
            .bind(input.job_guarantee)
            .bind(input.accept_gi)
            .bind(owner.id)
            .bind((!owner.is_admin()).then_some(owner.id))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| publisher_conflict(e, owner.id))?;

        tracing::info!("Bootcamp {} created by {}", bootcamp.id, owner.id);
        Ok(bootcamp)
    }

    pub async fn update(&self, user: &User, id: Uuid, input: UpdateBootcamp) -> Result<Bootcamp, ApiError> {
        ensure_http_url(input.website.as_deref())?;

        let bootcamp = Repository::<Bootcamp>::new(&self.pool).select_404(id).await?;
        ensure_owner(user, bootcamp.user_id, "update", Bootcamp::LABEL)?;

        let location = match input.address.as_deref() {
            Some(address) => Some(self.locate(address).await?),
            None => None,
        };

        let mut qb = sqlx::QueryBuilder::<Postgres>::new("UPDATE bootcamps SET ");
        let mut sets = qb.separated(", ");
        let mut changed = false;

        if let Some(name) = input.name {
            let name = name.trim().to_string();
            sets.push("slug = ").push_bind_unseparated(slugify(&name));
            sets.push("name = ").push_bind_unseparated(name);
            changed = true;
        }
        if let Some(description) = input.description {
            sets.push("description = ").push_bind_unseparated(description);
            changed = true;
        }
        if let Some(website) = input.website {
            sets.push("website = ").push_bind_unseparated(website);
            changed = true;
        }
        if let Some(phone) = input.phone {
            sets.push("phone = ").push_bind_unseparated(phone);
            changed = true;
        }
        if let Some(email) = input.email {
            sets.push("email = ").push_bind_unseparated(email);
            changed = true;
        }
        if let Some(location) = location {
            sets.push("location = ").push_bind_unseparated(Json(location));
            changed = true;
        }
        if let Some(careers) = input.careers {
            sets.push("careers = ").push_bind_unseparated(career_names(&careers));
            changed = true;
        }
        for (column, value) in [
            ("housing", input.housing),
            ("job_assistance", input.job_assistance),
            ("job_guarantee", input.job_guarantee),
            ("accept_gi", input.accept_gi),
        ] {
            if let Some(value) = value {
                sets.push(format!("{} = ", column)).push_bind_unseparated(value);
                changed = true;
            }
        }

        if !changed {
            return Ok(bootcamp);
        }

        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(Bootcamp::COLUMNS);

        let updated = qb.build_query_as::<Bootcamp>().fetch_one(&self.pool).await?;
        Ok(updated)
    }

    /// Removes the bootcamp with its courses and reviews in one transaction
    pub async fn delete(&self, user: &User, id: Uuid) -> Result<Bootcamp, ApiError> {
        let bootcamp = Repository::<Bootcamp>::new(&self.pool).select_404(id).await?;
        ensure_owner(user, bootcamp.user_id, "delete", Bootcamp::LABEL)?;

        let mut tx = self.pool.begin().await?;
        let reviews = sqlx::query("DELETE FROM reviews WHERE bootcamp_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let courses = sqlx::query("DELETE FROM courses WHERE bootcamp_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        sqlx::query("DELETE FROM bootcamps WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(
            "Bootcamp {} deleted with {} courses and {} reviews",
            id,
            courses,
            reviews
        );
        Ok(bootcamp)
    }

    pub async fn within_radius(&self, zipcode: &str, distance_km: f64) -> Result<Vec<Bootcamp>, ApiError> {
        if !distance_km.is_finite() || distance_km < 0.0 {
            return Err(ApiError::bad_request("Distance must be a non-negative number"));
        }

        let center = self.locate(zipcode).await?;
        let radius = distance_km / EARTH_RADIUS_KM;

        // Great-circle angle between each stored point and the centre
        let query = format!(
            "SELECT {} FROM bootcamps \
             WHERE location IS NOT NULL \
             AND acos(LEAST(1.0, GREATEST(-1.0, \
                 sin(radians($2)) * sin(radians((location->'coordinates'->>1)::float8)) + \
                 cos(radians($2)) * cos(radians((location->'coordinates'->>1)::float8)) * \
                 cos(radians((location->'coordinates'->>0)::float8) - radians($1))))) <= $3 \
             ORDER BY created_at DESC, id",
            Bootcamp::COLUMNS
        );

        let bootcamps = sqlx::query_as::<_, Bootcamp>(&query)
            .bind(center.longitude())
            .bind(center.latitude())
            .bind(radius)
            .fetch_all(&self.pool)
            .await?;
        Ok(bootcamps)
    }

    pub async fn upload_photo(&self, user: &User, id: Uuid, file: Option<UploadedFile>) -> Result<String, ApiError> {
        let bootcamp = Repository::<Bootcamp>::new(&self.pool).select_404(id).await?;
        ensure_owner(user, bootcamp.user_id, "update", Bootcamp::LABEL)?;

        let file = file.ok_or_else(|| ApiError::bad_request("Please upload a file"))?;
        let file_name = photo_file_name(&self.uploads, bootcamp.id, &file)?;

        let dir = Path::new(&self.uploads.upload_path);
        let write = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(dir.join(&file_name), &file.bytes).await
        };
        if let Err(e) = write.await {
            tracing::error!("Failed to store {}: {}", file_name, e);
            return Err(ApiError::internal_server_error("Problem with file upload"));
        }

        sqlx::query("UPDATE bootcamps SET photo = $1 WHERE id = $2")
            .bind(&file_name)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(file_name)
    }
}

/// Validate an upload and derive its stored name, `photo_<id><ext>`
pub fn photo_file_name(uploads: &UploadConfig, id: Uuid, file: &UploadedFile) -> Result<String, ApiError> {
    if !file.content_type.starts_with("image") {
        return Err(ApiError::bad_request("Please upload an image file"));
    }
    if file.bytes.len() > uploads.max_file_upload {
        return Err(ApiError::bad_request(format!(
            "Please upload an image less than {} bytes",
            uploads.max_file_upload
        )));
    }

    let ext = Path::new(&file.file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    Ok(format!("photo_{}{}", id, ext))
}

pub async fn summaries(pool: &PgPool, ids: &[Uuid]) -> Result<HashMap<Uuid, BootcampSummary>, ApiError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = sqlx::query_as::<_, BootcampSummary>(
        "SELECT id, name, description FROM bootcamps WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(|b| (b.id, b)).collect())
}

/// Unique index backing the one-bootcamp-per-publisher rule
const PUBLISHER_SLOT_CONSTRAINT: &str = "bootcamps_publisher_slot_key";

fn already_published(user_id: Uuid) -> ApiError {
    ApiError::bad_request(format!(
        "The user with id {} has already published a bootcamp",
        user_id
    ))
}

/// The store constraint closes the race the pre-check leaves open
fn publisher_conflict(err: sqlx::Error, user_id: Uuid) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.constraint() == Some(PUBLISHER_SLOT_CONSTRAINT) {
            return already_published(user_id);
        }
    }
    err.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn upload(name: &str, content_type: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: Bytes::from(vec![0u8; size]),
        }
    }

    #[test]
    fn photo_name_keeps_extension() {
        let uploads = AppConfig::development().uploads;
        let id = Uuid::new_v4();
        let name = photo_file_name(&uploads, id, &upload("me.jpg", "image/jpeg", 10)).unwrap();
        assert_eq!(name, format!("photo_{}.jpg", id));

        let bare = photo_file_name(&uploads, id, &upload("photo", "image/png", 10)).unwrap();
        assert_eq!(bare, format!("photo_{}", id));
    }

    #[test]
    fn photo_rejects_non_images_and_oversize() {
        let uploads = AppConfig::development().uploads;
        let id = Uuid::new_v4();

        let err = photo_file_name(&uploads, id, &upload("a.pdf", "application/pdf", 10)).unwrap_err();
        assert_eq!(err.message(), "Please upload an image file");

        let err = photo_file_name(&uploads, id, &upload("a.png", "image/png", uploads.max_file_upload + 1))
            .unwrap_err();
        assert_eq!(err.message(), "Please upload an image less than 1000000 bytes");
    }

    #[test]
    fn create_payload_reports_every_missing_field() {
        let input: CreateBootcamp = serde_json::from_value(serde_json::json!({})).unwrap();
        let err: ApiError = input.validate().unwrap_err().into();
        assert_eq!(
            err.to_json()["error"],
            serde_json::json!([
                "Please add an address",
                "Please add at least one career",
                "Please add a description",
                "Please add a name"
            ])
        );
    }

    #[test]
    fn rejects_non_http_websites() {
        assert!(ensure_http_url(Some("ftp://files.example.com")).is_err());
        assert!(ensure_http_url(Some("https://devworks.com")).is_ok());
        assert!(ensure_http_url(None).is_ok());
    }
}
