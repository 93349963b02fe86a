use anyhow::Context;
use clap::Subcommand;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use sqlx::{types::Json, PgPool, Postgres, Transaction};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::database::models::{slugify, Career, Location, MinimumSkill, Role};
use crate::database::DatabaseManager;
use crate::services::course_service::recompute_average_cost;
use crate::services::review_service::recompute_average_rating;
use crate::services::{Geocoder, MapQuestGeocoder};

#[derive(Subcommand)]
pub enum SeedCommands {
    #[command(about = "Import users, bootcamps, courses and reviews from JSON files")]
    Import {
        #[arg(help = "Directory holding users.json, bootcamps.json, courses.json and reviews.json", default_value = "data")]
        dir: PathBuf,
    },

    #[command(about = "Delete every user, bootcamp, course and review")]
    Destroy,
}

#[derive(Debug, Deserialize)]
struct SeedUser {
    id: Uuid,
    name: String,
    email: String,
    #[serde(default)]
    role: Role,
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedBootcamp {
    id: Uuid,
    user: Uuid,
    name: String,
    description: String,
    website: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
    location: Option<Location>,
    careers: Vec<Career>,
    #[serde(default)]
    housing: bool,
    #[serde(default)]
    job_assistance: bool,
    #[serde(default)]
    job_guarantee: bool,
    #[serde(default)]
    accept_gi: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedCourse {
    id: Uuid,
    title: String,
    description: String,
    weeks: String,
    tuition: f64,
    #[serde(default)]
    minimum_skill: MinimumSkill,
    #[serde(default)]
    scholarship_available: bool,
    bootcamp: Uuid,
    user: Uuid,
}

#[derive(Debug, Deserialize)]
struct SeedReview {
    id: Uuid,
    title: String,
    text: String,
    rating: i32,
    bootcamp: Uuid,
    user: Uuid,
}

pub async fn handle(cmd: SeedCommands, config: AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let pool = DatabaseManager::connect(&config.database)
        .await
        .context("connecting to the database")?;
    DatabaseManager::migrate(&pool).await.context("running migrations")?;

    match cmd {
        SeedCommands::Import { dir } => handle_import(&pool, &config, &dir, output_format).await,
        SeedCommands::Destroy => handle_destroy(&pool, output_format).await,
    }
}

async fn read_seed<T: DeserializeOwned>(dir: &Path, name: &str) -> anyhow::Result<Vec<T>> {
    let path = dir.join(name);
    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
}

async fn handle_import(pool: &PgPool, config: &AppConfig, dir: &Path, output_format: OutputFormat) -> anyhow::Result<()> {
    let users: Vec<SeedUser> = read_seed(dir, "users.json").await?;
    let bootcamps: Vec<SeedBootcamp> = read_seed(dir, "bootcamps.json").await?;
    let courses: Vec<SeedCourse> = read_seed(dir, "courses.json").await?;
    let reviews: Vec<SeedReview> = read_seed(dir, "reviews.json").await?;

    // Only reach for the geocoding service when a record has no stored location
    let geocoder = if bootcamps.iter().any(|b| b.location.is_none()) {
        Some(MapQuestGeocoder::new(&config.geocoder).context("configuring the geocoder")?)
    } else {
        None
    };

    let mut tx = pool.begin().await?;

    for user in &users {
        let hashed = hash_password(user.password.clone(), config.security.bcrypt_cost).await?;
        sqlx::query("INSERT INTO users (id, name, email, role, password) VALUES ($1, $2, $3, $4, $5)")
            .bind(user.id)
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.role.as_str())
            .bind(hashed)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("inserting user {}", user.email))?;
    }

    for bootcamp in &bootcamps {
        let location = match (&bootcamp.location, &bootcamp.address, &geocoder) {
            (Some(location), _, _) => location.clone(),
            (None, Some(address), Some(geocoder)) => geocoder
                .geocode(address)
                .await
                .with_context(|| format!("geocoding {}", bootcamp.name))?,
            _ => anyhow::bail!("bootcamp {} has neither a location nor an address", bootcamp.name),
        };
        insert_bootcamp(&mut tx, bootcamp, location).await?;
    }

    for course in &courses {
        sqlx::query(
            "INSERT INTO courses (id, title, description, weeks, tuition, minimum_skill, \
             scholarship_available, bootcamp_id, user_id) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.weeks)
        .bind(course.tuition)
        .bind(course.minimum_skill.as_str())
        .bind(course.scholarship_available)
        .bind(course.bootcamp)
        .bind(course.user)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("inserting course {}", course.title))?;
    }

    for review in &reviews {
        sqlx::query(
            "INSERT INTO reviews (id, title, text, rating, bootcamp_id, user_id) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(review.id)
        .bind(&review.title)
        .bind(&review.text)
        .bind(review.rating)
        .bind(review.bootcamp)
        .bind(review.user)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("inserting review {}", review.title))?;
    }

    tx.commit().await?;

    for bootcamp in &bootcamps {
        recompute_average_cost(pool, bootcamp.id).await;
        recompute_average_rating(pool, bootcamp.id).await;
    }

    tracing::info!("Seed data imported from {}", dir.display());
    output_success(
        &output_format,
        "Data imported",
        Some(json!({
            "users": users.len(),
            "bootcamps": bootcamps.len(),
            "courses": courses.len(),
            "reviews": reviews.len(),
        })),
    )
}

async fn insert_bootcamp(tx: &mut Transaction<'_, Postgres>, bootcamp: &SeedBootcamp, location: Location) -> anyhow::Result<()> {
    let careers: Vec<&str> = bootcamp.careers.iter().map(Career::as_str).collect();

    sqlx::query(
        "INSERT INTO bootcamps (id, name, slug, description, website, phone, email, location, careers, \
         housing, job_assistance, job_guarantee, accept_gi, user_id, publisher_slot) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, \
         CASE WHEN (SELECT role FROM users WHERE id = $14) = 'admin' THEN NULL ELSE $14 END)",
    )
    .bind(bootcamp.id)
    .bind(bootcamp.name.trim())
    .bind(slugify(&bootcamp.name))
    .bind(&bootcamp.description)
    .bind(&bootcamp.website)
    .bind(&bootcamp.phone)
    .bind(&bootcamp.email)
    .bind(Json(location))
    .bind(careers)
    .bind(bootcamp.housing)
    .bind(bootcamp.job_assistance)
    .bind(bootcamp.job_guarantee)
    .bind(bootcamp.accept_gi)
    .bind(bootcamp.user)
    .execute(&mut **tx)
    .await
    .with_context(|| format!("inserting bootcamp {}", bootcamp.name))?;
    Ok(())
}

async fn handle_destroy(pool: &PgPool, output_format: OutputFormat) -> anyhow::Result<()> {
    let mut tx = pool.begin().await?;
    let mut removed = serde_json::Map::new();
    for table in ["reviews", "courses", "bootcamps", "users"] {
        let result = sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *tx)
            .await
            .with_context(|| format!("clearing {}", table))?;
        removed.insert(table.to_string(), json!(result.rows_affected()));
    }
    tx.commit().await?;

    tracing::info!("Seed data destroyed");
    output_success(&output_format, "Data destroyed", Some(removed.into()))
}
