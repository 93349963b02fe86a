use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use crate::filter::{FieldKind, FieldSpec, ResourceSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MinimumSkill {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl MinimumSkill {
    pub fn as_str(&self) -> &'static str {
        match self {
            MinimumSkill::Beginner => "beginner",
            MinimumSkill::Intermediate => "intermediate",
            MinimumSkill::Advanced => "advanced",
        }
    }
}

impl FromStr for MinimumSkill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "beginner" => Ok(MinimumSkill::Beginner),
            "intermediate" => Ok(MinimumSkill::Intermediate),
            "advanced" => Ok(MinimumSkill::Advanced),
            other => Err(format!("unknown skill level: {}", other)),
        }
    }
}

impl TryFrom<String> for MinimumSkill {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub weeks: String,
    pub tuition: f64,
    #[sqlx(try_from = "String")]
    pub minimum_skill: MinimumSkill,
    pub scholarship_available: bool,
    #[serde(rename = "bootcamp")]
    pub bootcamp_id: Uuid,
    #[serde(rename = "user")]
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

pub static COURSE_SCHEMA: ResourceSchema = ResourceSchema {
    table: "courses",
    fields: &[
        FieldSpec::new("id", "id", FieldKind::Uuid),
        FieldSpec::new("title", "title", FieldKind::Text),
        FieldSpec::new("description", "description", FieldKind::Text),
        FieldSpec::new("weeks", "weeks", FieldKind::Text),
        FieldSpec::new("tuition", "tuition", FieldKind::Number),
        FieldSpec::new("minimumSkill", "minimum_skill", FieldKind::Text),
        FieldSpec::new("scholarshipAvailable", "scholarship_available", FieldKind::Bool),
        FieldSpec::new("bootcamp", "bootcamp_id", FieldKind::Uuid),
        FieldSpec::new("user", "user_id", FieldKind::Uuid),
        FieldSpec::new("createdAt", "created_at", FieldKind::Timestamp),
    ],
};

/// Average tuition rounded up to the nearest 10
pub fn rounded_average_cost(average: Option<f64>) -> Option<f64> {
    average.map(|avg| (avg / 10.0).ceil() * 10.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_cost_rounds_up_to_ten() {
        assert_eq!(rounded_average_cost(Some(10000.0)), Some(10000.0));
        assert_eq!(rounded_average_cost(Some(8333.33)), Some(8340.0));
        assert_eq!(rounded_average_cost(Some(12501.0)), Some(12510.0));
        assert_eq!(rounded_average_cost(None), None);
    }

    #[test]
    fn skill_defaults_to_beginner() {
        assert_eq!(MinimumSkill::default(), MinimumSkill::Beginner);
        assert_eq!("advanced".parse::<MinimumSkill>().unwrap().as_str(), "advanced");
        assert!(MinimumSkill::try_from("expert".to_string()).is_err());
    }
}
