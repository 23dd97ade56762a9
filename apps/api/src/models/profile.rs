use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileConstraints {
    /// Ceiling on summed weekly workload hours (1-5).
    #[serde(default)]
    pub max_workload: Option<f64>,
    #[serde(default)]
    pub morning_labs: Option<bool>,
    #[serde(default)]
    pub schedule_preferences: Vec<String>,
}

impl ProfileConstraints {
    /// Decodes stored constraints field by field, so one malformed field does
    /// not discard the others.
    pub fn from_json(value: &Value) -> Self {
        ProfileConstraints {
            max_workload: value.get("max_workload").and_then(Value::as_f64),
            morning_labs: value.get("morning_labs").and_then(Value::as_bool),
            schedule_preferences: value
                .get("schedule_preferences")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default(),
        }
    }
}

/// A student's academic profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Taken from the request path on writes.
    #[serde(default)]
    pub user_id: Uuid,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub current_term: Option<String>,
    #[serde(default)]
    pub completed_courses: Vec<String>,
    #[serde(default)]
    pub planned_courses: Vec<String>,
    #[serde(default)]
    pub additional_comments: Option<String>,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub goal_tags: Vec<String>,
    #[serde(default)]
    pub constraints: Option<ProfileConstraints>,
}

impl UserProfile {
    pub fn max_workload(&self) -> Option<f64> {
        self.constraints.as_ref().and_then(|c| c.max_workload)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub program: Option<String>,
    pub current_term: Option<String>,
    pub completed_courses: Vec<String>,
    pub planned_courses: Vec<String>,
    pub additional_comments: Option<String>,
    pub gpa: Option<f64>,
    pub interests: Vec<String>,
    pub goal_tags: Vec<String>,
    pub constraints: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProfileRow> for UserProfile {
    fn from(row: ProfileRow) -> Self {
        UserProfile {
            user_id: row.user_id,
            username: row.username,
            program: row.program,
            current_term: row.current_term,
            completed_courses: row.completed_courses,
            planned_courses: row.planned_courses,
            additional_comments: row.additional_comments,
            gpa: row.gpa,
            interests: row.interests,
            goal_tags: row.goal_tags,
            constraints: row
                .constraints
                .filter(Value::is_object)
                .map(|v| ProfileConstraints::from_json(&v)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(constraints: Option<Value>) -> ProfileRow {
        ProfileRow {
            user_id: Uuid::nil(),
            username: None,
            program: Some("MTE".to_string()),
            current_term: Some("3A".to_string()),
            completed_courses: vec![],
            planned_courses: vec![],
            additional_comments: None,
            gpa: None,
            interests: vec![],
            goal_tags: vec!["robotics".to_string()],
            constraints,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_fractional_max_workload_survives_decoding() {
        let profile = UserProfile::from(row(Some(json!({
            "max_workload": 3.5,
            "morning_labs": false
        }))));
        assert_eq!(profile.max_workload(), Some(3.5));
        assert_eq!(profile.constraints.unwrap().morning_labs, Some(false));
    }

    #[test]
    fn test_malformed_field_keeps_other_constraints() {
        let profile = UserProfile::from(row(Some(json!({
            "max_workload": "heavy",
            "morning_labs": true,
            "schedule_preferences": ["no fridays"]
        }))));
        let constraints = profile.constraints.unwrap();
        assert_eq!(constraints.max_workload, None);
        assert_eq!(constraints.morning_labs, Some(true));
        assert_eq!(constraints.schedule_preferences, vec!["no fridays"]);
    }

    #[test]
    fn test_non_object_constraints_are_absent() {
        assert!(UserProfile::from(row(Some(json!("none")))).constraints.is_none());
        assert!(UserProfile::from(row(None)).constraints.is_none());
    }
}
