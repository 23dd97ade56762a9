use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;

/// Estimated weekly hours per activity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workload {
    #[serde(default)]
    pub reading: f64,
    #[serde(default)]
    pub assignments: f64,
    #[serde(default)]
    pub projects: f64,
    #[serde(default)]
    pub labs: f64,
}

impl Workload {
    /// Weekly hours assumed when a catalog source gives none.
    pub fn assumed(labs: f64) -> Self {
        Workload {
            reading: 2.0,
            assignments: 3.0,
            projects: 1.0,
            labs,
        }
    }

    pub fn total_hours(&self) -> f64 {
        self.reading + self.assignments + self.projects + self.labs
    }
}

/// Assessment weighting, in percent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Assessments {
    pub midterm: Option<f64>,
    #[serde(rename = "final")]
    pub final_exam: Option<f64>,
    pub assignments: Option<f64>,
    pub projects: Option<f64>,
    pub labs: Option<f64>,
}

impl Assessments {
    /// 30% midterm, 40% final, 30% assignments.
    pub fn assumed() -> Self {
        Assessments {
            midterm: Some(30.0),
            final_exam: Some(40.0),
            assignments: Some(30.0),
            ..Default::default()
        }
    }
}

/// A course as consumed by the scorer and returned by the API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub dept: String,
    #[serde(default)]
    pub units: Option<f64>,
    #[serde(default)]
    pub level: i32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub terms_offered: Vec<String>,
    #[serde(default)]
    pub prereqs: Option<String>,
    #[serde(default)]
    pub workload: Option<Workload>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub assessments: Option<Assessments>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Raw `courses` row. JSONB columns stay untyped here and are decoded
/// leniently in `From<CourseRow> for Course`.
#[derive(Debug, Clone, FromRow)]
pub struct CourseRow {
    pub id: String,
    pub title: String,
    pub dept: String,
    pub units: Option<f64>,
    pub level: i32,
    pub description: Option<String>,
    pub faculty: Option<String>,
    pub terms_offered: Option<Value>,
    pub prereqs: Option<String>,
    pub workload: Option<Value>,
    pub skills: Option<Value>,
    pub assessments: Option<Value>,
    pub source_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            id: row.id,
            title: row.title,
            dept: row.dept,
            units: row.units,
            level: row.level,
            description: row.description,
            faculty: row.faculty,
            terms_offered: decode_or_default(row.terms_offered),
            prereqs: row.prereqs,
            workload: decode_optional(row.workload),
            skills: decode_or_default(row.skills),
            assessments: decode_optional(row.assessments),
            source_url: row.source_url,
        }
    }
}

/// Malformed JSONB (e.g. a non-array `skills`) degrades to the empty value.
fn decode_or_default<T: DeserializeOwned + Default>(value: Option<Value>) -> T {
    value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn decode_optional<T: DeserializeOwned>(value: Option<Value>) -> Option<T> {
    value
        .filter(|v| !v.is_null())
        .and_then(|v| serde_json::from_value(v).ok())
}

/// Rule for a "select N from" elective bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectiveRule {
    #[serde(rename = "selectNfrom")]
    pub select_n_from: Vec<String>,
    #[serde(rename = "N")]
    pub n: u32,
}

/// A program option / specialization bundle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramOption {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub faculty: Option<String>,
    #[serde(default)]
    pub required_courses: Vec<String>,
    #[serde(default)]
    pub selective_rules: Option<SelectiveRule>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub source_url: Option<String>,
}

/// Elective bucket a course belongs to within an option, with its priority.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketRule {
    pub bucket: String,
    pub weight: u32,
}

/// Links a course to a program option it helps fulfil.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseOptionMap {
    pub option_id: String,
    pub course_id: String,
    pub rule: BucketRule,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(skills: Value, workload: Option<Value>) -> CourseRow {
        CourseRow {
            id: "ECE486".to_string(),
            title: "Robot Dynamics and Control".to_string(),
            dept: "ECE".to_string(),
            units: Some(0.5),
            level: 400,
            description: None,
            faculty: None,
            terms_offered: Some(json!(["F", "W"])),
            prereqs: Some("ECE 380".to_string()),
            workload,
            skills: Some(skills),
            assessments: None,
            source_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_row_decodes_jsonb_columns() {
        let course: Course = row(
            json!(["robotics", "control"]),
            Some(json!({"reading": 2, "assignments": 3, "projects": 1, "labs": 1})),
        )
        .into();
        assert_eq!(course.skills, vec!["robotics", "control"]);
        assert_eq!(course.terms_offered, vec!["F", "W"]);
        assert_eq!(course.workload.map(|w| w.total_hours()), Some(7.0));
    }

    #[test]
    fn test_malformed_skills_degrade_to_empty() {
        let course: Course = row(json!("robotics"), Some(Value::Null)).into();
        assert!(course.skills.is_empty());
        assert!(course.workload.is_none());
    }

    #[test]
    fn test_partial_workload_defaults_missing_fields() {
        let w: Workload = serde_json::from_value(json!({"labs": 4})).unwrap();
        assert_eq!(w.total_hours(), 4.0);
    }
}
