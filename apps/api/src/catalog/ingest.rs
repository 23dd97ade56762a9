//! Catalog ingestion: turns admin uploads (CSV sheets, program JSON) into
//! courses and options, and upserts them by id.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use sqlx::types::Json;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::course::{
    Assessments, BucketRule, Course, CourseOptionMap, ProgramOption, SelectiveRule, Workload,
};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("row {row}: {source}")]
    Record {
        row: usize,
        source: serde_json::Error,
    },

    #[error("invalid program file: {0}")]
    ProgramFile(String),
}

/// How a CSV cell is interpreted. Cells that do not fit their kind are
/// defaulted rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
enum CellKind {
    /// JSON string array; any other text becomes a one-element list.
    List,
    Object(ObjectKind),
    Number,
    /// Number truncated toward zero.
    Integer,
    Text,
}

/// JSON object columns and what replaces an unusable value.
#[derive(Debug, Clone, Copy, PartialEq)]
enum ObjectKind {
    Workload,
    Assessments,
    /// No fallback: an unusable rule is left out.
    SelectiveRule,
}

impl ObjectKind {
    fn accepts(self, value: &Value) -> bool {
        match self {
            ObjectKind::Workload => Workload::deserialize(value).is_ok(),
            ObjectKind::Assessments => Assessments::deserialize(value).is_ok(),
            ObjectKind::SelectiveRule => SelectiveRule::deserialize(value).is_ok(),
        }
    }

    fn fallback(self) -> Option<Value> {
        match self {
            ObjectKind::Workload => serde_json::to_value(Workload::assumed(1.0)).ok(),
            ObjectKind::Assessments => serde_json::to_value(Assessments::assumed()).ok(),
            ObjectKind::SelectiveRule => None,
        }
    }
}

fn course_column(header: &str) -> CellKind {
    match header {
        "terms_offered" | "skills" => CellKind::List,
        "workload" => CellKind::Object(ObjectKind::Workload),
        "assessments" => CellKind::Object(ObjectKind::Assessments),
        "level" => CellKind::Integer,
        "units" | "gpa" => CellKind::Number,
        _ => CellKind::Text,
    }
}

fn option_column(header: &str) -> CellKind {
    match header {
        "required_courses" => CellKind::List,
        "selective_rules" => CellKind::Object(ObjectKind::SelectiveRule),
        _ => CellKind::Text,
    }
}

pub fn parse_courses_csv(bytes: &[u8]) -> Result<Vec<Course>, IngestError> {
    parse_csv_records(bytes, course_column)
}

pub fn parse_options_csv(bytes: &[u8]) -> Result<Vec<ProgramOption>, IngestError> {
    parse_csv_records(bytes, option_column)
}

fn csv_reader(bytes: &[u8]) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes)
}

/// Reads a header-led CSV, converts each row to a JSON object using the
/// column classifier, then deserializes it. Blank cells are treated as absent,
/// except list columns which become empty.
fn parse_csv_records<T: DeserializeOwned>(
    bytes: &[u8],
    classify: fn(&str) -> CellKind,
) -> Result<Vec<T>, IngestError> {
    let mut reader = csv_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        // Header is line 1.
        let row = index + 2;
        let record = result?;
        let mut object = Map::new();

        for (header, cell) in headers.iter().zip(record.iter()) {
            let kind = classify(header);
            let value = if cell.is_empty() {
                (kind == CellKind::List).then(|| Value::Array(vec![]))
            } else {
                cell_value(kind, cell)
            };
            if let Some(value) = value {
                object.insert(header.to_string(), value);
            }
        }

        let parsed = serde_json::from_value(Value::Object(object))
            .map_err(|source| IngestError::Record { row, source })?;
        records.push(parsed);
    }

    debug!("Parsed {} CSV records", records.len());
    Ok(records)
}

fn cell_value(kind: CellKind, cell: &str) -> Option<Value> {
    match kind {
        CellKind::List => Some(list_cell(cell)),
        CellKind::Object(object) => object_cell(object, cell),
        CellKind::Number => leading_number(cell)
            .and_then(Number::from_f64)
            .map(Value::Number),
        CellKind::Integer => leading_number(cell).map(|n| Value::from(n.trunc() as i64)),
        CellKind::Text => Some(Value::String(cell.to_string())),
    }
}

fn list_cell(cell: &str) -> Value {
    if cell.starts_with('[') && cell.ends_with(']') {
        if let Some(items) = parse_json_cell::<Vec<String>>(cell) {
            return Value::from(items);
        }
        warn!("List cell '{cell}' is not a JSON string array, keeping it as one item");
    }
    Value::from(vec![cell.to_string()])
}

fn object_cell(kind: ObjectKind, cell: &str) -> Option<Value> {
    if cell.starts_with('{') && cell.ends_with('}') {
        if let Some(value) = parse_json_cell::<Value>(cell).filter(|v| kind.accepts(v)) {
            return Some(value);
        }
    }
    warn!("Cell '{cell}' is not a usable {kind:?} object, using the default");
    kind.fallback()
}

/// Parses a JSON cell, retrying with doubled quotes collapsed for sheets
/// exported without CSV quoting.
fn parse_json_cell<T: DeserializeOwned>(cell: &str) -> Option<T> {
    serde_json::from_str(cell)
        .ok()
        .or_else(|| serde_json::from_str(&cell.replace("\"\"", "\"")).ok())
}

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").expect("number pattern is valid")
});

/// Numeric prefix of a cell, so `"0.5 units"` reads as 0.5.
fn leading_number(cell: &str) -> Option<f64> {
    LEADING_NUMBER
        .find(cell)
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

// ────────────────────────────────────────────────────────────────────────────
// Program JSON
// ────────────────────────────────────────────────────────────────────────────

static COURSE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Z]+)\s+(\d+)\s*-\s*(.+)$").expect("course line pattern is valid")
});

const SKIPPED_PREFIXES: [&str; 2] = ["WKRPT", "COMMST"];
const PLACEHOLDER_ELECTIVE: &str = "Approved Elective";
const PROGRAM_BASE_URL: &str = "https://uwaterloo.ca/engineering/undergraduate-studies";

/// Title keyword → skill tag. A tag is added once if any keyword matches.
const TITLE_SKILLS: &[(&[&str], &str)] = &[
    (&["robot"], "robotics"),
    (&["control"], "control"),
    (&["machine learning", "ai"], "machine learning"),
    (&["software", "programming"], "software"),
    (&["hardware", "circuit"], "hardware"),
    (&["mechanics", "dynamics"], "mechanics"),
    (&["math", "calculus"], "mathematics"),
    (&["design"], "design"),
    (&["systems"], "systems"),
    (&["data"], "data"),
];

#[derive(Debug, Default)]
pub struct ProgramImport {
    pub courses: Vec<Course>,
    pub options: Vec<ProgramOption>,
}

/// Extracts courses and one option per program from a program-requirements
/// document shaped `{ "programs": { name: { "degree", "terms": { term: [line] } } } }`.
pub fn parse_program_json(document: &Value) -> Result<ProgramImport, IngestError> {
    let programs = match document.get("programs") {
        None | Some(Value::Null) => return Ok(ProgramImport::default()),
        Some(Value::Object(programs)) => programs,
        Some(_) => {
            return Err(IngestError::ProgramFile(
                "'programs' must be an object".to_string(),
            ))
        }
    };

    let mut import = ProgramImport::default();
    let mut seen = HashSet::new();

    for (name, program) in programs {
        let slug = name.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
        let source_url = format!("{PROGRAM_BASE_URL}/{slug}");

        import.options.push(ProgramOption {
            id: slug.replacen("engineering", "eng", 1),
            name: name.clone(),
            program: Some(
                program
                    .get("degree")
                    .and_then(Value::as_str)
                    .unwrap_or("BASc")
                    .to_string(),
            ),
            faculty: Some("Engineering".to_string()),
            description: Some(format!("{name} program requirements")),
            source_url: Some(source_url.clone()),
            ..Default::default()
        });

        let Some(terms) = program.get("terms").and_then(Value::as_object) else {
            continue;
        };
        let lines = terms
            .values()
            .filter_map(Value::as_array)
            .flatten()
            .filter_map(Value::as_str);

        for line in lines {
            if let Some(course) = parse_course_line(line, name, &source_url) {
                if seen.insert(course.id.clone()) {
                    import.courses.push(course);
                }
            }
        }
    }

    info!(
        "Parsed program file: {} courses, {} programs",
        import.courses.len(),
        import.options.len()
    );
    Ok(import)
}

/// Parses `"ECE 486 - Robot Dynamics and Control"`. Work reports,
/// communication courses and elective placeholders are skipped.
fn parse_course_line(line: &str, program: &str, source_url: &str) -> Option<Course> {
    if line.is_empty()
        || line == PLACEHOLDER_ELECTIVE
        || SKIPPED_PREFIXES.iter().any(|p| line.starts_with(p))
    {
        return None;
    }

    let captures = COURSE_LINE.captures(line)?;
    let dept = &captures[1];
    let number: u32 = captures[2].parse().ok()?;
    let title = captures[3].to_string();

    Some(Course {
        id: format!("{dept}{}", &captures[2]),
        dept: dept.to_string(),
        units: Some(0.5),
        level: level_bucket(number),
        description: Some(format!("Course from {program} program")),
        terms_offered: vec!["F".to_string(), "W".to_string()],
        prereqs: Some(String::new()),
        workload: Some(Workload::assumed(1.0)),
        skills: infer_skills(&title),
        assessments: Some(Assessments::assumed()),
        source_url: Some(source_url.to_string()),
        title,
        ..Default::default()
    })
}

fn level_bucket(number: u32) -> i32 {
    match number {
        0..=199 => 100,
        200..=299 => 200,
        300..=399 => 300,
        _ => 400,
    }
}

fn infer_skills(title: &str) -> Vec<String> {
    let title = title.to_lowercase();
    let mut skills: Vec<String> = TITLE_SKILLS
        .iter()
        .filter(|(keywords, _)| keywords.iter().any(|k| title.contains(k)))
        .map(|(_, skill)| skill.to_string())
        .collect();
    if skills.is_empty() {
        skills.push("general engineering".to_string());
    }
    skills
}

// ────────────────────────────────────────────────────────────────────────────
// Elective lists
// ────────────────────────────────────────────────────────────────────────────

const COURSE_PAGE_BASE_URL: &str = "https://uwaterloo.ca/undergraduate-studies/courses";
const ELECTIVE_TERMS: [&str; 3] = ["F", "W", "S"];
const VARIES_PREREQ: &str = "Prerequisites vary - check course calendar";

static DEPT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]+").expect("department pattern is valid"));
static COURSE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("course number pattern is valid"));
/// A whole row wrapped in one pair of quotes.
static QUOTED_ROW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?m)^"([^"]*)"\r?$"#).expect("quoted row pattern is valid"));

#[derive(Debug, Deserialize)]
struct TechnicalElectiveRecord {
    #[serde(rename = "Course_Code", default)]
    course_code: String,
    #[serde(rename = "Course_Title", default)]
    course_title: String,
    #[serde(rename = "Program", default)]
    program: String,
    #[serde(rename = "Bucket", default)]
    bucket: String,
    #[serde(rename = "Helps_Fulfill_Option", default)]
    helps_fulfill_option: String,
}

#[derive(Debug, Deserialize)]
struct CseElectiveRecord {
    #[serde(rename = "Course_Code", default)]
    course_code: String,
    #[serde(rename = "Course_Name", default)]
    course_name: String,
    #[serde(rename = "Subject_Code", default)]
    subject_code: String,
    #[serde(rename = "Units", default)]
    units: String,
    #[serde(rename = "Category", default)]
    category: String,
}

#[derive(Debug, Default)]
pub struct TechnicalElectiveImport {
    pub courses: Vec<Course>,
    pub mappings: Vec<CourseOptionMap>,
}

/// Parses a technical-electives sheet (`Program`, `Course_Code`,
/// `Course_Title`, `Bucket`, `Helps_Fulfill_Option`). Each course is emitted
/// once; every row naming an option also yields a course-option mapping.
pub fn parse_technical_electives_csv(bytes: &[u8]) -> Result<TechnicalElectiveImport, IngestError> {
    let mut reader = csv_reader(bytes);
    let mut import = TechnicalElectiveImport::default();
    let mut seen = HashSet::new();

    for result in reader.deserialize::<TechnicalElectiveRecord>() {
        let record = result?;
        let id: String = record.course_code.split_whitespace().collect();
        if id.is_empty() {
            continue;
        }

        if seen.insert(id.clone()) {
            import.courses.push(technical_elective_course(&id, &record));
        }

        if !record.helps_fulfill_option.is_empty() {
            import.mappings.push(CourseOptionMap {
                option_id: option_slug(&record.program, &record.helps_fulfill_option),
                course_id: id,
                rule: BucketRule {
                    bucket: or_fallback(&record.bucket, "general"),
                    weight: bucket_weight(&record.bucket),
                },
            });
        }
    }

    info!(
        "Parsed technical electives: {} courses, {} option mappings",
        import.courses.len(),
        import.mappings.len()
    );
    Ok(import)
}

fn technical_elective_course(id: &str, record: &TechnicalElectiveRecord) -> Course {
    let level = catalog_level(course_number(&record.course_code), 500, 300);
    let prereqs = if level >= 300 { standing_prereq(level) } else { None };

    Course {
        id: id.to_string(),
        title: record.course_title.clone(),
        dept: DEPT_PREFIX
            .find(&record.course_code)
            .map_or("ENG", |m| m.as_str())
            .to_string(),
        units: Some(0.5),
        level,
        description: Some(format!(
            "Technical Elective - {}",
            or_fallback(&record.program, "Engineering")
        )),
        faculty: Some("Engineering".to_string()),
        terms_offered: ELECTIVE_TERMS.iter().map(|t| t.to_string()).collect(),
        prereqs: Some(prereqs.unwrap_or(VARIES_PREREQ).to_string()),
        workload: Some(Workload::assumed(0.0)),
        skills: vec![
            or_fallback(&record.bucket, "technical"),
            or_fallback(&record.helps_fulfill_option, "general"),
        ],
        assessments: Some(Assessments::assumed()),
        source_url: Some(course_page_url(id)),
    }
}

/// Parses a CSE-electives sheet (`Course_Code`, `Course_Name`,
/// `Subject_Code`, `Units`, `Category`). Rows wrapped whole in quotes are
/// unwrapped first; rows without a code and repeated codes are skipped.
pub fn parse_cse_electives_csv(bytes: &[u8]) -> Result<Vec<Course>, IngestError> {
    let text = String::from_utf8_lossy(bytes);
    let cleaned = QUOTED_ROW.replace_all(&text, "$1");
    let mut reader = csv_reader(cleaned.as_bytes());
    let mut courses = Vec::new();
    let mut seen = HashSet::new();

    for result in reader.deserialize::<CseElectiveRecord>() {
        let record = result?;
        if record.course_code.is_empty() || !seen.insert(record.course_code.clone()) {
            continue;
        }

        let level = catalog_level(course_number(&record.course_code), 400, 100);
        let prereqs = if level == 100 {
            "None"
        } else {
            standing_prereq(level).unwrap_or(VARIES_PREREQ)
        };

        courses.push(Course {
            title: record.course_name,
            dept: record.subject_code,
            units: Some(leading_number(&record.units).unwrap_or(0.5)),
            level,
            description: Some(format!(
                "CSE Elective - {}",
                or_fallback(&record.category, "General")
            )),
            faculty: Some("Engineering".to_string()),
            terms_offered: ELECTIVE_TERMS.iter().map(|t| t.to_string()).collect(),
            prereqs: Some(prereqs.to_string()),
            workload: Some(Workload::assumed(0.0)),
            skills: vec![or_fallback(&record.category, "general")],
            assessments: Some(Assessments::assumed()),
            source_url: Some(course_page_url(&record.course_code)),
            id: record.course_code,
        });
    }

    info!("Parsed {} CSE electives", courses.len());
    Ok(courses)
}

fn course_number(code: &str) -> Option<u32> {
    COURSE_NUMBER.find(code).and_then(|m| m.as_str().parse().ok())
}

/// Hundreds bucket of a course number (486 → 400). Numbers below 100 or past
/// `highest` give `fallback`.
fn catalog_level(number: Option<u32>, highest: i32, fallback: i32) -> i32 {
    number
        .and_then(|n| i32::try_from(n / 100 * 100).ok())
        .filter(|level| (100..=highest).contains(level))
        .unwrap_or(fallback)
}

fn standing_prereq(level: i32) -> Option<&'static str> {
    match level {
        200 => Some("Completion of first year or permission of instructor"),
        300 => Some("Completion of second year or permission of instructor"),
        400 => Some("Completion of third year or permission of instructor"),
        500 => Some("Completion of fourth year or permission of instructor"),
        _ => None,
    }
}

/// `"Mechatronics Engineering"` + `"AI & Robotics"` →
/// `"mechatronics-engineering-ai--robotics"`.
fn option_slug(program: &str, option: &str) -> String {
    let hyphenate = |s: &str| s.to_lowercase().split_whitespace().collect::<Vec<_>>().join("-");
    let option: String = hyphenate(option)
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();

    if program.is_empty() {
        option
    } else {
        format!("{}-{option}", hyphenate(program))
    }
}

/// List 1 electives weigh most.
fn bucket_weight(bucket: &str) -> u32 {
    if bucket.contains("List 1") {
        3
    } else if bucket.contains("List 2") {
        2
    } else {
        1
    }
}

fn course_page_url(id: &str) -> String {
    format!("{COURSE_PAGE_BASE_URL}/{}", id.to_lowercase())
}

fn or_fallback(value: &str, fallback: &str) -> String {
    let chosen = if value.is_empty() { fallback } else { value };
    chosen.to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Persistence
// ────────────────────────────────────────────────────────────────────────────

/// Upserts courses by id inside one transaction.
pub async fn upsert_courses(pool: &PgPool, courses: &[Course]) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for course in courses {
        sqlx::query(
            r#"
            INSERT INTO courses
                (id, title, dept, units, level, description, faculty, terms_offered,
                 prereqs, workload, skills, assessments, source_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                dept = EXCLUDED.dept,
                units = EXCLUDED.units,
                level = EXCLUDED.level,
                description = EXCLUDED.description,
                faculty = EXCLUDED.faculty,
                terms_offered = EXCLUDED.terms_offered,
                prereqs = EXCLUDED.prereqs,
                workload = EXCLUDED.workload,
                skills = EXCLUDED.skills,
                assessments = EXCLUDED.assessments,
                source_url = EXCLUDED.source_url,
                updated_at = NOW()
            "#,
        )
        .bind(&course.id)
        .bind(&course.title)
        .bind(&course.dept)
        .bind(course.units)
        .bind(course.level)
        .bind(&course.description)
        .bind(&course.faculty)
        .bind(Json(&course.terms_offered))
        .bind(&course.prereqs)
        .bind(course.workload.as_ref().map(Json))
        .bind(Json(&course.skills))
        .bind(course.assessments.as_ref().map(Json))
        .bind(&course.source_url)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Upserted {} courses", courses.len());
    Ok(courses.len())
}

/// Upserts program options by id inside one transaction.
pub async fn upsert_options(pool: &PgPool, options: &[ProgramOption]) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for option in options {
        sqlx::query(
            r#"
            INSERT INTO options
                (id, name, program, faculty, required_courses, selective_rules,
                 description, source_url)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                program = EXCLUDED.program,
                faculty = EXCLUDED.faculty,
                required_courses = EXCLUDED.required_courses,
                selective_rules = EXCLUDED.selective_rules,
                description = EXCLUDED.description,
                source_url = EXCLUDED.source_url,
                updated_at = NOW()
            "#,
        )
        .bind(&option.id)
        .bind(&option.name)
        .bind(&option.program)
        .bind(&option.faculty)
        .bind(Json(&option.required_courses))
        .bind(option.selective_rules.as_ref().map(Json))
        .bind(&option.description)
        .bind(&option.source_url)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Upserted {} options", options.len());
    Ok(options.len())
}

/// Upserts course-option mappings keyed by `(option_id, course_id)`.
pub async fn upsert_course_option_maps(
    pool: &PgPool,
    mappings: &[CourseOptionMap],
) -> Result<usize, sqlx::Error> {
    let mut tx = pool.begin().await?;
    for mapping in mappings {
        sqlx::query(
            r#"
            INSERT INTO course_option_map (option_id, course_id, rule)
            VALUES ($1, $2, $3)
            ON CONFLICT (option_id, course_id) DO UPDATE SET rule = EXCLUDED.rule
            "#,
        )
        .bind(&mapping.option_id)
        .bind(&mapping.course_id)
        .bind(Json(&mapping.rule))
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    info!("Upserted {} course-option mappings", mappings.len());
    Ok(mappings.len())
}
