//! Course Scorer: rates how well a course suits a student profile.
//!
//! Default: `HeuristicScorer` (pure, synchronous, deterministic). Six additive
//! rules each contribute a capped number of points and one or more
//! human-readable explanations:
//!
//! | rule               | max |
//! |--------------------|-----|
//! | goal match         | 40  |
//! | program fit        | 15  |
//! | prerequisites      | 15  |
//! | term availability  | 10  |
//! | workload alignment | 10  |
//! | level progression  | 10  |
//!
//! `AppState` holds an `Arc<dyn CourseScorer>`.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::models::course::Course;
use crate::models::profile::UserProfile;
use crate::recommendation::terms::{next_term_code, term_level};

pub const GOAL_MATCH_MAX: u32 = 40;
const POINTS_PER_GOAL_MATCH: u32 = 10;
pub const MAX_SCORE: u32 = 100;

/// Neutral value for rules whose inputs are absent.
const NEUTRAL: u32 = 5;

// ────────────────────────────────────────────────────────────────────────────
// Output data models
// ────────────────────────────────────────────────────────────────────────────

/// Points awarded by each rule, in evaluation order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub goal_match: u32,
    pub program_fit: u32,
    pub prerequisites: u32,
    pub term_availability: u32,
    pub workload: u32,
    pub level_progression: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.goal_match
            + self.program_fit
            + self.prerequisites
            + self.term_availability
            + self.workload
            + self.level_progression
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    /// 0 – 100
    pub score: u32,
    /// Rule explanations in fixed rule order; display code relies on it.
    pub explanation: Vec<String>,
    /// Reserved for option/specialization credit. Never populated.
    pub counts_toward: Vec<String>,
    pub prereqs_met: bool,
    pub next_offered: Vec<String>,
    /// 0 – 10
    pub workload_score: u32,
    pub breakdown: ScoreBreakdown,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// Scores one course for one profile. Implementations must be pure: the
/// same inputs always produce the same `ScoreResult`.
pub trait CourseScorer: Send + Sync {
    fn score(&self, course: &Course, profile: &UserProfile, goal_tags: &[String]) -> ScoreResult;

    /// Short label for logs and API transparency.
    fn backend(&self) -> &'static str;
}

// ────────────────────────────────────────────────────────────────────────────
// HeuristicScorer
// ────────────────────────────────────────────────────────────────────────────

pub struct HeuristicScorer;

impl CourseScorer for HeuristicScorer {
    fn score(&self, course: &Course, profile: &UserProfile, goal_tags: &[String]) -> ScoreResult {
        score_course(course, profile, goal_tags)
    }

    fn backend(&self) -> &'static str {
        "heuristic"
    }
}

/// Points plus the explanations a single rule produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleOutcome {
    pub points: u32,
    pub explanations: Vec<String>,
}

impl RuleOutcome {
    fn new(points: u32) -> Self {
        Self {
            points,
            explanations: Vec::new(),
        }
    }

    fn explained(points: u32, explanation: impl Into<String>) -> Self {
        Self {
            points,
            explanations: vec![explanation.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrerequisiteOutcome {
    pub rule: RuleOutcome,
    pub met: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TermOutcome {
    pub rule: RuleOutcome,
    pub offered_terms: Vec<String>,
}

#[instrument(level = "debug", skip_all, fields(course_id = %course.id))]
pub fn score_course(course: &Course, profile: &UserProfile, goal_tags: &[String]) -> ScoreResult {
    let goal = goal_match(course, goal_tags);
    let program = program_fit(course, profile);
    let prereqs = check_prerequisites(course, &profile.completed_courses);
    let term = term_availability(course, profile.current_term.as_deref());
    let workload = workload_alignment(course, profile.max_workload());
    let level = level_progression(course, profile.current_term.as_deref());

    let breakdown = ScoreBreakdown {
        goal_match: goal.points,
        program_fit: program.points,
        prerequisites: prereqs.rule.points,
        term_availability: term.rule.points,
        workload: workload.points,
        level_progression: level.points,
    };

    // Every rule is individually capped, so the sum never exceeds 100.
    let score = breakdown.total().min(MAX_SCORE);

    debug!(score, ?breakdown, prereqs_met = prereqs.met, "Course scored");

    let explanation = [
        goal.explanations,
        program.explanations,
        prereqs.rule.explanations,
        term.rule.explanations,
        workload.explanations,
        level.explanations,
    ]
    .concat();

    ScoreResult {
        score,
        explanation,
        counts_toward: Vec::new(),
        prereqs_met: prereqs.met,
        next_offered: term.offered_terms,
        workload_score: workload.points,
        breakdown,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Rules
// ────────────────────────────────────────────────────────────────────────────

/// A skill matches when it contains a goal tag or is contained by one
/// (case-insensitive).
pub fn goal_match(course: &Course, goal_tags: &[String]) -> RuleOutcome {
    let goals: Vec<String> = goal_tags.iter().map(|g| g.to_lowercase()).collect();

    let matches: Vec<String> = course
        .skills
        .iter()
        .map(|s| s.to_lowercase())
        .filter(|skill| {
            goals
                .iter()
                .any(|goal| skill.contains(goal.as_str()) || goal.contains(skill.as_str()))
        })
        .collect();

    if matches.is_empty() {
        return RuleOutcome::explained(0, "Limited alignment with your stated goals");
    }

    let points = (matches.len() as u32 * POINTS_PER_GOAL_MATCH).min(GOAL_MATCH_MAX);
    RuleOutcome::explained(points, format!("Matches your goals: {}", matches.join(", ")))
}

pub fn program_fit(course: &Course, profile: &UserProfile) -> RuleOutcome {
    let mut outcome = RuleOutcome::new(0);

    if let Some(program) = profile.program.as_deref().filter(|p| !p.is_empty()) {
        if course.dept == program {
            outcome.points += 10;
            outcome
                .explanations
                .push(format!("Same department as your program ({program})"));
        } else {
            outcome.points += 5;
            outcome
                .explanations
                .push(format!("Cross-departmental course ({})", course.dept));
        }
    }

    if let Some(term) = current_term(profile.current_term.as_deref()) {
        if course.level >= term_level(term) {
            outcome.points += 5;
            outcome
                .explanations
                .push(format!("Appropriate level for {term}"));
        }
    }

    outcome
}

/// Substring containment against completed course ids. Deliberately loose:
/// "ECE 15" is satisfied by "ECE 150".
pub fn check_prerequisites(course: &Course, completed_courses: &[String]) -> PrerequisiteOutcome {
    let raw = match course.prereqs.as_deref() {
        Some(raw) if !raw.is_empty() => raw,
        _ => {
            return PrerequisiteOutcome {
                rule: RuleOutcome::explained(15, "No prerequisites required"),
                met: true,
            }
        }
    };

    let completed: Vec<String> = completed_courses.iter().map(|c| c.to_lowercase()).collect();
    let required: Vec<String> = raw.split(',').map(|p| p.trim().to_lowercase()).collect();
    let met_count = required
        .iter()
        .filter(|prereq| completed.iter().any(|c| c.contains(prereq.as_str())))
        .count();
    let all_met = met_count == required.len();

    let rule = if all_met {
        RuleOutcome::explained(15, "All prerequisites met")
    } else if met_count > 0 {
        RuleOutcome::explained(
            8,
            format!("Some prerequisites met ({met_count}/{})", required.len()),
        )
    } else {
        RuleOutcome::explained(0, format!("Prerequisites not met: {raw}"))
    };

    PrerequisiteOutcome { rule, met: all_met }
}

/// Offered-term codes are seasons (F/W/S) while the successor is an academic
/// term code, so the 10-point branch only fires for catalogs that list
/// academic terms.
pub fn term_availability(course: &Course, current: Option<&str>) -> TermOutcome {
    if course.terms_offered.is_empty() {
        return TermOutcome {
            rule: RuleOutcome::explained(NEUTRAL, "Term availability unknown"),
            offered_terms: Vec::new(),
        };
    }

    let offered_terms = course.terms_offered.clone();
    let offered_in = format!("Offered in: {}", offered_terms.join(", "));

    let rule = match current_term(current) {
        Some(term) => {
            let next = next_term_code(term);
            if offered_terms.iter().any(|t| t == next) {
                RuleOutcome::explained(10, format!("Offered next term ({next})"))
            } else {
                RuleOutcome::explained(NEUTRAL, offered_in)
            }
        }
        None => RuleOutcome::explained(NEUTRAL, offered_in),
    };

    TermOutcome {
        rule,
        offered_terms,
    }
}

/// Binary cliff: within the ceiling earns 10, anything over earns 2.
pub fn workload_alignment(course: &Course, max_workload: Option<f64>) -> RuleOutcome {
    let (workload, max) = match (&course.workload, max_workload) {
        (Some(w), Some(max)) if max > 0.0 => (w, max),
        _ => return RuleOutcome::new(NEUTRAL),
    };

    let total = workload.total_hours();
    if total <= max {
        RuleOutcome::explained(10, format!("Workload fits your constraints ({total}/week)"))
    } else {
        RuleOutcome::explained(2, format!("Heavy workload ({total}/week)"))
    }
}

pub fn level_progression(course: &Course, current: Option<&str>) -> RuleOutcome {
    let Some(term) = current_term(current) else {
        return RuleOutcome::new(NEUTRAL);
    };

    let band_start = term_level(term);
    if (band_start..=band_start + 100).contains(&course.level) {
        RuleOutcome::explained(10, format!("Appropriate level for {term}"))
    } else if course.level < band_start {
        RuleOutcome::explained(3, format!("Lower level course ({}xx)", course.level))
    } else {
        RuleOutcome::explained(7, format!("Advanced course ({}xx)", course.level))
    }
}

fn current_term(term: Option<&str>) -> Option<&str> {
    term.filter(|t| !t.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::course::Workload;
    use crate::models::profile::ProfileConstraints;
    use uuid::Uuid;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn make_course(dept: &str, level: i32, skills: &[&str], prereqs: Option<&str>) -> Course {
        Course {
            id: format!("{dept}{level}"),
            title: "Test Course".to_string(),
            dept: dept.to_string(),
            level,
            skills: tags(skills),
            prereqs: prereqs.map(String::from),
            terms_offered: tags(&["F", "W"]),
            ..Default::default()
        }
    }

    fn make_profile(program: &str, term: &str, completed: &[&str], goals: &[&str]) -> UserProfile {
        UserProfile {
            user_id: Uuid::nil(),
            program: Some(program.to_string()),
            current_term: Some(term.to_string()),
            completed_courses: tags(completed),
            goal_tags: tags(goals),
            ..Default::default()
        }
    }

    fn ece486() -> Course {
        make_course(
            "ECE",
            400,
            &["robotics", "control", "dynamics"],
            Some("ECE 380, MATH 211"),
        )
    }

    #[test]
    fn test_goal_match_counts_matching_skills() {
        let course = make_course("ECE", 400, &["robotics", "control"], None);
        let outcome = goal_match(&course, &tags(&["robotics"]));
        assert_eq!(outcome.points, 10);
        assert_eq!(outcome.explanations, vec!["Matches your goals: robotics"]);

        let outcome = goal_match(&course, &tags(&["robotics", "control"]));
        assert_eq!(outcome.points, 20);
    }

    #[test]
    fn test_goal_match_is_bidirectional_and_case_insensitive() {
        let course = make_course("ECE", 400, &["Machine Learning", "ai"], None);
        // "machine learning" contains "learning"; "ai" is contained by "ai ethics"
        let outcome = goal_match(&course, &tags(&["LEARNING", "AI ethics"]));
        assert_eq!(outcome.points, 20);
        assert_eq!(
            outcome.explanations,
            vec!["Matches your goals: machine learning, ai"]
        );
    }

    #[test]
    fn test_goal_match_caps_at_40() {
        let course = make_course("ECE", 300, &["a", "ab", "abc", "abcd", "abcde"], None);
        assert_eq!(goal_match(&course, &tags(&["a"])).points, 40);
    }

    #[test]
    fn test_no_goal_match_is_neutral_not_penalty() {
        let course = make_course("ECE", 300, &["circuits"], None);
        let outcome = goal_match(&course, &tags(&["finance"]));
        assert_eq!(outcome.points, 0);
        assert_eq!(
            outcome.explanations,
            vec!["Limited alignment with your stated goals"]
        );
    }

    #[test]
    fn test_same_department_scores_at_least_10() {
        let course = make_course("ECE", 100, &[], None);
        let profile = make_profile("ECE", "4A", &[], &[]);
        let outcome = program_fit(&course, &profile);
        assert_eq!(outcome.points, 10);
        assert_eq!(
            outcome.explanations,
            vec!["Same department as your program (ECE)"]
        );
    }

    #[test]
    fn test_cross_department_never_zero() {
        let course = make_course("MATH", 300, &[], None);
        let profile = make_profile("ECE", "3A", &[], &[]);
        let outcome = program_fit(&course, &profile);
        assert_eq!(outcome.points, 10); // 5 cross-dept + 5 level
        assert_eq!(outcome.explanations[0], "Cross-departmental course (MATH)");
        assert_eq!(outcome.explanations[1], "Appropriate level for 3A");
    }

    #[test]
    fn test_program_fit_without_program_or_term() {
        let course = make_course("ECE", 300, &[], None);
        let profile = UserProfile::default();
        assert_eq!(program_fit(&course, &profile).points, 0);
    }

    #[test]
    fn test_no_prereqs_awards_full_and_met() {
        for prereqs in [None, Some("")] {
            let course = make_course("ECE", 300, &[], prereqs);
            let outcome = check_prerequisites(&course, &[]);
            assert_eq!(outcome.rule.points, 15);
            assert!(outcome.met);
            assert_eq!(outcome.rule.explanations, vec!["No prerequisites required"]);
        }
    }

    #[test]
    fn test_partial_prereqs() {
        let outcome = check_prerequisites(&ece486(), &tags(&["ece 380"]));
        assert_eq!(outcome.rule.points, 8);
        assert!(!outcome.met);
        assert_eq!(outcome.rule.explanations, vec!["Some prerequisites met (1/2)"]);
    }

    #[test]
    fn test_no_prereqs_met() {
        let outcome = check_prerequisites(&ece486(), &tags(&["CS 135"]));
        assert_eq!(outcome.rule.points, 0);
        assert!(!outcome.met);
        assert_eq!(
            outcome.rule.explanations,
            vec!["Prerequisites not met: ECE 380, MATH 211"]
        );
    }

    #[test]
    fn test_prereq_substring_match_is_permissive() {
        // Known false positive: "ECE 15" is satisfied by "ECE 150".
        let course = make_course("ECE", 300, &[], Some("ECE 15"));
        let outcome = check_prerequisites(&course, &tags(&["ECE 150"]));
        assert!(outcome.met);
        assert_eq!(outcome.rule.points, 15);
    }

    #[test]
    fn test_term_availability_season_codes_score_neutral() {
        let course = make_course("ECE", 300, &[], None);
        let outcome = term_availability(&course, Some("2A"));
        assert_eq!(outcome.rule.points, 5);
        assert_eq!(outcome.rule.explanations, vec!["Offered in: F, W"]);
        assert_eq!(outcome.offered_terms, tags(&["F", "W"]));
    }

    #[test]
    fn test_term_availability_next_term_listed() {
        let mut course = make_course("ECE", 300, &[], None);
        course.terms_offered = tags(&["2B", "3A"]);
        let outcome = term_availability(&course, Some("2A"));
        assert_eq!(outcome.rule.points, 10);
        assert_eq!(outcome.rule.explanations, vec!["Offered next term (2B)"]);
    }

    #[test]
    fn test_term_4b_is_its_own_successor() {
        let mut course = make_course("ECE", 400, &[], None);
        course.terms_offered = tags(&["4B"]);
        assert_eq!(term_availability(&course, Some("4B")).rule.points, 10);
    }

    #[test]
    fn test_term_availability_unknown_when_empty() {
        let mut course = make_course("ECE", 300, &[], None);
        course.terms_offered.clear();
        let outcome = term_availability(&course, Some("2A"));
        assert_eq!(outcome.rule.points, 5);
        assert!(outcome.offered_terms.is_empty());
        assert_eq!(outcome.rule.explanations, vec!["Term availability unknown"]);
    }

    #[test]
    fn test_heavy_workload_scores_2() {
        let mut course = make_course("ECE", 300, &[], None);
        course.workload = Some(Workload {
            reading: 2.0,
            assignments: 3.0,
            projects: 1.0,
            labs: 1.0,
        });
        let outcome = workload_alignment(&course, Some(4.0));
        assert_eq!(outcome.points, 2);
        assert_eq!(outcome.explanations, vec!["Heavy workload (7/week)"]);
    }

    #[test]
    fn test_light_workload_scores_10() {
        let mut course = make_course("ECE", 300, &[], None);
        course.workload = Some(Workload {
            reading: 1.5,
            labs: 1.0,
            ..Default::default()
        });
        let outcome = workload_alignment(&course, Some(4.0));
        assert_eq!(outcome.points, 10);
        assert_eq!(
            outcome.explanations,
            vec!["Workload fits your constraints (2.5/week)"]
        );
    }

    #[test]
    fn test_fractional_ceiling_is_compared_exactly() {
        let mut course = make_course("ECE", 300, &[], None);
        course.workload = Some(Workload {
            reading: 2.0,
            assignments: 1.5,
            ..Default::default()
        });
        assert_eq!(workload_alignment(&course, Some(3.5)).points, 10);
        assert_eq!(workload_alignment(&course, Some(3.4)).points, 2);
    }

    #[test]
    fn test_workload_defaults_to_neutral() {
        let course = make_course("ECE", 300, &[], None);
        assert_eq!(workload_alignment(&course, Some(4.0)).points, 5);

        let mut with_load = course.clone();
        with_load.workload = Some(Workload::default());
        assert_eq!(workload_alignment(&with_load, None).points, 5);
        assert_eq!(workload_alignment(&with_load, Some(0.0)).points, 5);
        assert!(workload_alignment(&with_load, None).explanations.is_empty());
    }

    #[test]
    fn test_level_progression_bands() {
        let cases = [
            (300, 10, "Appropriate level for 3A"),
            (400, 10, "Appropriate level for 3A"),
            (200, 3, "Lower level course (200xx)"),
            (500, 7, "Advanced course (500xx)"),
        ];
        for (level, points, text) in cases {
            let course = make_course("ECE", level, &[], None);
            let outcome = level_progression(&course, Some("3A"));
            assert_eq!(outcome.points, points, "level {level}");
            assert_eq!(outcome.explanations, vec![text]);
        }
    }

    #[test]
    fn test_level_progression_without_term_is_neutral() {
        let course = make_course("ECE", 300, &[], None);
        let outcome = level_progression(&course, None);
        assert_eq!(outcome.points, 5);
        assert!(outcome.explanations.is_empty());
    }

    #[test]
    fn test_end_to_end_ece486() {
        let profile = make_profile("ECE", "3B", &["ECE 380", "MATH 211"], &["robotics"]);
        let result = score_course(&ece486(), &profile, &profile.goal_tags);

        assert_eq!(
            result.breakdown,
            ScoreBreakdown {
                goal_match: 10,
                program_fit: 15,
                prerequisites: 15,
                term_availability: 5,
                workload: 5,
                level_progression: 10,
            }
        );
        assert_eq!(result.score, 60);
        assert!(result.prereqs_met);
        assert_eq!(result.workload_score, 5);
        assert_eq!(result.next_offered, tags(&["F", "W"]));
        assert!(result.counts_toward.is_empty());
        assert_eq!(
            result.explanation,
            vec![
                "Matches your goals: robotics",
                "Same department as your program (ECE)",
                "Appropriate level for 3B",
                "All prerequisites met",
                "Offered in: F, W",
                "Appropriate level for 3B",
            ]
        );
    }

    #[test]
    fn test_maximum_score_is_100() {
        let mut course = make_course("ECE", 200, &["a", "b", "c", "d"], None);
        course.terms_offered = tags(&["2B"]);
        course.workload = Some(Workload {
            reading: 1.0,
            ..Default::default()
        });
        let mut profile = make_profile("ECE", "2A", &[], &["a", "b", "c", "d"]);
        profile.constraints = Some(ProfileConstraints {
            max_workload: Some(5.0),
            ..Default::default()
        });

        let result = score_course(&course, &profile, &profile.goal_tags);
        assert_eq!(result.breakdown.total(), 100);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_scoring_is_deterministic() {
        let profile = make_profile("ECE", "3B", &["ECE 380"], &["control"]);
        let scorer = HeuristicScorer;
        let first = scorer.score(&ece486(), &profile, &profile.goal_tags);
        let second = scorer.score(&ece486(), &profile, &profile.goal_tags);
        assert_eq!(first, second);
        assert_eq!(scorer.backend(), "heuristic");
    }
}
