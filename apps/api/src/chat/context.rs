//! Prompt context assembly for advisor chat turns.

use std::fmt::Write;

use crate::catalog::documents::DocChunk;
use crate::chat::prompts::ADVISOR_SYSTEM_TEMPLATE;
use crate::llm_client::prompts::GROUNDING_INSTRUCTION;
use crate::models::course::Course;
use crate::models::profile::UserProfile;

/// Courses listed in the prompt context.
const CONTEXT_COURSE_LIMIT: usize = 5;
const DESCRIPTION_PREVIEW_CHARS: usize = 200;
const DOC_PREVIEW_CHARS: usize = 300;
pub const CITATION_PREVIEW_CHARS: usize = 200;

/// First `max_chars` characters followed by an ellipsis.
pub fn preview(text: &str, max_chars: usize) -> String {
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}

fn or_placeholder(items: &[String], placeholder: &str) -> String {
    if items.is_empty() {
        placeholder.to_string()
    } else {
        items.join(", ")
    }
}

fn profile_summary(profile: &UserProfile) -> String {
    format!(
        "- Program: {}\n- Current Term: {}\n- Goals: {}\n- Completed Courses: {}",
        profile.program.as_deref().unwrap_or("Not specified"),
        profile.current_term.as_deref().unwrap_or("Not specified"),
        or_placeholder(&profile.goal_tags, "Not specified"),
        or_placeholder(&profile.completed_courses, "None"),
    )
}

pub fn system_prompt(profile: &UserProfile) -> String {
    let mut prompt = ADVISOR_SYSTEM_TEMPLATE.replace("{profile}", &profile_summary(profile));
    prompt.push_str("\n\n");
    prompt.push_str(GROUNDING_INSTRUCTION);
    prompt
}

/// Context block appended to the student's message: matching courses,
/// retrieved document chunks, then the profile.
pub fn build_context(courses: &[Course], doc_chunks: &[DocChunk], profile: &UserProfile) -> String {
    let mut context = String::new();

    if !courses.is_empty() {
        context.push_str("Available Courses:\n");
        for course in courses.iter().take(CONTEXT_COURSE_LIMIT) {
            let _ = writeln!(context, "- {}: {} ({})", course.id, course.title, course.dept);
            let _ = writeln!(
                context,
                "  Description: {}",
                preview(
                    course.description.as_deref().unwrap_or_default(),
                    DESCRIPTION_PREVIEW_CHARS
                )
            );
            let _ = writeln!(context, "  Skills: {}", course.skills.join(", "));
            let _ = writeln!(context, "  Terms: {}\n", course.terms_offered.join(", "));
        }
    }

    if !doc_chunks.is_empty() {
        context.push_str("Relevant Information:\n");
        for (index, chunk) in doc_chunks.iter().enumerate() {
            let _ = writeln!(context, "{}. {}", index + 1, preview(&chunk.text, DOC_PREVIEW_CHARS));
            let _ = writeln!(
                context,
                "   Source: {}\n",
                chunk.source_url.as_deref().unwrap_or("unknown")
            );
        }
    }

    context.push_str("User Profile:\n");
    context.push_str(&profile_summary(profile));
    context.push('\n');
    context
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> UserProfile {
        UserProfile {
            program: Some("MTE".to_string()),
            current_term: Some("3A".to_string()),
            goal_tags: vec!["robotics".to_string(), "controls".to_string()],
            ..Default::default()
        }
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("abcdef", 3), "abc...");
        assert_eq!(preview("éé", 5), "éé...");
    }

    #[test]
    fn test_system_prompt_includes_profile_and_placeholders() {
        let prompt = system_prompt(&profile());
        assert!(prompt.contains("- Program: MTE"));
        assert!(prompt.contains("- Goals: robotics, controls"));
        assert!(prompt.contains("- Completed Courses: None"));
        assert!(prompt.ends_with(GROUNDING_INSTRUCTION));
        assert!(!prompt.contains("{profile}"));

        let empty = system_prompt(&UserProfile::default());
        assert!(empty.contains("- Program: Not specified"));
    }

    #[test]
    fn test_context_lists_at_most_five_courses() {
        let courses: Vec<Course> = (0..7)
            .map(|i| Course {
                id: format!("ECE{i}00"),
                title: format!("Course {i}"),
                dept: "ECE".to_string(),
                ..Default::default()
            })
            .collect();
        let context = build_context(&courses, &[], &profile());
        assert!(context.starts_with("Available Courses:\n- ECE000: Course 0 (ECE)"));
        assert!(context.contains("ECE400"));
        assert!(!context.contains("ECE500"));
        assert!(!context.contains("Relevant Information"));
        assert!(context.contains("User Profile:\n- Program: MTE"));
    }

    #[test]
    fn test_context_numbers_doc_chunks() {
        let chunks = vec![DocChunk {
            text: "The Mechatronics option requires ECE 486.".to_string(),
            source_url: Some("https://uwaterloo.ca/mte".to_string()),
            similarity: 0.82,
        }];
        let context = build_context(&[], &chunks, &profile());
        assert!(context.starts_with("Relevant Information:\n1. The Mechatronics option"));
        assert!(context.contains("   Source: https://uwaterloo.ca/mte"));
    }
}
