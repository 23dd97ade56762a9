const RECOMMENDATION_TRIGGERS: &[&str] = &[
    "recommend courses",
    "suggest electives",
    "what courses should",
    "which electives",
    "best electives for",
    "good courses for",
    "options for",
    "course recommendations",
    "elective suggestions",
    "help me choose",
    "what electives",
];

const GREETINGS: &[&str] = &[
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

/// Whether a chat message explicitly asks for course recommendations.
///
/// Greeting detection is plain substring search, so any message containing
/// "hi" (e.g. "which electives") is treated as a greeting.
pub fn should_generate_recommendations(message: &str) -> bool {
    let message = message.to_lowercase();
    if GREETINGS.iter().any(|g| message.contains(g)) {
        return false;
    }
    RECOMMENDATION_TRIGGERS.iter().any(|t| message.contains(t))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_phrases_enable_recommendations() {
        assert!(should_generate_recommendations("Can you RECOMMEND COURSES for robotics?"));
        assert!(should_generate_recommendations("what electives fit a data career"));
        assert!(should_generate_recommendations("Course recommendations please"));
    }

    #[test]
    fn test_greetings_suppress_recommendations() {
        assert!(!should_generate_recommendations("hello, recommend courses"));
        assert!(!should_generate_recommendations("Hey there"));
    }

    #[test]
    fn test_greeting_substring_false_positive_is_preserved() {
        // "which" contains "hi".
        assert!(!should_generate_recommendations("which electives are best"));
    }

    #[test]
    fn test_plain_question_does_not_trigger() {
        assert!(!should_generate_recommendations("Is ECE 486 hard?"));
    }
}
