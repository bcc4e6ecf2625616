//! Question presets
//!
//! Intake stores preset keys plus free-form custom questions; the extraction
//! prompt needs the questions as they were actually asked on the call.

use crate::domain::entities::Call;

/// Preset key → question the agent asks
pub const QUESTION_PRESETS: &[(&str, &str)] = &[
    ("hours", "What are your opening hours today?"),
    ("wait_time", "How long is the current wait for a table?"),
    ("walk_ins", "Do you accept walk-ins?"),
    ("parking", "Is there parking available nearby?"),
    ("dress_code", "Is there a dress code?"),
    (
        "dietary",
        "Can you accommodate dietary restrictions such as vegetarian, vegan or gluten-free?",
    ),
    ("accessibility", "Is the restaurant wheelchair accessible?"),
    ("patio", "Do you have outdoor or patio seating?"),
    ("large_groups", "Can you seat large groups?"),
    ("corkage", "Do you allow bringing your own wine, and is there a corkage fee?"),
];

pub fn preset_question(key: &str) -> Option<&'static str> {
    let key = key.trim().to_lowercase();
    QUESTION_PRESETS
        .iter()
        .find(|(preset, _)| *preset == key)
        .map(|(_, question)| *question)
}

/// Questions asked on this call: presets first, then custom ones, deduplicated.
pub fn questions_asked(call: &Call) -> Vec<String> {
    let mut questions: Vec<String> = Vec::new();

    for key in &call.question_presets {
        match preset_question(key) {
            Some(question) => questions.push(question.to_string()),
            None => tracing::debug!(preset = %key, call_id = %call.id, "Unknown question preset"),
        }
    }

    for custom in &call.custom_questions {
        let custom = custom.trim();
        if !custom.is_empty() {
            questions.push(custom.to_string());
        }
    }

    let mut seen = std::collections::HashSet::new();
    questions.retain(|q| seen.insert(q.to_lowercase()));
    questions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::CallIntent;

    #[test]
    fn test_questions_resolve_presets_and_customs() {
        let mut call = Call::new("call_1", CallIntent::QuestionsOnly);
        call.question_presets = vec!["hours".into(), "Parking".into(), "karaoke".into()];
        call.custom_questions = vec![
            "  Do you have a kids menu? ".into(),
            "".into(),
            "is there parking available nearby?".into(),
        ];

        assert_eq!(
            questions_asked(&call),
            vec![
                "What are your opening hours today?".to_string(),
                "Is there parking available nearby?".to_string(),
                "Do you have a kids menu?".to_string(),
            ]
        );
    }
}
