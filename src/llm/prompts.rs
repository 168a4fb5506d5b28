//! Prompt text for interest classification.

use crate::llm::criteria::Criteria;

/// System instruction for providers that support JSON-constrained output.
pub const JSON_ONLY: &str = "You are a strict JSON generator. \
Respond with a single JSON object and nothing else. \
Do not wrap it in markdown, do not add commentary.";

/// Render the main classification instruction around `post`.
pub fn is_post_interesting(post: &str) -> String {
    format!(
        r#"You are an assistant that evaluates how interesting a post is for a human reader.
You will be given a set of criteria defining "interesting" and "uninteresting" topics.

For each post, output a single number from 0 to 1 that represents the post's level of interest:
- 1 means highly interesting
- 0 means completely uninteresting
- Intermediate values represent partial interest based on the criteria.

If the post does not exactly match any criteria, estimate the score by interpolating between interesting and uninteresting topics.

Do NOT return any text other than the numeric score.
Post to analyze: "{post}""#
    )
}

/// `"<label> topics: a, b, c."`
pub fn topics_line(label: &str, topics: &[String]) -> String {
    format!("{label} topics: {}.", topics.join(", "))
}

pub fn interesting_line(criteria: &Criteria) -> String {
    topics_line("Interesting", &criteria.interesting)
}

pub fn uninteresting_line(criteria: &Criteria) -> String {
    topics_line("Uninteresting", &criteria.uninteresting)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_is_quoted_in_prompt() {
        let prompt = is_post_interesting("New borrow checker landed");
        assert!(prompt.ends_with("Post to analyze: \"New borrow checker landed\""));
        assert!(prompt.contains("single number from 0 to 1"));
    }

    #[test]
    fn topics_are_comma_joined() {
        let criteria = Criteria::new(
            vec!["rust".into(), "databases".into()],
            vec!["sports".into()],
        );
        assert_eq!(
            interesting_line(&criteria),
            "Interesting topics: rust, databases."
        );
        assert_eq!(uninteresting_line(&criteria), "Uninteresting topics: sports.");
    }
}
