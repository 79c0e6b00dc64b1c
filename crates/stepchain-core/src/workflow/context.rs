//! Context injection for sequential steps.
//!
//! Each step after the first sees the previous step's output prepended to its
//! own prompt template. The template itself is never rewritten.

/// Build the prompt sent to the model for a step.
///
/// With no previous output (first step, or a predecessor output that is
/// blank after trimming) the template is returned unchanged.
pub fn build_prompt(template: &str, previous_output: Option<&str>) -> String {
    match previous_output {
        Some(prev) if !prev.trim().is_empty() => {
            format!("Previous step output:\n{prev}\n\nCurrent step:\n{template}")
        }
        _ => template.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_step_uses_template_verbatim() {
        assert_eq!(build_prompt("Write a haiku", None), "Write a haiku");
    }

    #[test]
    fn test_previous_output_is_prepended() {
        let prompt = build_prompt("Translate it to French", Some("An old pond"));
        assert_eq!(
            prompt,
            "Previous step output:\nAn old pond\n\nCurrent step:\nTranslate it to French"
        );
    }

    #[test]
    fn test_empty_previous_output_leaves_template_unchanged() {
        assert_eq!(build_prompt("Write a haiku", Some("")), "Write a haiku");
    }

    #[test]
    fn test_whitespace_previous_output_leaves_template_unchanged() {
        assert_eq!(build_prompt("Write a haiku", Some("   \n ")), "Write a haiku");
        assert_eq!(build_prompt("Write a haiku", Some("\t")), "Write a haiku");
    }

    #[test]
    fn test_template_not_rewritten() {
        let prompt = build_prompt("Keep {placeholders} intact", Some("out"));
        assert!(prompt.ends_with("Current step:\nKeep {placeholders} intact"));
    }
}
