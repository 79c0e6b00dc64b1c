//! Completion-criteria predicate.
//!
//! A step's output satisfies its criterion when the trimmed criterion occurs
//! as a case-insensitive substring of the output. An absent or blank
//! criterion means the step has no completion requirement.

/// Decide whether `output` satisfies `criteria`.
///
/// Pure, no failure modes. Criteria are trimmed before matching; matching is
/// case-insensitive.
pub fn criteria_satisfied(output: &str, criteria: Option<&str>) -> bool {
    let Some(criteria) = criteria else {
        return true;
    };
    let needle = criteria.trim();
    if needle.is_empty() {
        return true;
    }
    output.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_criteria_always_satisfied() {
        assert!(criteria_satisfied("anything", None));
        assert!(criteria_satisfied("", None));
    }

    #[test]
    fn test_blank_criteria_always_satisfied() {
        assert!(criteria_satisfied("anything", Some("")));
        assert!(criteria_satisfied("anything", Some("   \t ")));
        assert!(criteria_satisfied("", Some("  ")));
    }

    #[test]
    fn test_substring_match() {
        assert!(criteria_satisfied("hello WORLD", Some("WORLD")));
        assert!(!criteria_satisfied("hello", Some("WORLD")));
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert!(criteria_satisfied("hello world", Some("WORLD")));
        assert!(criteria_satisfied("HELLO WORLD", Some("world")));
    }

    #[test]
    fn test_criteria_trimmed_before_matching() {
        assert!(criteria_satisfied("done.", Some("  done  ")));
        assert!(!criteria_satisfied("do ne", Some("  done  ")));
    }

    #[test]
    fn test_empty_output_with_nonblank_criteria() {
        assert!(!criteria_satisfied("", Some("DONE")));
    }
}
