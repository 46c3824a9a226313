//! Role Matcher: maps free-text roles to canonical reference titles.
//!
//! Matching is exact after trimming and case-folding. "Senior Data Engineer" does not
//! match "data engineer": substring matching on titles injects skills for roles the
//! candidate never held.

use std::collections::HashSet;

/// Returns the canonical titles that exactly match at least one role.
/// Output follows `canonical_titles` order and never repeats a title.
pub fn match_roles<S: AsRef<str>>(roles: &[S], canonical_titles: &[String]) -> Vec<String> {
    let wanted: HashSet<String> = roles
        .iter()
        .map(|r| fold(r.as_ref()))
        .filter(|r| !r.is_empty())
        .collect();

    let mut seen = HashSet::new();
    canonical_titles
        .iter()
        .filter(|title| wanted.contains(&fold(title)))
        .filter(|title| seen.insert(fold(title)))
        .cloned()
        .collect()
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_substring_is_not_a_match() {
        let matched = match_roles(&["Senior Data Engineer"], &titles(&["data engineer"]));
        assert!(matched.is_empty());
    }

    #[test]
    fn test_case_and_whitespace_are_ignored() {
        let canonical = titles(&["data engineer"]);
        for role in ["Data Engineer", "  DATA ENGINEER ", "data engineer"] {
            assert_eq!(match_roles(&[role], &canonical), vec!["data engineer"]);
        }
    }

    #[test]
    fn test_output_follows_canonical_order_without_duplicates() {
        let canonical = titles(&["analyst", "backend engineer", "data engineer"]);
        let roles = ["Data Engineer", "Backend Engineer", "data engineer", "Chef"];
        assert_eq!(
            match_roles(&roles, &canonical),
            vec!["backend engineer", "data engineer"]
        );
    }

    #[test]
    fn test_empty_inputs() {
        let none: [&str; 0] = [];
        assert!(match_roles(&none, &titles(&["analyst"])).is_empty());
        assert!(match_roles(&["Analyst"], &[]).is_empty());
        assert!(match_roles(&["   "], &titles(&[""])).is_empty());
    }
}
