//! Candidate selection and normalization of raw provider fields.

use super::Candidate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LEADING_YEAR: Regex = Regex::new(r"^\s*(\d{4})").expect("valid year regex");
}

/// Picks the candidate whose title contains the query, then one whose title
/// is contained by the query, comparing case- and punctuation-insensitively.
/// Falls back to the first candidate.
pub fn select_best_match<'a>(query: &str, candidates: &'a [Candidate]) -> Option<&'a Candidate> {
    let needle = normalize_title(query);
    if needle.is_empty() {
        return candidates.first();
    }

    let titles: Vec<String> = candidates.iter().map(|c| normalize_title(&c.title)).collect();

    let containing = titles.iter().position(|t| t.contains(&needle));
    let contained = || {
        titles
            .iter()
            .position(|t| !t.is_empty() && needle.contains(t.as_str()))
    };

    containing
        .or_else(contained)
        .and_then(|idx| candidates.get(idx))
        .or_else(|| candidates.first())
}

/// Lowercase, punctuation dropped, whitespace collapsed to single spaces.
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Leading four-digit year of `YYYY`, `YYYY-MM` or `YYYY-MM-DD` dates.
pub fn leading_year(date: &str) -> Option<String> {
    LEADING_YEAR
        .captures(date)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// First non-blank entry of a list field.
pub fn first_of<S: AsRef<str>>(items: &[S]) -> Option<String> {
    items
        .iter()
        .map(|s| s.as_ref().trim())
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Name of the first crew member whose role equals `role` exactly.
pub fn crew_member_with_role<'a, T>(
    crew: &'a [T],
    role: &str,
    role_of: impl Fn(&T) -> Option<&str>,
    name_of: impl Fn(&'a T) -> Option<&'a str>,
) -> Option<String> {
    crew.iter()
        .filter(|member| role_of(*member) == Some(role))
        .find_map(|member| name_of(member).map(str::trim).filter(|n| !n.is_empty()))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MetadataResult;

    fn candidate(title: &str) -> Candidate {
        Candidate {
            id: title.to_lowercase(),
            title: title.to_string(),
            partial: MetadataResult::default(),
        }
    }

    #[test]
    fn test_containment_beats_provider_order() {
        let candidates = vec![candidate("Thinking"), candidate("Thinking Fast and Slow")];
        let best = select_best_match("Thinking Fast and Slow", &candidates).unwrap();
        assert_eq!(best.title, "Thinking Fast and Slow");
    }

    #[test]
    fn test_punctuation_is_ignored() {
        let candidates = vec![candidate("Thinking"), candidate("Thinking Fast and Slow")];
        let best = select_best_match("Thinking, Fast and Slow", &candidates).unwrap();
        assert_eq!(best.title, "Thinking Fast and Slow");
    }

    #[test]
    fn test_candidate_contained_in_query_is_second_choice() {
        let candidates = vec![candidate("Other"), candidate("Blue"), candidate("Blue Bird")];
        let best = select_best_match("Blue (Remastered)", &candidates).unwrap();
        assert_eq!(best.title, "Blue");
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(normalize_title("  Thinking,  Fast & Slow! "), "thinking fast slow");
        assert_eq!(normalize_title("768 / Can't Sleep"), "768 cant sleep");
    }

    #[test]
    fn test_case_insensitive() {
        let candidates = vec![candidate("Other"), candidate("DUNE: Deluxe Edition")];
        let best = select_best_match("dune", &candidates).unwrap();
        assert_eq!(best.title, "DUNE: Deluxe Edition");
    }

    #[test]
    fn test_falls_back_to_first() {
        let candidates = vec![candidate("Alpha"), candidate("Beta")];
        assert_eq!(select_best_match("Gamma", &candidates).unwrap().title, "Alpha");
        assert!(select_best_match("Gamma", &[]).is_none());
    }

    #[test]
    fn test_leading_year_formats() {
        assert_eq!(leading_year("1965"), Some("1965".to_string()));
        assert_eq!(leading_year("1965-08"), Some("1965".to_string()));
        assert_eq!(leading_year("1965-08-01"), Some("1965".to_string()));
        assert_eq!(leading_year("August 1965"), None);
        assert_eq!(leading_year(""), None);
    }

    #[test]
    fn test_first_of_skips_blanks() {
        assert_eq!(first_of(&["", " Frank Herbert ", "Other"]), Some("Frank Herbert".to_string()));
        assert_eq!(first_of::<&str>(&[]), None);
    }

    #[test]
    fn test_crew_member_with_exact_role() {
        let crew = vec![
            ("Director of Photography", "Roger Deakins"),
            ("Director", "Denis Villeneuve"),
            ("Director", "Someone Else"),
        ];
        let director = crew_member_with_role(&crew, "Director", |m| Some(m.0), |m| Some(m.1));
        assert_eq!(director, Some("Denis Villeneuve".to_string()));

        let none = crew_member_with_role(&crew, "Producer", |m| Some(m.0), |m| Some(m.1));
        assert_eq!(none, None);
    }
}
