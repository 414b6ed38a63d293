//! IGN extraction from free-form introduction text.
//!
//! Introductions are free-form messages like `ชื่อในเกม: Alice ID12345`.
//! Extraction is keyword-anchored: for each configured keyword we try an
//! anchored capture first and fall back to a plain substring split when
//! the capture misses (unusual spacing). The first keyword that yields a
//! non-empty name wins.

use fancy_regex::{escape, Regex};

/// Upper bound on a captured name when the configured value is unusable.
pub const DEFAULT_IGN_MAX_LENGTH: usize = 100;

/// Extract an in-game name from message content.
///
/// Keywords are tried in order; per keyword the anchored pattern runs
/// first, then the substring fallback. Returns `None` when no keyword
/// yields a non-empty name. Never returns an empty or whitespace-only
/// string.
pub fn extract_ign(content: &str, keywords: &[String], max_len: usize) -> Option<String> {
    let text = content.trim();
    if text.is_empty() {
        return None;
    }

    let max_len = if max_len == 0 {
        DEFAULT_IGN_MAX_LENGTH
    } else {
        max_len
    };

    for keyword in keywords {
        if keyword.is_empty() {
            continue;
        }

        // Anchored capture: keyword, optional separators, then up to
        // max_len non-newline characters.
        let pattern = format!(
            r"(?i){}[：:=\-\s]*([^\n]{{1,{}}})",
            escape(keyword),
            max_len
        );
        if let Ok(regex) = Regex::new(&pattern) {
            if let Ok(Some(captures)) = regex.captures(text) {
                if let Some(part) = captures.get(1) {
                    if let Some(ign) = clean_capture(part.as_str()) {
                        return Some(ign);
                    }
                }
            }
        }

        // Substring fallback: everything after the keyword's first
        // literal occurrence, first line only.
        if let Some(idx) = text.find(keyword.as_str()) {
            let rest = strip_leading_separators(&text[idx + keyword.len()..]);
            let rest: String = rest.chars().take(max_len).collect();
            let rest = rest.split('\n').next().unwrap_or("");
            if let Some(ign) = clean_capture(rest) {
                return Some(ign);
            }
        }
    }

    None
}

/// Cut at the player-ID marker, strip brackets, trim. Returns `None`
/// when nothing usable remains.
fn clean_capture(part: &str) -> Option<String> {
    // The anchored pattern can backtrack a separator into the capture.
    let part = strip_leading_separators(part);
    let part = cut_at_id_marker(part);
    let cleaned: String = part
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '[' | ']' | '{' | '}'))
        .collect();
    let ign = cleaned.trim();
    if ign.is_empty() {
        None
    } else {
        Some(ign.to_string())
    }
}

/// Truncate at the first `ID`/`UID` token or the Thai `ไอดี` marker;
/// these start a secondary player-ID field (often run together with the
/// digits, as in `ID12345`) that must not leak into the name.
fn cut_at_id_marker(part: &str) -> &str {
    let regex = match Regex::new(r"(?i)\b(?:ID|UID)|ไอดี") {
        Ok(regex) => regex,
        Err(_) => return part,
    };
    match regex.find(part) {
        Ok(Some(found)) => &part[..found.start()],
        _ => part,
    }
}

fn strip_leading_separators(text: &str) -> &str {
    text.trim_start_matches(|c: char| matches!(c, ':' | '：' | '=' | '-') || c.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_basic_extraction() {
        let kw = keywords(&["ชื่อในเกม"]);
        assert_eq!(
            extract_ign("ชื่อในเกม: Alice", &kw, 100),
            Some("Alice".to_string())
        );
        assert_eq!(
            extract_ign("ชื่อในเกม = Bob", &kw, 100),
            Some("Bob".to_string())
        );
        assert_eq!(
            extract_ign("ชื่อในเกม Carol", &kw, 100),
            Some("Carol".to_string())
        );
    }

    #[test]
    fn test_no_keyword_returns_none() {
        let kw = keywords(&["ชื่อในเกม"]);
        assert_eq!(extract_ign("no keyword here", &kw, 100), None);
        assert_eq!(extract_ign("", &kw, 100), None);
        assert_eq!(extract_ign("   \n  ", &kw, 100), None);
    }

    #[test]
    fn test_id_marker_truncation() {
        let kw = keywords(&["ชื่อในเกม"]);
        assert_eq!(
            extract_ign("ชื่อในเกม: Alice ID12345", &kw, 100),
            Some("Alice".to_string())
        );
        assert_eq!(
            extract_ign("ชื่อในเกม: Bob UID 999", &kw, 100),
            Some("Bob".to_string())
        );
        assert_eq!(
            extract_ign("ชื่อในเกม: Carol ไอดี 123", &kw, 100),
            Some("Carol".to_string())
        );
    }

    #[test]
    fn test_id_inside_word_is_kept() {
        // "David" contains "id" but not as a standalone token
        let kw = keywords(&["IGN"]);
        assert_eq!(
            extract_ign("IGN: David", &kw, 100),
            Some("David".to_string())
        );
    }

    #[test]
    fn test_brackets_stripped_anywhere() {
        let kw = keywords(&["ชื่อในเกม"]);
        assert_eq!(
            extract_ign("ชื่อในเกม(Bob)", &kw, 100),
            Some("Bob".to_string())
        );
        assert_eq!(
            extract_ign("ชื่อในเกม: [Al]ice", &kw, 100),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn test_capture_stops_at_newline() {
        let kw = keywords(&["IGN"]);
        assert_eq!(
            extract_ign("IGN: Alice\nage: 20", &kw, 100),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn test_max_length_truncation() {
        let kw = keywords(&["IGN"]);
        let long = "a".repeat(50);
        let result = extract_ign(&format!("IGN: {}", long), &kw, 10).unwrap();
        assert_eq!(result.chars().count(), 10);
    }

    #[test]
    fn test_zero_max_length_falls_back_to_default() {
        let kw = keywords(&["IGN"]);
        assert_eq!(
            extract_ign("IGN: Alice", &kw, 0),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn test_first_keyword_wins() {
        let kw = keywords(&["ชื่อในเกม", "IGN"]);
        assert_eq!(
            extract_ign("IGN: Second ชื่อในเกม: First", &kw, 100),
            Some("First".to_string())
        );
    }

    #[test]
    fn test_keyword_with_no_value_tries_next() {
        let kw = keywords(&["ชื่อในเกม", "IGN"]);
        assert_eq!(
            extract_ign("ชื่อในเกม: ()\nIGN: Alice", &kw, 100),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn test_case_insensitive_keyword() {
        let kw = keywords(&["ign"]);
        assert_eq!(
            extract_ign("IGN: Alice", &kw, 100),
            Some("Alice".to_string())
        );
    }

    #[test]
    fn test_never_returns_empty_string() {
        let kw = keywords(&["IGN"]);
        assert_eq!(extract_ign("IGN:", &kw, 100), None);
        assert_eq!(extract_ign("IGN: ()", &kw, 100), None);
        assert_eq!(extract_ign("IGN:    ", &kw, 100), None);
        assert_eq!(extract_ign("IGN: ID123", &kw, 100), None);
    }

    #[test]
    fn test_fullwidth_colon_separator() {
        let kw = keywords(&["ชื่อในเกม"]);
        assert_eq!(
            extract_ign("ชื่อในเกม： Alice", &kw, 100),
            Some("Alice".to_string())
        );
    }
}
