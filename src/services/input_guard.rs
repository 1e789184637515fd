//! Heuristic pre-filter for credential fields.
//!
//! Flags input that looks like a SQL injection payload so the API can answer
//! with a decoy message. This is a user-facing gimmick only: every store
//! query is parameterized regardless of what the guard decides.

use rand::seq::IndexedRandom;
use regex::RegexSet;
use std::sync::OnceLock;

const SIGNATURES: &[&str] = &[
    r"(?i)(\s|^)(SELECT|INSERT|UPDATE|DELETE|DROP|UNION|ALTER|EXEC|ORDER BY)(\s|$)",
    r"'--",
    r"/\*.*\*/",
    r";(\s|$)",
    r"(?i)'\s*OR\s*'\s*=\s*'",
    r"(?i)'\s*OR\s*1\s*=\s*1",
    r#"(?i)"\s*OR\s*".*"\s*=\s*""#,
    r#"(?i)"\s*OR\s*1\s*=\s*1"#,
    r"(?i)'\s*OR\s*'\d+'\s*=\s*'\d+",
    r"(?i)SLEEP\(\d+\)",
    r"(?i)BENCHMARK\(\d+,.*\)",
    r"(?i)WAITFOR DELAY '\d+:\d+:\d+'",
];

const DECOY_MESSAGES: &[&str] = &[
    "Nice try, script kiddie. Your attempt has been logged in the database. Just kidding!",
    "SQL injection, in this day and age? You have been recorded. (Not really, but it sounds scary.)",
    "SELECT * FROM hackers WHERE skill = 'beginner' AND needs_practice = TRUE; ... found you!",
    "How cute, an injection attempt. My grandmother hacks better, and she thinks SQL is a detergent brand.",
    "DROP TABLE students; -- did you really think that would work? Come back when you are a pro.",
    "Every injection attempt makes a developer cry. Think of the developers. Be kind.",
];

fn signatures() -> &'static RegexSet {
    static SET: OnceLock<RegexSet> = OnceLock::new();
    SET.get_or_init(|| RegexSet::new(SIGNATURES).expect("Invalid injection signature defined in code"))
}

/// Returns true if `input` matches any injection signature.
#[must_use]
pub fn is_suspicious(input: &str) -> bool {
    !input.is_empty() && signatures().is_match(input)
}

/// Returns the name of the first field whose value looks malicious.
#[must_use]
pub fn first_suspicious<'a>(fields: &[(&'a str, &str)]) -> Option<&'a str> {
    fields
        .iter()
        .find(|(_, value)| is_suspicious(value))
        .map(|(name, _)| *name)
}

/// Picks a random message from the decoy pool.
#[must_use]
pub fn decoy_message() -> &'static str {
    DECOY_MESSAGES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(DECOY_MESSAGES[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_tautologies() {
        assert!(is_suspicious("admin' OR '1'='1"));
        assert!(is_suspicious("x' or 1=1"));
        assert!(is_suspicious("\" OR \"a\"=\"a\""));
        assert!(is_suspicious("\" or 1 = 1"));
    }

    #[test]
    fn test_flags_keywords_comments_and_terminators() {
        assert!(is_suspicious("1 UNION SELECT password"));
        assert!(is_suspicious("drop table"));
        assert!(is_suspicious("admin'--"));
        assert!(is_suspicious("a /* hidden */ b"));
        assert!(is_suspicious("bob; "));
        assert!(is_suspicious("bob;"));
    }

    #[test]
    fn test_flags_timing_functions() {
        assert!(is_suspicious("1 AND SLEEP(5)"));
        assert!(is_suspicious("BENCHMARK(1000000,MD5(1))"));
        assert!(is_suspicious("'; WAITFOR DELAY '0:0:5'"));
    }

    #[test]
    fn test_accepts_ordinary_input() {
        for input in ["alice", "alice@example.com", "correct horse battery", "O'Brien", "selective"] {
            assert!(!is_suspicious(input), "{input} should pass");
        }
        assert!(!is_suspicious(""));
    }

    #[test]
    fn test_first_suspicious_names_field() {
        let fields = [("username", "alice"), ("password", "x' OR 1=1")];
        assert_eq!(first_suspicious(&fields), Some("password"));
        assert_eq!(first_suspicious(&[("username", "alice")]), None);
    }

    #[test]
    fn test_decoy_message_comes_from_pool() {
        let message = decoy_message();
        assert!(DECOY_MESSAGES.contains(&message));
    }
}
