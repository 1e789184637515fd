/// Characters stripped from free-text fields before they are stored or
/// looked up.
const STRIPPED: &[char] = &[';', '\'', '"', '\\', '/', '<', '>'];

/// Removes punctuation that has no business in a username or email and
/// trims surrounding whitespace.
#[must_use]
pub fn sanitize_input(input: &str) -> String {
    input
        .chars()
        .filter(|c| !STRIPPED.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}
