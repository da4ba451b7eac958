use regex::Regex;

/// Extracts the logical payment id from the free-form text of a bank transfer.
///
/// The id is the first run of digits immediately following the configured prefix token, anywhere in the text. The
/// structured `code` field is searched first and the free-text `content` field is only consulted when `code` has no
/// match. The first match wins; if `code` matches, `content` is never looked at, even if it would disagree.
pub fn extract_payment_id(prefix: &str, code: Option<&str>, content: Option<&str>) -> Option<i64> {
    let pattern = Regex::new(&format!(r"{}(\d+)", regex::escape(prefix))).ok()?;
    code.and_then(|s| find_id(&pattern, s)).or_else(|| content.and_then(|s| find_id(&pattern, s)))
}

fn find_id(pattern: &Regex, haystack: &str) -> Option<i64> {
    pattern.captures(haystack).and_then(|c| c.get(1)).and_then(|m| m.as_str().parse::<i64>().ok())
}
