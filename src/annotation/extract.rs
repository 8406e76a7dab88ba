//! Locating the label object inside model output.
//!
//! Structured outputs normally return bare JSON, but some models still wrap
//! it in a markdown fence or add a sentence around it.

use regex::Regex;

/// Find the index of the brace closing the object that starts at `s[0]`.
///
/// Braces inside string literals (including escaped quotes) are ignored.
pub fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, c) in s.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Body of the first ``` fenced block, with or without a language tag.
pub fn fenced_block(content: &str) -> Option<&str> {
    let re = Regex::new(r"```(?:[A-Za-z]+)?\s*\n?([\s\S]*?)\n?```").ok()?;
    let caps = re.captures(content)?;
    Some(caps.get(1)?.as_str().trim())
}

fn first_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = find_matching_brace(&content[start..])?;
    Some(&content[start..=start + end])
}

/// Extract the JSON object text from a model response.
pub fn extract_label_json(content: &str) -> Option<&str> {
    let trimmed = content.trim();
    if trimmed.starts_with('{') {
        if let Some(end) = find_matching_brace(trimmed) {
            return Some(&trimmed[..=end]);
        }
    }
    if let Some(block) = fenced_block(trimmed) {
        if let Some(obj) = first_object(block) {
            return Some(obj);
        }
    }
    first_object(trimmed)
}
