/// Pure text helpers shared by data sources and AI output normalization.
///
/// All lengths are counted in characters, never bytes, so multi-byte text is
/// never split inside a code point.

/// First `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}

/// First `max_chars` characters followed by "..." when anything was cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() > max_chars {
        format!("{}...", truncate_chars(trimmed, max_chars))
    } else {
        trimmed.to_string()
    }
}

/// Trim every entry, drop empty ones and keep at most `cap`.
pub fn clean_list(items: Vec<String>, cap: usize) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .take(cap)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo");
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn test_excerpt_appends_ellipsis_only_when_cut() {
        assert_eq!(excerpt("abcdef", 3), "abc...");
        assert_eq!(excerpt("abc", 3), "abc");
        assert_eq!(excerpt("  padded  ", 20), "padded");
    }

    #[test]
    fn test_clean_list() {
        let cleaned = clean_list(
            vec![" a ".into(), "".into(), "   ".into(), "b".into(), "c".into()],
            2,
        );
        assert_eq!(cleaned, vec!["a".to_string(), "b".to_string()]);
    }
}
