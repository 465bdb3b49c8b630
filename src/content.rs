use crate::classify::SourceKind;

/// Upper bound on body text handed to the prompt.
pub const MAX_BODY_CHARS: usize = 4000;

/// Anything shorter than this is not worth a generation call.
pub const MIN_BODY_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub body: String,
    pub source_kind: SourceKind,
}

impl ExtractedContent {
    pub fn empty(source_kind: SourceKind) -> Self {
        Self {
            title: String::new(),
            body: String::new(),
            source_kind,
        }
    }

    pub fn body_chars(&self) -> usize {
        self.body.chars().count()
    }

    pub fn has_enough_body(&self) -> bool {
        self.body_chars() >= MIN_BODY_CHARS
    }
}

/// Keeps the first `max_chars` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Trims every line, drops blank ones, and rejoins with `\n`.
pub fn normalize_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_chars_not_bytes() {
        assert_eq!(truncate_chars("한국어기사", 3), "한국어");
        assert_eq!(truncate_chars("abc", 3), "abc");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 5), "");
    }

    #[test]
    fn test_normalize_lines_drops_blank_lines() {
        let text = "  first  \n\n   \n\tsecond\r\nthird\n";
        assert_eq!(normalize_lines(text), "first\nsecond\nthird");
    }

    #[test]
    fn test_has_enough_body_uses_char_count() {
        let mut content = ExtractedContent::empty(SourceKind::Article);
        content.body = "가".repeat(49);
        assert!(!content.has_enough_body());
        content.body.push('나');
        assert!(content.has_enough_body());
    }
}
