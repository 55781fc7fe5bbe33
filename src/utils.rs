//! String helpers shared by the scrapers and the message renderer.
//!
//! This module provides:
//! - Length capping with an ellipsis for lesson names
//! - UTF-16 based capping for catalog display names
//! - The blanket backslash escape required by the chat markup dialect
//! - Log-safe previews of long page bodies

/// Characters the chat markup dialect requires to be backslash-escaped.
pub const ESCAPED_CHARS: &[char] = &[
    '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// Cap `text` at `max_length` characters, replacing the tail with `"..."`.
///
/// Text that already fits is returned unchanged, as is any text when
/// `max_length <= 0`. Caps below 3 are raised to 3 so the ellipsis always
/// fits.
///
/// # Examples
///
/// ```
/// use kitis_schedule::utils::truncate;
/// assert_eq!(truncate("Математика", 7), "Мате...");
/// assert_eq!(truncate("Математика", 0), "Математика");
/// ```
pub fn truncate(text: &str, max_length: i32) -> String {
    let len = text.chars().count();
    if max_length <= 0 || len <= max_length as usize {
        return text.to_string();
    }
    let cap = max_length.max(3) as usize;
    let mut out: String = text.chars().take(cap - 3).collect();
    out.push_str("...");
    out
}

/// Keep the longest prefix of `text` that fits in `max_units` UTF-16 code units.
///
/// Display names end up inside chat callback identifiers whose limit is
/// counted in bytes; counting UTF-16 units lets Cyrillic names exceed that
/// limit. The unit count is kept because it is what existing callback data
/// was generated with.
pub fn truncate_utf16(text: &str, max_units: usize) -> &str {
    let mut units = 0;
    for (idx, c) in text.char_indices() {
        units += c.len_utf16();
        if units > max_units {
            return &text[..idx];
        }
    }
    text
}

/// Prefix every character of [`ESCAPED_CHARS`] with a backslash.
///
/// The escape is unconditional: it is applied to the whole rendered text,
/// markup included.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + text.len() / 8);
    for c in text.chars() {
        if ESCAPED_CHARS.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Inverse of [`escape_markdown`]: drop a backslash that precedes an escaped character.
pub fn unescape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.peek() {
                if ESCAPED_CHARS.contains(next) {
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a character boundary)
/// and get a `"…(+N bytes)"` suffix.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…(+{} bytes)", &s[..end], s.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_fits() {
        assert_eq!(truncate("Физика", 80), "Физика");
        assert_eq!(truncate("Физика", 6), "Физика");
    }

    #[test]
    fn test_truncate_long_text() {
        let result = truncate("Информационные технологии", 10);
        assert_eq!(result.chars().count(), 10);
        assert!(result.ends_with("..."));
        assert_eq!(result, "Информа...");
    }

    #[test]
    fn test_truncate_small_cap_raised_to_three() {
        assert_eq!(truncate("abcdef", 1), "...");
        assert_eq!(truncate("abcdef", 3), "...");
        assert_eq!(truncate("abcdef", 4), "a...");
    }

    #[test]
    fn test_truncate_non_positive_disables() {
        assert_eq!(truncate("abcdef", 0), "abcdef");
        assert_eq!(truncate("abcdef", -1), "abcdef");
    }

    #[test]
    fn test_truncate_utf16() {
        let name = "Преподаватель Иванов Иван Иванович";
        let cut = truncate_utf16(name, 28);
        assert_eq!(cut.encode_utf16().count(), 28);
        assert!(name.starts_with(cut));
        assert_eq!(truncate_utf16("ИС-21", 28), "ИС-21");
    }

    #[test]
    fn test_truncate_utf16_surrogate_pair_not_split() {
        // '😀' takes two UTF-16 units
        assert_eq!(truncate_utf16("ab😀", 3), "ab");
        assert_eq!(truncate_utf16("ab😀", 4), "ab😀");
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("1 пара - 8.30"), "1 пара \\- 8\\.30");
        assert_eq!(escape_markdown("(a)[b]{c}"), "\\(a\\)\\[b\\]\\{c\\}");
        assert_eq!(escape_markdown("*bold* _it_"), "*bold* _it_");
        assert_eq!(escape_markdown("a!b|c=d+e#f>g~h`i"), "a\\!b\\|c\\=d\\+e\\#f\\>g\\~h\\`i");
    }

    #[test]
    fn test_unescape_inverts_escape() {
        let text = "__1 пара__ - _8:30-10:00_ - Физика (1) - _Дистант_\n_Обновлено: 02.09.24 в 14:30_!";
        assert_eq!(unescape_markdown(&escape_markdown(text)), text);
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        assert_eq!(truncate_for_log("Hello, world!", 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        // each Cyrillic letter is two bytes, 3 falls inside the second one
        let result = truncate_for_log("Привет", 3);
        assert!(result.starts_with("П"));
        assert!(result.contains("…(+10 bytes)"));
    }
}
