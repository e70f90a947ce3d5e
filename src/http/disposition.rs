//! `Content-Disposition` filename encoding (RFC 2183)

use std::borrow::Cow;

/// RFC 2183: parameter values longer than 78 characters should be truncated
const MAX_PARAMETER_CHARS: usize = 78;

/// RFC 2045 tspecials
const TSPECIALS: &[char] = &[
    '(', ')', '<', '>', '@', ',', ';', ':', '\\', '"', '/', '[', ']', '?', '=',
];

/// Encode a filename as a `Content-Disposition` parameter value
///
/// Plain names are returned as a bare token, names containing tspecials
/// become an RFC 822 quoted-string with `"` and `\` escaped.
///
/// # Examples
/// ```
/// use artifact_range::http::disposition::encode_filename;
///
/// assert_eq!(encode_filename("plain.bin"), "plain.bin");
/// assert_eq!(encode_filename("a,b.bin"), "\"a,b.bin\"");
/// ```
pub fn encode_filename(filename: &str) -> Cow<'_, str> {
    let filename = match filename.char_indices().nth(MAX_PARAMETER_CHARS) {
        Some((cut, _)) => &filename[..cut],
        None => filename,
    };

    if filename.contains(TSPECIALS) {
        Cow::Owned(quoted_string(filename))
    } else {
        Cow::Borrowed(filename)
    }
}

/// `Content-Disposition` header value for an attachment download
pub fn attachment(filename: &str) -> String {
    format!("attachment;filename={}", encode_filename(filename))
}

fn quoted_string(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_name_is_token() {
        assert_eq!(encode_filename("plain.bin"), "plain.bin");
        assert!(matches!(encode_filename("plain.bin"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_tspecials_are_quoted() {
        assert_eq!(encode_filename("a,b.bin"), "\"a,b.bin\"");
        assert_eq!(encode_filename("fw (1).bin"), "\"fw (1).bin\"");
    }

    #[test]
    fn test_quote_and_backslash_escaped() {
        assert_eq!(encode_filename(r#"a"b\c"#), r#""a\"b\\c""#);
    }

    #[test]
    fn test_long_name_truncated() {
        let name = "x".repeat(100);
        assert_eq!(encode_filename(&name), "x".repeat(78));
    }

    #[test]
    fn test_truncation_counts_characters() {
        let name = "ü".repeat(80);
        assert_eq!(encode_filename(&name).chars().count(), 78);
    }

    #[test]
    fn test_truncation_before_quoting() {
        let name = format!("{}{}", "x".repeat(78), ",tail");
        assert_eq!(encode_filename(&name), "x".repeat(78));
    }

    #[test]
    fn test_attachment_header() {
        assert_eq!(attachment("file1"), "attachment;filename=file1");
    }
}
