//! Backslash escaping for `TYPE` text.
//!
//! Command lines are newline-terminated, so text containing line breaks must
//! be escaped before framing. Exactly four characters are escaped:
//!
//! | Raw    | Escaped |
//! |--------|---------|
//! | `\`    | `\\`    |
//! | LF     | `\n`    |
//! | CR     | `\r`    |
//! | TAB    | `\t`    |
//!
//! [`unescape`] reverses exactly that set. Any other backslash pair is kept
//! as-is (`\x` stays two characters), and so is a lone backslash at the end
//! of the input.

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            other => out.push(other),
        }
    }
    out
}

pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
