//! Escaping for text moved into template-literal form

use crate::syntax::javascript::decode_character_reference;

/// Convert the raw body of a quoted string literal (without its quotes) into
/// a template-literal body with the same cooked value.
///
/// ```ignore
/// assert_eq!(escape_string_literal(r#"say \"hi\""#), r#"say "hi""#);
/// assert_eq!(escape_string_literal("a`b${c}"), r"a\`b\${c}");
/// ```
pub fn escape_string_literal(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 4);
    let mut chars = raw.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek().copied() {
                Some(quote @ ('\'' | '"')) => {
                    out.push(quote);
                    chars.next();
                }
                Some(digit @ '0'..='7') => {
                    chars.next();
                    push_octal_escape(&mut out, digit, &mut chars);
                }
                // `\8` and `\9` are the digit itself, and invalid in a template
                Some(digit @ ('8' | '9')) => {
                    out.push(digit);
                    chars.next();
                }
                Some(next) => {
                    out.push('\\');
                    out.push(next);
                    chars.next();
                }
                None => out.push_str("\\\\"),
            },
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out
}

/// Legacy octal escapes are not allowed in templates; `\0` stays only when no
/// digit follows it, everything else becomes `\u00XX`
fn push_octal_escape(
    out: &mut String,
    first: char,
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
) {
    let mut value = first.to_digit(8).unwrap_or(0);
    let max_digits = if first <= '3' { 3 } else { 2 };
    let mut digits = 1;
    while digits < max_digits {
        match chars.peek().and_then(|c| c.to_digit(8)) {
            Some(d) => {
                value = value * 8 + d;
                chars.next();
                digits += 1;
            }
            None => break,
        }
    }

    let digit_follows = chars.peek().is_some_and(|c| c.is_ascii_digit());
    if first == '0' && digits == 1 && !digit_follows {
        out.push_str("\\0");
    } else {
        out.push_str(&format!("\\u{:04x}", value));
    }
}

/// JSX text with its character references decoded. Unknown references are
/// kept as written.
pub fn decode_jsx_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail.find(';').and_then(|semi| {
            decode_character_reference(&tail[..=semi]).map(|c| (c, semi))
        });
        match decoded {
            Some((c, semi)) => {
                out.push(c);
                rest = &tail[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Escape text that carries no escape sequences of its own (element text,
/// attribute values) for use inside a template literal
pub fn escape_plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push_str("\\\\"),
            '`' => out.push_str("\\`"),
            '$' if chars.peek() == Some(&'{') => out.push_str("\\$"),
            _ => out.push(c),
        }
    }
    out
}
