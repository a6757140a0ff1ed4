use std::str::Chars;

use crate::errors::JQError;

/// Decode the escape sequences of a jq string literal, without its quotes.
pub fn unescape(value: &str) -> Result<String, JQError> {
    let mut rv = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            rv.push(c);
            continue;
        }

        match chars.next() {
            Some('"') => rv.push('"'),
            Some('\\') => rv.push('\\'),
            Some('/') => rv.push('/'),
            Some('b') => rv.push('\x08'),
            Some('f') => rv.push('\x0C'),
            Some('n') => rv.push('\n'),
            Some('r') => rv.push('\r'),
            Some('t') => rv.push('\t'),
            Some('u') => rv.push(decode_hex_char(&mut chars)?),
            Some('(') => {
                return Err(JQError::syntax(
                    "string interpolation is not supported".to_owned(),
                ))
            }
            Some(c) => {
                return Err(JQError::syntax(format!(
                    "unknown escape sequence '\\{c}'"
                )))
            }
            None => {
                return Err(JQError::syntax(
                    "incomplete escape sequence".to_owned(),
                ))
            }
        }
    }

    Ok(rv)
}

fn decode_hex_char(chars: &mut Chars) -> Result<char, JQError> {
    let mut code_point = parse_hex_digits(chars)?;

    if is_low_surrogate(code_point) {
        return Err(JQError::syntax(
            "unexpected low surrogate code point".to_owned(),
        ));
    }

    if is_high_surrogate(code_point) {
        if !(chars.next() == Some('\\') && chars.next() == Some('u')) {
            return Err(JQError::syntax("incomplete escape sequence".to_owned()));
        }

        let low_surrogate = parse_hex_digits(chars)?;

        if !is_low_surrogate(low_surrogate) {
            return Err(JQError::syntax("unexpected code point".to_owned()));
        }

        code_point = 0x10000 + (((code_point & 0x03FF) << 10) | (low_surrogate & 0x03FF));
    }

    char::from_u32(code_point)
        .ok_or_else(|| JQError::syntax(format!("invalid code point {code_point:#x}")))
}

fn parse_hex_digits(chars: &mut Chars) -> Result<u32, JQError> {
    let digits: String = chars.by_ref().take(4).collect();
    if digits.chars().count() != 4 {
        return Err(JQError::syntax("incomplete escape sequence".to_owned()));
    }

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(JQError::syntax("invalid escape sequence".to_owned()));
    }

    u32::from_str_radix(&digits, 16)
        .map_err(|_| JQError::syntax("invalid escape sequence".to_owned()))
}

fn is_high_surrogate(code_point: u32) -> bool {
    (0xD800..=0xDBFF).contains(&code_point)
}

fn is_low_surrogate(code_point: u32) -> bool {
    (0xDC00..=0xDFFF).contains(&code_point)
}
