//! Finding where a SQL statement ends.
//!
//! `statement_end` walks the bytes of a dump and returns the position just
//! past the first `;` that is not inside a string literal, quoted identifier,
//! dollar-quoted body or comment. Every delimiter it looks for is ASCII, so
//! returned offsets are always valid `str` boundaries.

/// Position just past the first top-level `;` at or after `start`.
///
/// Returns `None` if the text ends first, including when a literal, quoted
/// identifier, dollar-quoted body or block comment is left open.
pub fn statement_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut i = start;

    while i < bytes.len() {
        match bytes[i] {
            b';' => return Some(i + 1),
            b'\'' => {
                let backslash_escapes = is_escape_string_prefix(bytes, i);
                i = skip_quoted(bytes, i + 1, b'\'', backslash_escapes)?;
            }
            b'"' => i = skip_quoted(bytes, i + 1, b'"', false)?,
            b'-' if bytes.get(i + 1) == Some(&b'-') => i = skip_line_comment(bytes, i + 2),
            b'/' if bytes.get(i + 1) == Some(&b'*') => i = skip_block_comment(bytes, i + 2)?,
            b'$' => match dollar_tag_end(bytes, i) {
                Some(tag_end) => {
                    let tag = &bytes[i..tag_end];
                    let close = find_subslice(&bytes[tag_end..], tag)?;
                    i = tag_end + close + tag.len();
                }
                None => i += 1,
            },
            _ => i += 1,
        }
    }

    None
}

/// Position just past the first `;` at or after `start`, ignoring all quoting
pub fn first_semicolon(text: &str, start: usize) -> Option<usize> {
    text.get(start..)?.find(';').map(|offset| start + offset + 1)
}

/// `E'...'` strings treat backslash as an escape character
fn is_escape_string_prefix(bytes: &[u8], quote: usize) -> bool {
    if quote == 0 || !matches!(bytes[quote - 1], b'E' | b'e') {
        return false;
    }
    quote < 2 || !is_identifier_byte(bytes[quote - 2])
}

/// Skip to just past the closing `quote`; a doubled quote is an escaped quote
fn skip_quoted(bytes: &[u8], mut i: usize, quote: u8, backslash_escapes: bool) -> Option<usize> {
    while i < bytes.len() {
        let b = bytes[i];
        if backslash_escapes && b == b'\\' {
            i += 2;
        } else if b == quote {
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
            } else {
                return Some(i + 1);
            }
        } else {
            i += 1;
        }
    }
    None
}

fn skip_line_comment(bytes: &[u8], i: usize) -> usize {
    match bytes[i..].iter().position(|&b| b == b'\n') {
        Some(offset) => i + offset + 1,
        None => bytes.len(),
    }
}

/// Block comments nest in PostgreSQL
fn skip_block_comment(bytes: &[u8], mut i: usize) -> Option<usize> {
    let mut depth = 1usize;
    while i + 1 < bytes.len() {
        match (bytes[i], bytes[i + 1]) {
            (b'/', b'*') => {
                depth += 1;
                i += 2;
            }
            (b'*', b'/') => {
                depth -= 1;
                i += 2;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => i += 1,
        }
    }
    None
}

/// If a dollar-quote tag (`$$` or `$name$`) opens at `i`, return the position
/// just past it. `$1` style parameters and `$` inside identifiers are not tags.
fn dollar_tag_end(bytes: &[u8], i: usize) -> Option<usize> {
    if i > 0 && is_identifier_byte(bytes[i - 1]) {
        return None;
    }

    let mut j = i + 1;
    match bytes.get(j) {
        Some(b'$') => return Some(j + 1),
        Some(&b) if b.is_ascii_alphabetic() || b == b'_' || b >= 0x80 => j += 1,
        _ => return None,
    }

    while let Some(&b) = bytes.get(j) {
        if b == b'$' {
            return Some(j + 1);
        }
        if !is_identifier_byte(b) {
            return None;
        }
        j += 1;
    }
    None
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b >= 0x80
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn statement(sql: &str) -> Option<&str> {
        statement_end(sql, 0).map(|end| &sql[..end])
    }

    #[test]
    fn test_plain_statement() {
        let sql = "CREATE SCHEMA IF NOT EXISTS \"app\"; SELECT 1;";
        assert_eq!(statement(sql), Some("CREATE SCHEMA IF NOT EXISTS \"app\";"));
    }

    #[test]
    fn test_semicolon_in_string_literal() {
        let sql = "COMMENT ON TABLE \"public\".\"t\" IS 'a; b';\nSELECT 1;";
        assert_eq!(statement(sql), Some("COMMENT ON TABLE \"public\".\"t\" IS 'a; b';"));
    }

    #[test]
    fn test_doubled_quote_escape() {
        let sql = "SELECT 'it''s; fine';";
        assert_eq!(statement(sql), Some(sql));
    }

    #[test]
    fn test_backslash_escape_in_e_string() {
        let sql = r"SELECT E'\'; still inside';";
        assert_eq!(statement(sql), Some(sql));
    }

    #[test]
    fn test_dollar_quoted_body() {
        let sql = "CREATE FUNCTION f() RETURNS void AS $$\nBEGIN\n  PERFORM 1;\nEND;\n$$ LANGUAGE plpgsql;\nSELECT 2;";
        let end = statement_end(sql, 0).unwrap();
        assert!(sql[..end].ends_with("LANGUAGE plpgsql;"));
    }

    #[test]
    fn test_named_dollar_tag_with_inner_dollars() {
        let sql = "DO $body$ BEGIN RAISE NOTICE '$$;'; END $body$;";
        assert_eq!(statement(sql), Some(sql));
    }

    #[test]
    fn test_positional_parameter_is_not_a_tag() {
        let sql = "SELECT $1; SELECT 2;";
        assert_eq!(statement(sql), Some("SELECT $1;"));
    }

    #[test]
    fn test_comments() {
        let sql = "SELECT 1 -- not the end;\n /* nor ; /* nested; */ here; */ + 1;";
        assert_eq!(statement(sql), Some(sql));
    }

    #[test]
    fn test_unterminated_body_returns_none() {
        assert_eq!(statement_end("CREATE FUNCTION f() AS $$ BEGIN; END;", 0), None);
        assert_eq!(statement_end("SELECT 1", 0), None);
    }

    #[test]
    fn test_first_semicolon_ignores_quotes() {
        let sql = "SELECT 'a; b';";
        assert_eq!(first_semicolon(sql, 0), Some(10));
        assert_eq!(first_semicolon(sql, 100), None);
    }
}
