use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};
use scanner::{State, is_ident_byte, scan_identifier};

/// SQL text whose `@Name` placeholders were rewritten into positional ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedStatement<'a> {
    pub sql: Cow<'a, str>,
    /// Placeholder names (without `@`) in ordinal order: `names[0]` is placeholder 1.
    pub names: Vec<String>,
}

/// Rewrite `@Name` placeholders for a driver that only binds by position.
///
/// `render(name, ordinal)` produces the replacement text for a placeholder; the same name
/// (ASCII case-insensitive) always gets the same ordinal, numbered from 1 in order of first
/// appearance. Text inside quotes, comments and dollar-quoted bodies is left alone, as are
/// operators such as `@>` and `<@`.
///
/// ```rust
/// use sql_session::translation::translate_named_placeholders;
///
/// let stmt = translate_named_placeholders(
///     "update t set v = @Value where id = @Id or parent = @id",
///     |_, n| format!("${n}"),
/// );
/// assert_eq!(stmt.sql, "update t set v = $1 where id = $2 or parent = $2");
/// assert_eq!(stmt.names, vec!["Value", "Id"]);
/// ```
pub fn translate_named_placeholders<'a, F>(sql: &'a str, mut render: F) -> NamedStatement<'a>
where
    F: FnMut(&str, usize) -> String,
{
    let bytes = sql.as_bytes();
    // Filled lazily: stays `None` (and the input is borrowed) until a placeholder is found.
    let mut out: Option<Vec<u8>> = None;
    let mut names: Vec<String> = Vec::new();
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        // Bytes consumed by this step, copied verbatim unless a placeholder replaced them.
        let mut consumed = 1;
        let mut replaced = false;
        match state {
            State::Normal => match b {
                // `''` inside a literal closes and reopens it, which scans the same.
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'-' if is_line_comment_start(bytes, idx) => {
                    state = State::LineComment;
                    consumed = 2;
                }
                b'/' if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    consumed = 2;
                }
                b'$' => {
                    if let Some((tag, close)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        consumed = close + 1 - idx;
                    }
                }
                b'@' if !follows_operator_or_ident(bytes, idx) => {
                    if let Some((ident_end, ident)) = scan_identifier(bytes, idx + 1) {
                        let ordinal = match names.iter().position(|n| n.eq_ignore_ascii_case(ident)) {
                            Some(pos) => pos + 1,
                            None => {
                                names.push(ident.to_string());
                                names.len()
                            }
                        };
                        let buf = out.get_or_insert_with(|| bytes[..idx].to_vec());
                        buf.extend_from_slice(render(ident, ordinal).as_bytes());
                        consumed = ident_end - idx;
                        replaced = true;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    consumed = 2;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    consumed = 2;
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    consumed = tag.len() + 2;
                    state = State::Normal;
                }
            }
        }

        let next = (idx + consumed).min(bytes.len());
        if !replaced && let Some(buf) = out.as_mut() {
            buf.extend_from_slice(&bytes[idx..next]);
        }
        idx = next;
    }

    NamedStatement {
        sql: match out {
            // Only whole input slices and rendered strings were copied, so this is lossless.
            Some(buf) => Cow::Owned(String::from_utf8_lossy(&buf).into_owned()),
            None => Cow::Borrowed(sql),
        },
        names,
    }
}

fn follows_operator_or_ident(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && {
        let prev = bytes[idx - 1];
        prev == b'<' || prev == b'@' || is_ident_byte(prev)
    }
}
