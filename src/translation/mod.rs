use std::borrow::Cow;

mod parsers;
mod scanner;

use parsers::{is_block_comment_end, is_block_comment_start, is_doubled, is_line_comment_start};
use scanner::{State, follows_word, scan_identifier};

use crate::error::DalError;

/// Rewrite named `@name` references into SQL Server ordinal placeholders.
///
/// The `n`-th entry of `names` (case-insensitive, without the `@`) becomes
/// `@P{n+1}`, so values must be bound in the same order as `names`. References
/// inside string literals, quoted or bracketed identifiers and comments are
/// left alone, as are `@@` system functions and `@variables` that are not in
/// `names` (locals declared by the batch itself).
///
/// Only placeholder tokens are rewritten; parameter values never enter the SQL
/// text. Returns a borrowed `Cow` when nothing had to change.
///
/// # Errors
/// Returns `DalError::ParameterError` when a name is empty, is not a valid
/// identifier, or is bound twice.
///
/// ```rust
/// use dashboard_dal::translation::bind_named;
///
/// let sql = bind_named("SELECT * FROM branches WHERE id = @id AND name <> '@id'", &["id"])?;
/// assert_eq!(sql, "SELECT * FROM branches WHERE id = @P1 AND name <> '@id'");
/// # Ok::<(), dashboard_dal::DalError>(())
/// ```
pub fn bind_named<'a>(sql: &'a str, names: &[&str]) -> Result<Cow<'a, str>, DalError> {
    validate_names(names)?;
    if names.is_empty() {
        return Ok(Cow::Borrowed(sql));
    }

    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'@' if bytes.get(idx + 1) == Some(&b'@') => {
                    // @@ROWCOUNT and friends
                    idx += 1;
                    while bytes
                        .get(idx + 1)
                        .is_some_and(|c| c.is_ascii_alphanumeric() || *c == b'_')
                    {
                        idx += 1;
                    }
                }
                b'@' if !follows_word(bytes, idx) => {
                    if let Some((end, name)) = scan_identifier(bytes, idx + 1) {
                        if let Some(position) = position_of(names, name) {
                            let buf = out.get_or_insert_with(|| String::with_capacity(sql.len()));
                            buf.push_str(&sql[copied_to..idx]);
                            buf.push_str("@P");
                            buf.push_str(&(position + 1).to_string());
                            copied_to = end;
                        }
                        idx = end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if is_doubled(bytes, idx, b'\'') {
                    idx += 1;
                } else if b == b'\'' {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                if is_doubled(bytes, idx, b'"') {
                    idx += 1;
                } else if b == b'"' {
                    state = State::Normal;
                }
            }
            State::Bracketed => {
                if is_doubled(bytes, idx, b']') {
                    idx += 1;
                } else if b == b']' {
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
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
        }
        idx += 1;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Ok(Cow::Owned(buf))
        }
        None => Ok(Cow::Borrowed(sql)),
    }
}

fn position_of(names: &[&str], candidate: &str) -> Option<usize> {
    names
        .iter()
        .position(|name| name.eq_ignore_ascii_case(candidate))
}

fn validate_names(names: &[&str]) -> Result<(), DalError> {
    for (i, name) in names.iter().enumerate() {
        let valid = scan_identifier(name.as_bytes(), 0).is_some_and(|(end, _)| end == name.len());
        if !valid {
            return Err(DalError::ParameterError(format!(
                "invalid parameter name {name:?}"
            )));
        }
        if names[..i].iter().any(|prior| prior.eq_ignore_ascii_case(name)) {
            return Err(DalError::ParameterError(format!(
                "parameter @{name} is bound more than once"
            )));
        }
    }
    Ok(())
}
