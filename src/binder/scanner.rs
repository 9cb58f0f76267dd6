use crate::error::SqlTemplateError;

#[derive(Clone, Copy)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'-') && bytes.get(idx + 1) == Some(&b'-')
}

fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'/') && bytes.get(idx + 1) == Some(&b'*')
}

fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    bytes.get(idx) == Some(&b'*') && bytes.get(idx + 1) == Some(&b'/')
}

fn digits_end(bytes: &[u8], start: usize) -> usize {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    idx
}

/// Largest `?NNN` index SQLite accepts.
const MAX_PARAMETER_INDEX: usize = 32_766;

fn parse_index(digits: &str) -> Result<usize, SqlTemplateError> {
    match digits.parse::<usize>() {
        Ok(index) if (1..=MAX_PARAMETER_INDEX).contains(&index) => Ok(index),
        _ => Err(SqlTemplateError::BindingError(format!(
            "placeholder ?{digits} is out of range (1..={MAX_PARAMETER_INDEX})"
        ))),
    }
}

/// Count the positional placeholders (`?` and `?NNN`) in a SQL template.
///
/// Placeholders inside string literals, quoted identifiers, and comments are ignored.
/// Numbering follows SQLite: a bare `?` takes the index after the largest one seen so
/// far and `?NNN` names index NNN explicitly, so the count is the largest index.
///
/// # Errors
/// Returns `SqlTemplateError::BindingError` for a `?NNN` index of zero or beyond what
/// SQLite can bind.
pub fn count_placeholders(sql: &str) -> Result<usize, SqlTemplateError> {
    let bytes = sql.as_bytes();
    let mut state = State::Normal;
    let mut highest = 0usize;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::BacktickQuoted,
                b'[' => state = State::Bracketed,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'?' => {
                    let end = digits_end(bytes, idx + 1);
                    if end == idx + 1 {
                        highest += 1;
                    } else {
                        highest = highest.max(parse_index(&sql[idx + 1..end])?);
                        idx = end - 1;
                    }
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\'' {
                    if bytes.get(idx + 1) == Some(&b'\'') {
                        idx += 1; // skip escaped quote
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::DoubleQuoted => {
                if b == b'"' {
                    if bytes.get(idx + 1) == Some(&b'"') {
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::BacktickQuoted => {
                if b == b'`' {
                    state = State::Normal;
                }
            }
            State::Bracketed => {
                if b == b']' {
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

    Ok(highest)
}
