#[derive(Clone, Copy)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Bracketed,
    LineComment,
    BlockComment(u32),
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

/// Scan an identifier (`[A-Za-z_][A-Za-z0-9_]*`) starting at `start`.
pub(super) fn scan_identifier(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    match bytes.get(start) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {}
        _ => return None,
    }
    let mut idx = start + 1;
    while idx < bytes.len() && is_ident_byte(bytes[idx]) {
        idx += 1;
    }
    std::str::from_utf8(&bytes[start..idx])
        .ok()
        .map(|name| (idx, name))
}

/// True when the byte before `idx` continues a word, e.g. `user@host`.
pub(super) fn follows_word(bytes: &[u8], idx: usize) -> bool {
    idx > 0 && (is_ident_byte(bytes[idx - 1]) || bytes[idx - 1] == b'@')
}
