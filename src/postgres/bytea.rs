/// Decode the textual `bytea` output formats back into raw bytes.
///
/// Understands the hex format (`\x4142`) and the legacy escape format (`A\102\\`).
/// Returns `None` when `text` is in neither format, so the caller can pass it through.
///
/// ```rust
/// use storage_sql::postgres::decode_bytea_text;
///
/// assert_eq!(decode_bytea_text(r"\x4142ff").as_deref(), Some(&b"AB\xff"[..]));
/// assert_eq!(decode_bytea_text(r"A\102\\").as_deref(), Some(&b"AB\\"[..]));
/// assert_eq!(decode_bytea_text(r"\9"), None);
/// ```
#[must_use]
pub fn decode_bytea_text(text: &str) -> Option<Vec<u8>> {
    match text.strip_prefix("\\x") {
        Some(hex) => decode_hex(hex),
        None => decode_escape(text.as_bytes()),
    }
}

fn decode_hex(hex: &str) -> Option<Vec<u8>> {
    // whitespace may separate digit pairs
    let digits: Vec<u8> = hex.bytes().filter(|b| !b.is_ascii_whitespace()).collect();
    if digits.len() % 2 != 0 {
        return None;
    }
    digits
        .chunks_exact(2)
        .map(|pair| Some((hex_digit(pair[0])? << 4) | hex_digit(pair[1])?))
        .collect()
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

fn decode_escape(raw: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut idx = 0;
    while idx < raw.len() {
        if raw[idx] != b'\\' {
            out.push(raw[idx]);
            idx += 1;
            continue;
        }
        match raw.get(idx + 1..idx + 4) {
            _ if raw.get(idx + 1) == Some(&b'\\') => {
                out.push(b'\\');
                idx += 2;
            }
            Some([a @ b'0'..=b'3', b @ b'0'..=b'7', c @ b'0'..=b'7']) => {
                out.push(((a - b'0') << 6) | ((b - b'0') << 3) | (c - b'0'));
                idx += 4;
            }
            _ => return None,
        }
    }
    Some(out)
}
