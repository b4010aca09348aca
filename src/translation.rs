//! Placeholder rewriting between the builder's `?` style and backend-native styles.
//!
//! The query builder always emits positional `?` markers. `PostgreSQL` only understands
//! `$N`, so statements bound for it pass through [`translate_placeholders`] first. The
//! scanner skips quoted strings, quoted identifiers, comments and dollar-quoted bodies.

use std::borrow::Cow;

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ...
    Postgres,
    /// `?1`, `?2`, ... (bare `?` is already native)
    Sqlite,
}

#[derive(Clone, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

/// Rewrites placeholders into `target` style.
///
/// For [`PlaceholderStyle::Postgres`] every bare `?` becomes the next `$N` (counting from
/// 1) and `?N` becomes `$N`; for [`PlaceholderStyle::Sqlite`] `$N` becomes `?N`.
///
/// ```rust
/// use storage_sql::translation::{PlaceholderStyle, translate_placeholders};
///
/// let sql = r#"SELECT "id" FROM "t" WHERE "id" = ? AND "name" != ?"#;
/// assert_eq!(
///     translate_placeholders(sql, PlaceholderStyle::Postgres, true),
///     r#"SELECT "id" FROM "t" WHERE "id" = $1 AND "name" != $2"#
/// );
/// ```
///
/// `PostgreSQL`'s jsonb `?`, `?|` and `?&` operators are indistinguishable from markers;
/// disable translation (`translate_placeholders=false`) for statements that use them.
///
/// Returns a borrowed `Cow` when nothing was rewritten.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle, enabled: bool) -> Cow<'_, str> {
    if !enabled {
        return Cow::Borrowed(sql);
    }

    let bytes = sql.as_bytes();
    let mut out = String::new();
    let mut copied_until = 0;
    let mut next_positional = 1usize;
    let mut state = State::Normal;
    let mut idx = 0;

    while idx < bytes.len() {
        let b = bytes[idx];
        match &state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'-' if bytes.get(idx + 1) == Some(&b'-') => {
                    state = State::LineComment;
                    idx += 1;
                }
                b'/' if bytes.get(idx + 1) == Some(&b'*') => {
                    state = State::BlockComment(1);
                    idx += 1;
                }
                b'$' => {
                    if let Some((tag, tag_end)) = dollar_quote_tag(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = tag_end;
                    } else if target == PlaceholderStyle::Sqlite
                        && let Some(digits_end) = digits_end(bytes, idx + 1)
                    {
                        out.push_str(&sql[copied_until..idx]);
                        out.push('?');
                        out.push_str(&sql[idx + 1..digits_end]);
                        copied_until = digits_end;
                        idx = digits_end;
                        continue;
                    }
                }
                b'?' if target == PlaceholderStyle::Postgres => {
                    out.push_str(&sql[copied_until..idx]);
                    out.push('$');
                    let end = match digits_end(bytes, idx + 1) {
                        Some(end) => {
                            out.push_str(&sql[idx + 1..end]);
                            end
                        }
                        None => {
                            out.push_str(&next_positional.to_string());
                            next_positional += 1;
                            idx + 1
                        }
                    };
                    copied_until = end;
                    idx = end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted | State::DoubleQuoted => {
                let quote = if state == State::SingleQuoted { b'\'' } else { b'"' };
                if b == quote {
                    if bytes.get(idx + 1) == Some(&quote) {
                        // doubled quote is an escape, stay inside
                        idx += 1;
                    } else {
                        state = State::Normal;
                    }
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                let depth = *depth;
                if b == b'/' && bytes.get(idx + 1) == Some(&b'*') {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if b == b'*' && bytes.get(idx + 1) == Some(&b'/') {
                    state = if depth == 1 {
                        State::Normal
                    } else {
                        State::BlockComment(depth - 1)
                    };
                    idx += 1;
                }
            }
            State::DollarQuoted(tag) => {
                if b == b'$' && closes_dollar_quote(bytes, idx, tag) {
                    idx += tag.len() + 1;
                    state = State::Normal;
                }
            }
        }
        idx += 1;
    }

    if copied_until == 0 {
        Cow::Borrowed(sql)
    } else {
        out.push_str(&sql[copied_until..]);
        Cow::Owned(out)
    }
}

/// First keyword of a statement (`INSERT`, `select`, ...), skipping leading whitespace
/// and opening parentheses.
pub(crate) fn leading_keyword(sql: &str) -> &str {
    let rest = sql.trim_start_matches(|c: char| c.is_whitespace() || c == '(');
    let end = rest
        .find(|c: char| !c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    &rest[..end]
}

/// `$tag$` opening at `start`; returns the tag and the index of its closing `$`.
fn dollar_quote_tag(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let mut idx = start + 1;
    // `$1` is a placeholder, not a tag
    if bytes.get(idx).is_some_and(u8::is_ascii_digit) {
        return None;
    }
    while let Some(&b) = bytes.get(idx) {
        if b == b'$' {
            let tag = std::str::from_utf8(&bytes[start + 1..idx]).ok()?;
            return Some((tag.to_string(), idx));
        }
        if !(b.is_ascii_alphanumeric() || b == b'_') {
            return None;
        }
        idx += 1;
    }
    None
}

fn closes_dollar_quote(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let tag_end = idx + 1 + tag.len();
    bytes.get(idx + 1..tag_end) == Some(tag.as_bytes()) && bytes.get(tag_end) == Some(&b'$')
}

fn digits_end(bytes: &[u8], start: usize) -> Option<usize> {
    let len = bytes[start.min(bytes.len())..]
        .iter()
        .take_while(|b| b.is_ascii_digit())
        .count();
    (len > 0).then_some(start + len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_bare_markers_for_postgres() {
        let sql = r#"UPDATE "t" SET "a" = ?, "b" = ? WHERE "id" = ?"#;
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, r#"UPDATE "t" SET "a" = $1, "b" = $2 WHERE "id" = $3"#);
    }

    #[test]
    fn translates_numbered_sqlite_to_postgres() {
        let sql = "select * from t where a = ?1 and b = ?2";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, "select * from t where a = $1 and b = $2");
    }

    #[test]
    fn dollar_markers_keep_their_numbers_for_sqlite() {
        let sql = "update t set a = $2 where id = $1 and note = '$3'";
        let res = translate_placeholders(sql, PlaceholderStyle::Sqlite, true);
        assert_eq!(res, "update t set a = ?2 where id = ?1 and note = '$3'");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"wh?t\" -- ?\n/* ? /* ? */ */ from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(
            res,
            "select '?', \"wh?t\" -- ?\n/* ? /* ? */ */ from t where a = $1"
        );
    }

    #[test]
    fn bare_markers_in_function_bodies_are_not_counted() {
        let sql = "select $body$ ? $body$, $$ ? $$, ? , ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, "select $body$ ? $body$, $$ ? $$, $1 , $2");
    }

    #[test]
    fn keeps_multibyte_text_intact() {
        let sql = "select 'déjà ?' as s, ? as p";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, true);
        assert_eq!(res, "select 'déjà ?' as s, $1 as p");
    }

    #[test]
    fn leading_keyword_skips_noise() {
        assert_eq!(leading_keyword("  (select 1)"), "select");
        assert_eq!(leading_keyword("INSERT INTO t"), "INSERT");
        assert_eq!(leading_keyword(""), "");
    }

    #[test]
    fn untouched_sql_is_borrowed() {
        let sql = "select * from t where a = $1";
        assert!(matches!(
            translate_placeholders(sql, PlaceholderStyle::Postgres, true),
            Cow::Borrowed(_)
        ));
        let sql = "select * from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres, false);
        assert!(matches!(res, Cow::Borrowed(_)));
        assert_eq!(res, sql);
    }
}
