//! POSIX-extended-regex matching backing the `regexp` expression.
//!
//! Built on the `regex` crate rather than a hand-rolled POSIX engine: its
//! default syntax is an ERE superset, so this module's job is narrowed to
//! rejecting PCRE-only constructs the grammar here doesn't cover (e.g.
//! backreferences) and wiring up `nocase`.

use crate::errors::StringError;
use crate::flavors::CharString;
use regex::Regex;

/// `regexp(input, pattern, group, nocase)`: returns the captured group (or
/// the whole match for group 0), empty if the pattern didn't match.
pub fn regexp(
    input: &CharString,
    pattern: &CharString,
    group: i64,
    nocase: bool,
) -> Result<CharString, StringError> {
    let pattern_str = std::str::from_utf8(pattern.as_bytes())
        .map_err(|_| StringError::BadRegex(lossy(pattern), "pattern is not valid UTF-8".into()))?;
    reject_pcre_only(pattern_str)?;

    let anchored = anchor(pattern_str);
    let compiled = if nocase {
        format!("(?i){anchored}")
    } else {
        anchored
    };
    let re = Regex::new(&compiled)
        .map_err(|e| StringError::BadRegex(pattern_str.to_string(), e.to_string()))?;

    let input_str = String::from_utf8_lossy(input.as_bytes());
    let captures = match re.captures(&input_str) {
        Some(c) => c,
        None => return CharString::new(Vec::new()),
    };

    let available = captures.len();
    if group as usize >= available {
        return Err(StringError::GroupOutOfBounds {
            group: group.max(0) as usize,
            available,
        });
    }
    let matched = captures.get(group as usize).map(|m| m.as_str()).unwrap_or("");
    CharString::new(matched.as_bytes().to_vec())
}

/// The original POSIX `regexp()` semantics match the whole subject against
/// the whole pattern (implicit `^...$`), unlike `regex`'s default
/// find-anywhere search.
fn anchor(pattern: &str) -> String {
    format!("^(?:{pattern})$")
}

fn reject_pcre_only(pattern: &str) -> Result<(), StringError> {
    let bytes = pattern.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 1 < bytes.len() {
            let next = bytes[i + 1];
            if next.is_ascii_digit() {
                return Err(StringError::BadRegex(
                    pattern.to_string(),
                    "backreferences are not supported".into(),
                ));
            }
            i += 2;
        } else {
            i += 1;
        }
    }
    Ok(())
}

fn lossy(s: &CharString) -> String {
    String::from_utf8_lossy(s.as_bytes()).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cs(s: &str) -> CharString {
        CharString::new(s.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn captures_requested_group() {
        let r = regexp(&cs("hello42world"), &cs("hello([0-9]+)world"), 1, false).unwrap();
        assert_eq!(r.as_bytes(), b"42");
    }

    #[test]
    fn no_match_returns_empty_string() {
        let r = regexp(&cs("abc"), &cs("[0-9]+"), 0, false).unwrap();
        assert!(r.is_empty());
    }

    #[test]
    fn nocase_flag_folds_case() {
        let r = regexp(&cs("HELLO"), &cs("hello"), 0, true).unwrap();
        assert_eq!(r.as_bytes(), b"HELLO");
    }

    #[test]
    fn group_out_of_bounds_is_an_error() {
        let err = regexp(&cs("abc"), &cs("(a)(b)"), 5, false).unwrap_err();
        assert!(matches!(err, StringError::GroupOutOfBounds { .. }));
    }

    #[test]
    fn backreference_pattern_is_rejected() {
        assert!(regexp(&cs("aa"), &cs(r"(a)\1"), 0, false).is_err());
    }
}
