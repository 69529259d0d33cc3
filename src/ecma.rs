use std::borrow::Cow;

use regex_syntax::ast::parse::Parser;
use regex_syntax::ast::{Error, ErrorKind};

/// Rewrites an ECMA-262 pattern into one the `regex` crate accepts, where a
/// rewrite exists. Patterns are repaired one unsupported escape at a time
/// until the parser accepts them or no repair applies.
///
/// See <https://262.ecma-international.org/8.0/#sec-regular-expressions-patterns>.
pub(crate) fn convert(pattern: &str) -> Cow<str> {
    let mut pattern = Cow::Borrowed(pattern);
    while let Err(e) = Parser::new().parse(pattern.as_ref()) {
        match repair(&e) {
            Some(fixed) => pattern = Cow::Owned(fixed),
            None => break,
        }
    }
    pattern
}

fn repair(e: &Error) -> Option<String> {
    if !matches!(e.kind(), ErrorKind::EscapeUnrecognized) {
        return None;
    }
    let (start, end) = (e.span().start.offset, e.span().end.offset);
    let (before, after) = (&e.pattern()[..start], &e.pattern()[end..]);
    match &e.pattern()[start..end] {
        // ECMA allows escaping '/'
        r"\/" => Some(format!("{before}/{after}")),
        // \c{control_letter}
        r"\c" => {
            let control_letter = after.chars().next()?;
            if !control_letter.is_ascii_alphabetic() {
                return None;
            }
            let ctrl = ((control_letter as u8) % 32) as char;
            Some(format!("{before}{ctrl}{}", &after[1..]))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_slash() {
        assert_eq!(convert(r"ab\/cde\/fg"), "ab/cde/fg");
        assert_eq!(convert(r"^\/[a-z]+$"), "^/[a-z]+$");
    }

    #[test]
    fn test_control_letters() {
        assert_eq!(convert(r"ab\cAcde\cBfg"), "ab\u{1}cde\u{2}fg");
        assert_eq!(convert(r"\c\n"), r"\c\n"); // no repair for invalid char
    }

    #[test]
    fn test_plain_patterns_untouched() {
        assert!(matches!(convert("a+b*"), Cow::Borrowed(_)));
    }
}
