use std::{
    collections::HashMap,
    net::{Ipv4Addr, Ipv6Addr},
};

use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use crate::ecma;

/// A named format checker: a pure predicate over the candidate string.
#[derive(Clone, Copy)]
pub struct Format {
    pub name: &'static str,
    pub check: fn(s: &str) -> bool,
}

pub(crate) static FORMATS: Lazy<HashMap<&'static str, Format>> = Lazy::new(|| {
    let mut m = HashMap::<&'static str, Format>::new();
    let mut register = |name, check| m.insert(name, Format { name, check });
    register("regex", check_regex);
    register("ipv4", check_ipv4);
    register("ipv6", check_ipv6);
    register("hostname", check_hostname);
    register("idn-hostname", check_idn_hostname);
    register("email", check_email);
    register("idn-email", check_idn_email);
    register("date", check_date);
    register("full-date", check_date);
    register("time", check_time);
    register("full-time", check_time);
    register("date-time", check_date_time);
    register("duration", check_duration);
    register("json-pointer", check_json_pointer);
    register("relative-json-pointer", check_relative_json_pointer);
    register("uuid", check_uuid);
    register("uri", check_uri);
    register("uri-reference", check_uri_reference);
    register("iri", check_iri);
    register("iri-reference", check_iri_reference);
    register("uri-template", check_uri_template);
    m
});

fn check_regex(s: &str) -> bool {
    Regex::new(&ecma::convert(s)).is_ok()
}

fn check_ipv4(s: &str) -> bool {
    s.parse::<Ipv4Addr>().is_ok()
}

fn check_ipv6(s: &str) -> bool {
    s.parse::<Ipv6Addr>().is_ok()
}

fn matches_char(s: &str, index: usize, ch: char) -> bool {
    s.is_char_boundary(index) && s[index..].starts_with(ch)
}

// see https://datatracker.ietf.org/doc/html/rfc3339#section-5.6
fn check_date(s: &str) -> bool {
    // yyyy-mm-dd
    if s.len() != 10 {
        return false;
    }
    if !matches_char(s, 4, '-') || !matches_char(s, 7, '-') {
        return false;
    }

    let mut ymd = s.splitn(3, '-').filter_map(|t| t.parse::<usize>().ok());
    let (Some(y), Some(m), Some(d)) = (ymd.next(), ymd.next(), ymd.next()) else {
        return false;
    };

    if !matches!(m, 1..=12) || !matches!(d, 1..=31) {
        return false;
    }
    match m {
        2 => {
            let mut feb_days = 28;
            if y % 4 == 0 && (y % 100 != 0 || y % 400 == 0) {
                feb_days += 1; // leap year
            }
            d <= feb_days
        }
        4 | 6 | 9 | 11 => d <= 30,
        _ => true,
    }
}

fn check_time(mut str: &str) -> bool {
    // min: hh:mm:ssZ
    if str.len() < 9 {
        return false;
    }
    if !matches_char(str, 2, ':') || !matches_char(str, 5, ':') {
        return false;
    }
    if !str.is_char_boundary(8) {
        return false;
    }

    let mut hms = (str[..8])
        .splitn(3, ':')
        .filter_map(|t| t.parse::<usize>().ok());
    let (Some(mut h), Some(mut m), Some(s)) = (hms.next(), hms.next(), hms.next()) else {
        return false;
    };
    if h > 23 || m > 59 || s > 60 {
        return false;
    }
    str = &str[8..];

    // sec-frac if present
    if let Some(rem) = str.strip_prefix('.') {
        let n_digits = rem.chars().take_while(char::is_ascii_digit).count();
        if n_digits == 0 {
            return false;
        }
        str = &rem[n_digits..];
    }

    if str != "z" && str != "Z" {
        // time-numoffset
        if str.len() != 6 {
            return false;
        }
        let sign: isize = match str.chars().next() {
            Some('+') => -1,
            Some('-') => 1,
            _ => return false,
        };
        str = &str[1..];
        if !matches_char(str, 2, ':') {
            return false;
        }

        let mut zhm = str.splitn(2, ':').filter_map(|t| t.parse::<usize>().ok());
        let (Some(zh), Some(zm)) = (zhm.next(), zhm.next()) else {
            return false;
        };
        if zh > 23 || zm > 59 {
            return false;
        }

        // apply timezone to check the leap second in utc
        let mut hm = (h * 60 + m) as isize + sign * (zh * 60 + zm) as isize;
        if hm < 0 {
            hm += 24 * 60;
        }
        let hm = hm as usize;
        (h, m) = (hm / 60, hm % 60);
    }

    // leap second only at 23:59
    s < 60 || (h == 23 && m == 59)
}

fn check_date_time(s: &str) -> bool {
    // min: yyyy-mm-ddThh:mm:ssZ
    if s.len() < 20 {
        return false;
    }
    if !s.is_char_boundary(10) || !s[10..].starts_with(|c| matches!(c, 't' | 'T')) {
        return false;
    }
    check_date(&s[..10]) && check_time(&s[11..])
}

// see https://datatracker.ietf.org/doc/html/rfc3339#appendix-A
fn check_duration(s: &str) -> bool {
    let Some(s) = s.strip_prefix('P') else {
        return false;
    };
    if s.is_empty() {
        return false;
    }

    // dur-week
    if let Some(s) = s.strip_suffix('W') {
        return !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    }

    static UNITS: [&str; 2] = ["YMD", "HMS"];
    for (i, part) in s.split('T').enumerate() {
        let mut part = part;
        if i != 0 && part.is_empty() {
            return false;
        }
        let Some(mut units) = UNITS.get(i).copied() else {
            return false; // more than one T
        };
        while !part.is_empty() {
            let digit_count = part.chars().take_while(char::is_ascii_digit).count();
            if digit_count == 0 {
                return false;
            }
            part = &part[digit_count..];
            let Some(unit) = part.chars().next() else {
                return false; // number without unit
            };
            let Some(j) = units.find(unit) else {
                return false; // invalid or out-of-order unit
            };
            units = &units[j + 1..];
            part = &part[1..];
        }
    }
    true
}

// see https://en.wikipedia.org/wiki/Hostname#Restrictions_on_valid_host_names
fn check_hostname(mut s: &str) -> bool {
    s = s.strip_suffix('.').unwrap_or(s);
    if s.len() > 253 {
        return false;
    }
    s.split('.').all(|label| {
        matches!(label.len(), 1..=63)
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label
                .chars()
                .all(|c| matches!(c, 'a'..='z' | 'A'..='Z' | '0'..='9' | '-'))
    })
}

fn check_idn_hostname(s: &str) -> bool {
    match idna::domain_to_ascii_strict(s) {
        Ok(ascii) => check_hostname(&ascii),
        Err(_) => false,
    }
}

// see https://en.wikipedia.org/wiki/Email_address
fn check_email(s: &str) -> bool {
    check_email_with(s, check_hostname, |c| c.is_ascii_alphanumeric())
}

fn check_idn_email(s: &str) -> bool {
    check_email_with(s, check_idn_hostname, |c| {
        c.is_ascii_alphanumeric() || !c.is_ascii()
    })
}

fn check_email_with(s: &str, domain_ok: fn(&str) -> bool, atom: fn(char) -> bool) -> bool {
    if s.len() > 254 {
        return false;
    }
    let Some(at) = s.rfind('@') else {
        return false;
    };
    let (local, domain) = (&s[..at], &s[at + 1..]);

    if local.len() > 64 || local.is_empty() {
        return false;
    }
    if local.starts_with('"') && local.ends_with('"') && local.len() >= 2 {
        // quoted local part
        let local = &local[1..local.len() - 1];
        if local.contains(['\\', '"']) {
            return false;
        }
    } else {
        if local.starts_with('.') || local.ends_with('.') || local.contains("..") {
            return false;
        }
        if !local
            .chars()
            .all(|c| atom(c) || ".!#$%&'*+-/=?^_`{|}~".contains(c))
        {
            return false;
        }
    }

    // a bracketed domain must be an ip address
    if domain.starts_with('[') && domain.ends_with(']') {
        let addr = &domain[1..domain.len() - 1];
        return match addr.strip_prefix("IPv6:") {
            Some(addr) => check_ipv6(addr),
            None => check_ipv4(addr),
        };
    }
    domain_ok(domain)
}

fn check_json_pointer(s: &str) -> bool {
    if s.is_empty() {
        return true;
    }
    if !s.starts_with('/') {
        return false;
    }
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c == '~' && !matches!(chars.next(), Some('0') | Some('1')) {
            return false;
        }
    }
    true
}

fn check_relative_json_pointer(s: &str) -> bool {
    let digits = s.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 || (digits > 1 && s.starts_with('0')) {
        return false;
    }
    let rest = &s[digits..];
    rest == "#" || check_json_pointer(rest)
}

fn check_uuid(s: &str) -> bool {
    let groups = [8usize, 4, 4, 4, 12];
    let mut parts = s.split('-');
    for want in groups {
        let Some(part) = parts.next() else {
            return false;
        };
        if part.len() != want || !part.chars().all(|c| c.is_ascii_hexdigit()) {
            return false;
        }
    }
    parts.next().is_none()
}

fn check_uri(s: &str) -> bool {
    s.is_ascii() && check_iri(s)
}

fn check_uri_reference(s: &str) -> bool {
    s.is_ascii() && check_iri_reference(s)
}

fn check_iri(s: &str) -> bool {
    !has_invalid_uri_chars(s) && Url::parse(s).is_ok()
}

fn check_iri_reference(s: &str) -> bool {
    if has_invalid_uri_chars(s) {
        return false;
    }
    match Url::parse(s) {
        Ok(_) => true,
        // relative references resolve against any absolute base
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            static BASE: Lazy<Url> =
                Lazy::new(|| Url::parse("http://example.com/").expect("base url must parse"));
            BASE.join(s).is_ok()
        }
        Err(_) => false,
    }
}

fn has_invalid_uri_chars(s: &str) -> bool {
    s.chars()
        .any(|c| c.is_ascii_control() || matches!(c, ' ' | '"' | '<' | '>' | '\\' | '^' | '`'))
}

// see https://datatracker.ietf.org/doc/html/rfc6570
fn check_uri_template(s: &str) -> bool {
    let mut in_expr = false;
    for c in s.chars() {
        match c {
            '{' => {
                if in_expr {
                    return false;
                }
                in_expr = true;
            }
            '}' => {
                if !in_expr {
                    return false;
                }
                in_expr = false;
            }
            ' ' => return false,
            _ => {}
        }
    }
    !in_expr
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(name: &str, s: &str) -> bool {
        (FORMATS.get(name).unwrap().check)(s)
    }

    #[test]
    fn test_date() {
        assert!(check("date", "2024-02-29")); // leap year
        assert!(!check("date", "2023-02-29"));
        assert!(!check("date", "2023-13-01"));
        assert!(!check("date", "2023-1-01"));
    }

    #[test]
    fn test_time() {
        assert!(check("time", "23:59:60Z")); // leap second
        assert!(!check("time", "12:00:60Z"));
        assert!(check("time", "08:30:06.283185Z"));
        assert!(check("time", "23:59:60+23:59"));
        assert!(!check("time", "24:00:00Z"));
    }

    #[test]
    fn test_date_time() {
        assert!(check("date-time", "1985-04-12T23:20:50.52Z"));
        assert!(check("date-time", "1990-12-31t15:59:59-08:00"));
        assert!(!check("date-time", "1990-02-31T15:59:59Z"));
    }

    #[test]
    fn test_duration() {
        assert!(check("duration", "P3Y6M4DT12H30M5S"));
        assert!(check("duration", "P4W"));
        assert!(check("duration", "PT1M"));
        assert!(!check("duration", "P"));
        assert!(!check("duration", "P1D2H")); // H belongs after T
    }

    #[test]
    fn test_hostname() {
        assert!(check("hostname", "example.com"));
        assert!(check("hostname", "example.com."));
        assert!(!check("hostname", "-example.com"));
        assert!(!check("hostname", "exa_mple.com"));
    }

    #[test]
    fn test_email() {
        assert!(check("email", "joe.bloggs@example.com"));
        assert!(check("email", "\"quoted\"@example.com"));
        assert!(check("email", "me@[127.0.0.1]"));
        assert!(!check("email", "joe..bloggs@example.com"));
        assert!(!check("email", "nobody"));
    }

    #[test]
    fn test_pointers() {
        assert!(check("json-pointer", ""));
        assert!(check("json-pointer", "/a/~0b/~1c"));
        assert!(!check("json-pointer", "a/b"));
        assert!(!check("json-pointer", "/a/~2"));
        assert!(check("relative-json-pointer", "0#"));
        assert!(check("relative-json-pointer", "2/a/b"));
        assert!(!check("relative-json-pointer", "01/a"));
    }

    #[test]
    fn test_uuid() {
        assert!(check("uuid", "2eb8aa08-aa98-11ea-b4aa-73b441d16380"));
        assert!(!check("uuid", "2eb8aa08-aa98-11ea-b4aa-73b441d1638"));
        assert!(!check("uuid", "2eb8aa08aa9811eab4aa73b441d16380"));
    }

    #[test]
    fn test_uri() {
        assert!(check("uri", "http://example.com/a?q=1#frag"));
        assert!(!check("uri", "relative/path"));
        assert!(check("uri-reference", "relative/path"));
        assert!(!check("uri-reference", "has space"));
        assert!(check("iri", "http://example.com/\u{00e9}"));
        assert!(!check("uri", "http://example.com/\u{00e9}"));
    }

    #[test]
    fn test_uri_template() {
        assert!(check("uri-template", "http://example.com/{id}/items{?x,y}"));
        assert!(!check("uri-template", "http://example.com/{id"));
        assert!(!check("uri-template", "http://example.com/{{id}}"));
    }

    #[test]
    fn test_regex() {
        assert!(check("regex", "^a[b-z]+$"));
        assert!(check("regex", r"^\/path$")); // ecma escape
        assert!(!check("regex", "a{2,1}"));
    }
}
