use std::{borrow::Cow, fmt::Display, str::FromStr, str::Utf8Error};

use percent_encoding::percent_decode_str;
use serde_json::Value;
use url::Url;

/// returns single-quoted string
pub(crate) fn quote<T>(s: &T) -> String
where
    T: AsRef<str> + std::fmt::Debug + ?Sized,
{
    let s = format!("{s:?}")
        .replace(r#"\""#, "\"")
        .replace('\'', r#"\'"#);
    format!("'{}'", &s[1..s.len() - 1])
}

pub(crate) fn join_iter<T>(iterable: T, sep: &str) -> String
where
    T: IntoIterator,
    T::Item: Display,
{
    iterable
        .into_iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// escapes token for use in a json-pointer
pub(crate) fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// escapes token for use in the fragment of an absolute keyword location
pub(crate) fn fragment_escape(token: &str) -> String {
    url_escape::encode_fragment(&escape(token)).into_owned()
}

pub(crate) fn path_unescape(s: &str) -> Result<String, Utf8Error> {
    Ok(percent_decode_str(s).decode_utf8()?.into_owned())
}

pub(crate) fn unescape(mut token: &str) -> Result<Cow<str>, ()> {
    let Some(mut tilde) = token.find('~') else {
        return Ok(Cow::Borrowed(token));
    };
    let mut s = String::with_capacity(token.len());
    loop {
        s.push_str(&token[..tilde]);
        token = &token[tilde + 1..];
        match token.chars().next() {
            Some('1') => s.push('/'),
            Some('0') => s.push('~'),
            _ => return Err(()),
        }
        token = &token[1..];
        let Some(i) = token.find('~') else {
            s.push_str(token);
            break;
        };
        tilde = i;
    }
    Ok(Cow::Owned(s))
}

/// Follows a json-pointer into `v`. Tokens are unescaped; numeric tokens
/// index arrays when the current node is an array. The empty segment before
/// the leading `/` is ignored.
pub(crate) fn follow<'a>(v: &'a Value, ptr: &str) -> Option<&'a Value> {
    let mut v = v;
    for (i, tok) in ptr.split('/').enumerate() {
        if i == 0 && tok.is_empty() {
            continue;
        }
        let tok = unescape(tok).ok()?;
        match v {
            Value::Object(obj) => v = obj.get(tok.as_ref())?,
            Value::Array(arr) => {
                let idx = usize::from_str(tok.as_ref()).ok()?;
                v = arr.get(idx)?;
            }
            _ => return None,
        }
    }
    Some(v)
}

pub(crate) struct Fragment<'a>(pub(crate) &'a str);

impl<'a> Fragment<'a> {
    pub(crate) fn as_str(&self) -> &str {
        self.0
    }

    fn is_json_pointer(&self) -> bool {
        self.0.is_empty()
            || self.0.starts_with('/')
            || self.0.starts_with("%2F")
            || self.0.starts_with("%2f")
    }

    pub(crate) fn is_anchor(&self) -> bool {
        !self.is_json_pointer()
    }

    pub(crate) fn decode(&self) -> Result<Cow<str>, Utf8Error> {
        percent_decode_str(self.0).decode_utf8()
    }

    pub(crate) fn to_anchor(&self) -> Result<Option<Cow<str>>, Utf8Error> {
        if self.is_json_pointer() {
            Ok(None) // json-pointer
        } else {
            Ok(Some(self.decode()?)) // anchor
        }
    }
}

impl<'a> Display for Fragment<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

pub(crate) fn split(url: &str) -> (&str, Fragment) {
    if let Some(i) = url.find('#') {
        (&url[..i], Fragment(&url[i + 1..]))
    } else {
        (url, Fragment(""))
    }
}

pub(crate) fn has_non_empty_fragment(url: &Url) -> bool {
    matches!(url.fragment(), Some(frag) if !frag.is_empty())
}

pub(crate) fn strip_fragment(url: &Url) -> Cow<Url> {
    if url.fragment().is_some() {
        let mut url = url.clone();
        url.set_fragment(None);
        Cow::Owned(url)
    } else {
        Cow::Borrowed(url)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_quote() {
        assert_eq!(quote(r#"abc"def'ghi"#), r#"'abc"def\'ghi'"#);
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("a/b~c"), "a~1b~0c");
        assert_eq!(fragment_escape("a b"), "a%20b");
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape("a~1b~0c").unwrap(), "a/b~c");
        assert_eq!(unescape("plain").unwrap(), "plain");
        assert!(unescape("bad~2").is_err());
    }

    #[test]
    fn test_path_unescape() {
        assert_eq!(
            path_unescape("my%2Fcool+blog&about,stuff").unwrap(),
            "my/cool+blog&about,stuff",
        );
    }

    #[test]
    fn test_fragment_to_anchor() {
        assert!(Fragment("").to_anchor().unwrap().is_none());
        assert!(Fragment("/a/b").to_anchor().unwrap().is_none());
        assert_eq!(
            Fragment("abcd").to_anchor().unwrap(),
            Some(Cow::from("abcd"))
        );
        assert_eq!(
            Fragment("%61%62%63%64").to_anchor().unwrap(),
            Some(Cow::from("abcd"))
        );
    }

    #[test]
    fn test_follow() {
        let v = json!({
            "a": [{"b/c": 1}, {"d~e": 2}],
            "": {"x": null}
        });
        assert_eq!(follow(&v, "/a/0/b~1c"), Some(&json!(1)));
        assert_eq!(follow(&v, "/a/1/d~0e"), Some(&json!(2)));
        assert_eq!(follow(&v, "//x"), Some(&json!(null)));
        assert_eq!(follow(&v, ""), Some(&v));
        assert_eq!(follow(&v, "/a/2"), None);
        assert_eq!(follow(&v, "/a/0/missing"), None);
    }

    #[test]
    fn test_split() {
        let (url, frag) = split("http://a.com/s.json#/defs/x");
        assert_eq!(url, "http://a.com/s.json");
        assert_eq!(frag.as_str(), "/defs/x");
        assert!(!frag.is_anchor());

        let (_, frag) = split("http://a.com/s.json#abcd");
        assert!(frag.is_anchor());
    }
}
