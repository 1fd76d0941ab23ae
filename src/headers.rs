//! Ordered, case-insensitive header collection.

use std::fmt;
use std::io::{self, Write};

use http::{HeaderName, HeaderValue};

use crate::Error;

/// Headers that are controlled by the request itself and cannot be touched
/// through the generic add/set/remove path of a restricted collection.
const RESTRICTED: &[&str] = &[
    "accept",
    "connection",
    "content-length",
    "content-type",
    "date",
    "expect",
    "host",
    "range",
    "referer",
    "transfer-encoding",
    "user-agent",
];

/// An ordered multi-map of header names to values.
///
/// Lookups ignore case, but each entry keeps the spelling it was added with,
/// which is also the spelling written on the wire. Entries serialize in
/// insertion order.
///
/// A collection is either *restricted* (request side), where
/// [`is_restricted`][HeaderCollection::is_restricted] names are rejected by
/// [`add`][HeaderCollection::add], [`set`][HeaderCollection::set] and
/// [`remove`][HeaderCollection::remove], or unrestricted (response side).
#[derive(Clone, Default)]
pub struct HeaderCollection {
    restricted: bool,
    entries: Vec<Entry>,
}

#[derive(Clone)]
struct Entry {
    name: String,
    key: HeaderName,
    value: HeaderValue,
}

impl HeaderCollection {
    /// An unrestricted collection, as used for responses.
    pub fn new() -> Self {
        HeaderCollection::default()
    }

    /// A collection guarding the protocol-controlled request headers.
    pub fn restricted() -> Self {
        HeaderCollection {
            restricted: true,
            entries: Vec::new(),
        }
    }

    /// Tell if `name` is one of the headers only the request itself may set.
    pub fn is_restricted(name: &str) -> bool {
        match HeaderName::from_bytes(name.as_bytes()) {
            Ok(key) => RESTRICTED.contains(&key.as_str()),
            Err(_) => false,
        }
    }

    /// Append a value for `name`.
    pub fn add(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let key = self.check_public(name)?;
        self.push(name, key, value)
    }

    /// Replace all values of `name` with `value`.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let key = self.check_public(name)?;
        self.replace(name, key, value)
    }

    /// Remove all values of `name`. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> Result<bool, Error> {
        let key = self.check_public(name)?;
        Ok(self.remove_key(&key))
    }

    pub(crate) fn add_raw(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let key = parse_name(name)?;
        self.push(name, key, value)
    }

    pub(crate) fn set_raw(&mut self, name: &str, value: &str) -> Result<(), Error> {
        let key = parse_name(name)?;
        self.replace(name, key, value)
    }

    pub(crate) fn remove_raw(&mut self, name: &str) -> bool {
        match parse_name(name) {
            Ok(key) => self.remove_key(&key),
            Err(_) => false,
        }
    }

    /// Append a header read off the wire. The value is kept as bytes.
    pub(crate) fn add_parsed(&mut self, name: &str, value: &[u8]) -> Result<(), Error> {
        let key = parse_name(name)?;
        let value = HeaderValue::from_bytes(value.trim_ascii_ws())
            .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
        self.entries.push(Entry {
            name: name.to_string(),
            key,
            value,
        });
        Ok(())
    }

    /// First value of `name`, if it is valid UTF-8.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.get_all(name).next().and_then(|v| v.to_str().ok())
    }

    /// All values of `name` in insertion order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        let key = parse_name(name).ok();
        self.entries
            .iter()
            .filter(move |e| Some(&e.key) == key.as_ref())
            .map(|e| &e.value)
    }

    /// Tell if there is at least one value for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.get_all(name).next().is_some()
    }

    /// Tell if any value of `name`, split on commas, equals `token` ignoring case.
    pub fn has_token(&self, name: &str, token: &str) -> bool {
        self.get_all(name)
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }

    /// Iterate `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.entries.iter().map(|e| (e.name.as_str(), &e.value))
    }

    /// Number of entries, counting repeated names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Tell if the collection has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The header block as written on the wire, `Name: value\r\n` per entry.
    ///
    /// The terminating blank line is not included.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.entries.len() * 32);
        // Writing to a Vec cannot fail.
        let _ = self.write_to(&mut out);
        out
    }

    /// Write the header block to `w`.
    pub fn write_to<W: Write>(&self, w: &mut W) -> io::Result<()> {
        for e in &self.entries {
            write!(w, "{}: ", e.name)?;
            w.write_all(e.value.as_bytes())?;
            w.write_all(b"\r\n")?;
        }
        Ok(())
    }

    fn check_public(&self, name: &str) -> Result<HeaderName, Error> {
        let key = parse_name(name)?;
        if self.restricted && RESTRICTED.contains(&key.as_str()) {
            return Err(Error::RestrictedHeader(name.to_string()));
        }
        Ok(key)
    }

    fn push(&mut self, name: &str, key: HeaderName, value: &str) -> Result<(), Error> {
        let value = parse_value(name, value)?;
        self.entries.push(Entry {
            name: name.to_string(),
            key,
            value,
        });
        Ok(())
    }

    fn replace(&mut self, name: &str, key: HeaderName, value: &str) -> Result<(), Error> {
        let value = parse_value(name, value)?;

        let Some(first) = self.entries.iter().position(|e| e.key == key) else {
            self.entries.push(Entry {
                name: name.to_string(),
                key,
                value,
            });
            return Ok(());
        };

        // Keep the position of the first occurrence so the wire order is stable.
        let mut index = 0;
        self.entries.retain(|e| {
            let keep = index <= first || e.key != key;
            index += 1;
            keep
        });

        let entry = &mut self.entries[first];
        entry.name = name.to_string();
        entry.value = value;

        Ok(())
    }

    fn remove_key(&mut self, key: &HeaderName) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key != *key);
        before != self.entries.len()
    }
}

fn parse_name(name: &str) -> Result<HeaderName, Error> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|_| Error::InvalidHeader(format!("bad header name: {:?}", name)))
}

fn parse_value(name: &str, value: &str) -> Result<HeaderValue, Error> {
    let value = value.trim_matches(|c| c == ' ' || c == '\t');
    HeaderValue::from_str(value)
        .map_err(|_| Error::InvalidHeader(format!("bad value for {}: {:?}", name, value)))
}

trait TrimAsciiWs {
    fn trim_ascii_ws(&self) -> &Self;
}

impl TrimAsciiWs for [u8] {
    fn trim_ascii_ws(&self) -> &[u8] {
        let ws = |c: &u8| *c == b' ' || *c == b'\t';
        let start = self.iter().position(|c| !ws(c)).unwrap_or(self.len());
        let end = self.iter().rposition(|c| !ws(c)).map(|i| i + 1).unwrap_or(start);
        &self[start..end]
    }
}

impl fmt::Debug for HeaderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl fmt::Display for HeaderCollection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.serialize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::try_parse_response;

    #[test]
    fn add_and_serialize_in_order() {
        let mut h = HeaderCollection::restricted();
        h.add("X-First", "1").unwrap();
        h.add("x-second", "  two\t").unwrap();
        h.add("X-First", "again").unwrap();

        assert_eq!(
            h.serialize(),
            b"X-First: 1\r\nx-second: two\r\nX-First: again\r\n"
        );
    }

    #[test]
    fn lookup_ignores_case() {
        let mut h = HeaderCollection::new();
        h.add("Content-Type", "text/plain").unwrap();

        assert_eq!(h.get("content-type"), Some("text/plain"));
        assert_eq!(h.get("CONTENT-TYPE"), Some("text/plain"));
        assert!(h.contains("Content-type"));
        assert_eq!(h.get("content-length"), None);
    }

    #[test]
    fn bad_names_are_rejected() {
        let mut h = HeaderCollection::new();
        for name in [
            "", "a b", "a\tb", "a(b", "a)b", "a<b", "a>b", "a@b", "a,b", "a;b", "a:b", "a\\b",
            "a\"b", "a/b", "a[b", "a]b", "a?b", "a=b", "a{b", "a}b", "a\0b", "a\x7fb",
        ] {
            let err = h.add(name, "v").unwrap_err();
            assert!(matches!(err, Error::InvalidHeader(_)), "{:?}", name);
        }
        assert!(h.is_empty());
    }

    #[test]
    fn bad_values_are_rejected() {
        let mut h = HeaderCollection::new();
        let err = h.add("X-Foo", "a\r\nInjected: yes").unwrap_err();
        assert!(matches!(err, Error::InvalidHeader(_)));
    }

    #[test]
    fn restricted_in_strict_mode() {
        let mut h = HeaderCollection::restricted();
        let err = h.add("Content-Length", "5").unwrap_err();
        assert!(matches!(err, Error::RestrictedHeader(_)));

        let err = h.set("host", "x.test").unwrap_err();
        assert!(matches!(err, Error::RestrictedHeader(_)));

        let err = h.remove("User-Agent").unwrap_err();
        assert!(matches!(err, Error::RestrictedHeader(_)));

        // The request itself may still set them.
        h.add_raw("Content-Length", "5").unwrap();
        assert_eq!(h.get("content-length"), Some("5"));
    }

    #[test]
    fn restricted_allowed_when_unrestricted() {
        let mut h = HeaderCollection::new();
        h.add("Content-Length", "5").unwrap();
        assert_eq!(h.get("Content-Length"), Some("5"));
    }

    #[test]
    fn is_restricted_names() {
        for name in [
            "Accept",
            "connection",
            "Content-Length",
            "content-type",
            "Date",
            "Expect",
            "HOST",
            "Range",
            "Referer",
            "Transfer-Encoding",
            "User-Agent",
        ] {
            assert!(HeaderCollection::is_restricted(name), "{}", name);
        }
        assert!(!HeaderCollection::is_restricted("Authorization"));
        assert!(!HeaderCollection::is_restricted("bad name"));
    }

    #[test]
    fn set_replaces_in_place() {
        let mut h = HeaderCollection::new();
        h.add("A", "1").unwrap();
        h.add("B", "2").unwrap();
        h.add("a", "3").unwrap();
        h.add("C", "4").unwrap();

        h.set("A", "x").unwrap();

        assert_eq!(h.serialize(), b"A: x\r\nB: 2\r\nC: 4\r\n");
    }

    #[test]
    fn set_appends_when_missing() {
        let mut h = HeaderCollection::new();
        h.add("A", "1").unwrap();
        h.set("B", "2").unwrap();
        assert_eq!(h.serialize(), b"A: 1\r\nB: 2\r\n");
    }

    #[test]
    fn remove_all_values() {
        let mut h = HeaderCollection::new();
        h.add("A", "1").unwrap();
        h.add("B", "2").unwrap();
        h.add("a", "3").unwrap();

        assert!(h.remove("A").unwrap());
        assert!(!h.remove("A").unwrap());
        assert_eq!(h.serialize(), b"B: 2\r\n");
    }

    #[test]
    fn has_token() {
        let mut h = HeaderCollection::new();
        h.add("Transfer-Encoding", "gzip, Chunked").unwrap();
        assert!(h.has_token("transfer-encoding", "chunked"));
        assert!(!h.has_token("transfer-encoding", "deflate"));
    }

    #[test]
    fn serialize_is_idempotent() {
        let mut h = HeaderCollection::restricted();
        h.add_raw("Host", "f.test").unwrap();
        h.add("X-Foo", "bar").unwrap();

        assert_eq!(h.serialize(), h.serialize());
        assert_eq!(h.to_string(), "Host: f.test\r\nX-Foo: bar\r\n");
    }

    #[test]
    fn serialize_then_parse_round_trip() {
        let pairs = [
            ("Server", "test"),
            ("X-Spaced", "  padded value  "),
            ("set-cookie", "a=1"),
            ("Set-Cookie", "b=2"),
            ("X-Empty", ""),
        ];

        let mut h = HeaderCollection::new();
        for (n, v) in pairs {
            h.add(n, v).unwrap();
        }

        let mut wire = b"HTTP/1.1 200 OK\r\n".to_vec();
        wire.extend_from_slice(&h.serialize());
        wire.extend_from_slice(b"\r\n");

        let (used, head) = try_parse_response::<16>(&wire).unwrap().unwrap();
        assert_eq!(used, wire.len());

        let parsed: Vec<(&str, &[u8])> =
            head.headers.iter().map(|(n, v)| (n, v.as_bytes())).collect();
        let expected: Vec<(&str, &[u8])> = pairs
            .iter()
            .map(|(n, v)| (*n, v.trim().as_bytes()))
            .collect();

        assert_eq!(parsed, expected);
    }
}
