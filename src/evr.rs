//! Parsing and comparison of `[epoch:]version[-release]` strings.
//!
//! Two orderings are provided. [`Evr::match_cmp`] is the comparison used when
//! checking whether a version satisfies a relation: a missing release on
//! either side matches any release. The [`Ord`] implementation is a total
//! order used for ranking candidates: semantically equal strings that are
//! spelled differently (`1.0` and `0:1.0`) are ordered by their raw text, so
//! sorting never depends on input order.

use std::{
    cmp::Ordering,
    fmt::{Display, Formatter},
};

use crate::ParseError;

/// A parsed version string.
#[derive(Debug, Clone, Copy)]
pub struct Evr<'a> {
    raw: &'a str,
    epoch: u64,
    version: &'a str,
    release: Option<&'a str>,
}

fn is_version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '~' | '^')
}

impl<'a> Evr<'a> {
    /// Parses a version string, rejecting anything that is not of the form
    /// `[epoch:]version[-release]`.
    pub fn parse(raw: &'a str) -> Result<Self, ParseError> {
        let invalid = || ParseError::InvalidVersion(raw.to_owned());

        let (epoch, rest) = match raw.split_once(':') {
            Some((epoch, rest)) => {
                if epoch.is_empty() || !epoch.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                (epoch.parse::<u64>().map_err(|_| invalid())?, rest)
            }
            None => (0, raw),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((version, release)) => (version, Some(release)),
            None => (rest, None),
        };

        if version.is_empty() || !version.chars().all(is_version_char) {
            return Err(invalid());
        }
        if let Some(release) = release {
            if release.is_empty() || !release.chars().all(is_version_char) {
                return Err(invalid());
            }
        }

        Ok(Self {
            raw,
            epoch,
            version,
            release,
        })
    }

    /// The epoch, zero when omitted
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The upstream version
    pub fn version(&self) -> &'a str {
        self.version
    }

    /// The release, if any
    pub fn release(&self) -> Option<&'a str> {
        self.release
    }

    /// The string this was parsed from
    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    /// Compares two versions the way relations match them: epochs and versions
    /// are compared, releases only when both sides have one.
    pub fn match_cmp(&self, other: &Evr<'_>) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| vercmp(self.version, other.version))
            .then_with(|| match (self.release, other.release) {
                (Some(a), Some(b)) => vercmp(a, b),
                _ => Ordering::Equal,
            })
    }

    fn semantic_cmp(&self, other: &Evr<'_>) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| vercmp(self.version, other.version))
            .then_with(|| match (self.release, other.release) {
                (Some(a), Some(b)) => vercmp(a, b),
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    }
}

impl PartialEq for Evr<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for Evr<'_> {}

impl PartialOrd for Evr<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Evr<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.semantic_cmp(other)
            .then_with(|| self.raw.cmp(other.raw))
    }
}

impl Display for Evr<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.raw)
    }
}

/// Compares two version (or release) segments.
///
/// Both strings are split into runs of digits and runs of letters, all other
/// characters only separate runs. Numeric runs compare numerically and are
/// newer than alphabetic runs, alphabetic runs compare lexically. A `~` sorts
/// before anything, including the end of the string, so `1.0~rc1` is older
/// than `1.0`.
pub fn vercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let is_separator = |c: &u8| !c.is_ascii_alphanumeric() && *c != b'~';
    let (mut a, mut b) = (a.as_bytes(), b.as_bytes());

    loop {
        a = skip_while(a, is_separator);
        b = skip_while(b, is_separator);

        match (a.first() == Some(&b'~'), b.first() == Some(&b'~')) {
            (true, true) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if a.is_empty() || b.is_empty() {
            break;
        }

        let numeric = a[0].is_ascii_digit();
        let same_class = |c: &u8| {
            if numeric {
                c.is_ascii_digit()
            } else {
                c.is_ascii_alphabetic()
            }
        };
        let (segment_a, rest_a) = split_while(a, same_class);
        let (segment_b, rest_b) = split_while(b, same_class);

        // The segments are of a different class, numbers are newer.
        if segment_b.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ordering = if numeric {
            let segment_a = skip_while(segment_a, |c| *c == b'0');
            let segment_b = skip_while(segment_b, |c| *c == b'0');
            segment_a
                .len()
                .cmp(&segment_b.len())
                .then_with(|| segment_a.cmp(segment_b))
        } else {
            segment_a.cmp(segment_b)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }

        a = rest_a;
        b = rest_b;
    }

    // Whichever string still has segments left is the newer one.
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, _) => Ordering::Greater,
    }
}

fn skip_while(s: &[u8], pred: impl Fn(&u8) -> bool) -> &[u8] {
    let start = s.iter().position(|c| !pred(c)).unwrap_or(s.len());
    &s[start..]
}

fn split_while(s: &[u8], pred: impl Fn(&u8) -> bool) -> (&[u8], &[u8]) {
    let end = s.iter().position(|c| !pred(c)).unwrap_or(s.len());
    s.split_at(end)
}
