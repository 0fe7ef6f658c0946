//! # Hierarchical Identifiers
//!
//! Fully Distinguished Names (FDNs) are ordered sequences of Relative
//! Distinguished Names (RDNs), each a `(qualifier, value)` pair. Every entity in
//! the mesh (work unit processors, units of work, parcels, episodes) is named by
//! an FDN, and identity is derived rather than random: a parcel's identifier is
//! the WUP-instance FDN with the UoW-instance FDN appended.
//!
//! ## Token Format
//!
//! The canonical token is the concatenation of every RDN rendered as
//! `[qualifier=value]`, most significant first:
//!
//! ```text
//! [site=north][wup=ingest][instance=7]
//! ```
//!
//! The characters `[`, `]`, `=` and `\` are backslash-escaped inside qualifiers
//! and values. The empty token is the root FDN (no RDNs).
//!
//! Equality, ordering and hashing are defined on the canonical token only, so
//! two independently built FDNs naming the same path are interchangeable as map
//! keys.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use thiserror::Error;

const OPEN: char = '[';
const CLOSE: char = ']';
const SEPARATOR: char = '=';
const ESCAPE: char = '\\';

/// Qualifier used by [`Fdn::with_version`]
pub const VERSION_QUALIFIER: &str = "version";

/// Errors raised while building or parsing identifiers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentifierError {
    #[error("Expected '[' at position {position} in token '{token}'")]
    MissingOpenMarker { token: String, position: usize },

    #[error("Unterminated RDN starting at position {position} in token '{token}'")]
    MissingCloseMarker { token: String, position: usize },

    #[error("RDN at position {position} in token '{token}' has no '=' separator")]
    MissingSeparator { token: String, position: usize },

    #[error("Dangling escape at end of token '{token}'")]
    DanglingEscape { token: String },

    #[error("RDN qualifier must not be empty")]
    EmptyQualifier,
}

pub type IdentifierResult<T> = Result<T, IdentifierError>;

/// A single `(qualifier, value)` element of an FDN
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Rdn {
    qualifier: String,
    value: String,
}

impl Rdn {
    pub fn new(qualifier: impl Into<String>, value: impl Into<String>) -> IdentifierResult<Self> {
        let qualifier = qualifier.into();
        if qualifier.is_empty() {
            return Err(IdentifierError::EmptyQualifier);
        }
        Ok(Self {
            qualifier,
            value: value.into(),
        })
    }

    /// Build an RDN whose qualifier is a known non-empty constant
    pub(crate) fn constant(qualifier: &'static str, value: impl Into<String>) -> Self {
        debug_assert!(!qualifier.is_empty());
        Self {
            qualifier: qualifier.to_string(),
            value: value.into(),
        }
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    fn write_token(&self, out: &mut String) {
        out.push(OPEN);
        escape_into(&self.qualifier, out);
        out.push(SEPARATOR);
        escape_into(&self.value, out);
        out.push(CLOSE);
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut token = String::new();
        self.write_token(&mut token);
        f.write_str(&token)
    }
}

fn escape_into(raw: &str, out: &mut String) {
    for c in raw.chars() {
        if matches!(c, OPEN | CLOSE | SEPARATOR | ESCAPE) {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

/// Fully Distinguished Name: an ordered, immutable RDN sequence
///
/// Mutating operations (`append`, `parent`, `with_version`) return new values.
/// The canonical token is computed once at construction.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fdn {
    rdns: Vec<Rdn>,
    token: String,
}

impl Fdn {
    /// The empty (root) identifier
    pub fn root() -> Self {
        Self {
            rdns: Vec::new(),
            token: String::new(),
        }
    }

    /// Single-RDN identifier
    pub fn new(qualifier: impl Into<String>, value: impl Into<String>) -> IdentifierResult<Self> {
        Ok(Self::from_rdns(vec![Rdn::new(qualifier, value)?]))
    }

    pub fn from_rdns(rdns: Vec<Rdn>) -> Self {
        let mut token = String::new();
        for rdn in &rdns {
            rdn.write_token(&mut token);
        }
        Self { rdns, token }
    }

    /// Parse a canonical token back into an FDN
    pub fn from_token(token: &str) -> IdentifierResult<Self> {
        let mut rdns = Vec::new();
        let mut chars = token.char_indices();

        while let Some((start, c)) = chars.next() {
            if c != OPEN {
                return Err(IdentifierError::MissingOpenMarker {
                    token: token.to_string(),
                    position: start,
                });
            }

            let mut qualifier = String::new();
            let mut value = String::new();
            let mut in_value = false;
            let mut closed = false;

            while let Some((_, c)) = chars.next() {
                match c {
                    ESCAPE => {
                        let Some((_, escaped)) = chars.next() else {
                            return Err(IdentifierError::DanglingEscape {
                                token: token.to_string(),
                            });
                        };
                        if in_value {
                            value.push(escaped);
                        } else {
                            qualifier.push(escaped);
                        }
                    }
                    SEPARATOR if !in_value => in_value = true,
                    CLOSE => {
                        closed = true;
                        break;
                    }
                    OPEN => {
                        // An unescaped '[' inside an RDN means the previous one never closed
                        return Err(IdentifierError::MissingCloseMarker {
                            token: token.to_string(),
                            position: start,
                        });
                    }
                    other => {
                        if in_value {
                            value.push(other);
                        } else {
                            qualifier.push(other);
                        }
                    }
                }
            }

            if !closed {
                return Err(IdentifierError::MissingCloseMarker {
                    token: token.to_string(),
                    position: start,
                });
            }
            if !in_value {
                return Err(IdentifierError::MissingSeparator {
                    token: token.to_string(),
                    position: start,
                });
            }
            rdns.push(Rdn::new(qualifier, value)?);
        }

        Ok(Self::from_rdns(rdns))
    }

    /// Canonical serialized form
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn rdns(&self) -> &[Rdn] {
        &self.rdns
    }

    pub fn len(&self) -> usize {
        self.rdns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rdns.is_empty()
    }

    /// Least significant RDN
    pub fn leaf(&self) -> Option<&Rdn> {
        self.rdns.last()
    }

    /// Append a single RDN
    pub fn append(&self, rdn: Rdn) -> Self {
        let mut rdns = self.rdns.clone();
        rdns.push(rdn);
        Self::from_rdns(rdns)
    }

    /// Concatenate another FDN after this one
    pub fn append_fdn(&self, other: &Fdn) -> Self {
        let mut rdns = self.rdns.clone();
        rdns.extend(other.rdns.iter().cloned());
        Self::from_rdns(rdns)
    }

    /// Drop the least significant RDN; `None` for the root
    pub fn parent(&self) -> Option<Self> {
        if self.rdns.is_empty() {
            return None;
        }
        Some(Self::from_rdns(self.rdns[..self.rdns.len() - 1].to_vec()))
    }

    /// Value of the last RDN carrying `qualifier`
    pub fn value_of(&self, qualifier: &str) -> Option<&str> {
        self.rdns
            .iter()
            .rev()
            .find(|rdn| rdn.qualifier == qualifier)
            .map(|rdn| rdn.value.as_str())
    }

    /// RDN values joined with `.`, qualifiers omitted
    pub fn unqualified_value(&self) -> String {
        self.rdns
            .iter()
            .map(Rdn::value)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Append a `[version=...]` RDN
    pub fn with_version(&self, version: &str) -> Self {
        self.append(Rdn::constant(VERSION_QUALIFIER, version))
    }

    /// True when `ancestor`'s RDNs are a strict prefix of this FDN
    pub fn is_descendant_of(&self, ancestor: &Fdn) -> bool {
        ancestor.rdns.len() < self.rdns.len()
            && self.rdns[..ancestor.rdns.len()] == ancestor.rdns[..]
    }
}

impl Default for Fdn {
    fn default() -> Self {
        Self::root()
    }
}

impl PartialEq for Fdn {
    fn eq(&self, other: &Self) -> bool {
        self.token == other.token
    }
}

impl Eq for Fdn {}

impl Hash for Fdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.token.hash(state);
    }
}

impl PartialOrd for Fdn {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fdn {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token.cmp(&other.token)
    }
}

impl fmt::Debug for Fdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fdn({})", self.token)
    }
}

impl fmt::Display for Fdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

impl FromStr for Fdn {
    type Err = IdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_token(s)
    }
}

impl TryFrom<String> for Fdn {
    type Error = IdentifierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_token(&value)
    }
}

impl From<Fdn> for String {
    fn from(value: Fdn) -> Self {
        value.token
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn wup() -> Fdn {
        Fdn::new("site", "north")
            .unwrap()
            .append(Rdn::new("wup", "ingest").unwrap())
    }

    #[test]
    fn test_token_format() {
        assert_eq!(wup().token(), "[site=north][wup=ingest]");
        assert_eq!(Fdn::root().token(), "");
    }

    #[test]
    fn test_parse_round_trip_with_escapes() {
        let fdn = Fdn::new("qual[1]", "a=b\\c").unwrap();
        assert_eq!(fdn.token(), "[qual\\[1\\]=a\\=b\\\\c]");
        let parsed = Fdn::from_token(fdn.token()).unwrap();
        assert_eq!(parsed.rdns(), fdn.rdns());
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        assert!(matches!(
            Fdn::from_token("site=north]"),
            Err(IdentifierError::MissingOpenMarker { position: 0, .. })
        ));
        assert!(matches!(
            Fdn::from_token("[site=north"),
            Err(IdentifierError::MissingCloseMarker { .. })
        ));
        assert!(matches!(
            Fdn::from_token("[site=north[wup=x]"),
            Err(IdentifierError::MissingCloseMarker { .. })
        ));
        assert!(matches!(
            Fdn::from_token("[sitenorth]"),
            Err(IdentifierError::MissingSeparator { .. })
        ));
        assert!(matches!(
            Fdn::from_token("[=north]"),
            Err(IdentifierError::EmptyQualifier)
        ));
        assert!(matches!(
            Fdn::from_token("[site=north\\"),
            Err(IdentifierError::DanglingEscape { .. })
        ));
    }

    #[test]
    fn test_parent_and_append() {
        let fdn = wup();
        let parent = fdn.parent().unwrap();
        assert_eq!(parent.token(), "[site=north]");
        assert_eq!(parent.parent().unwrap(), Fdn::root());
        assert!(Fdn::root().parent().is_none());

        let joined = parent.append_fdn(&Fdn::new("wup", "ingest").unwrap());
        assert_eq!(joined, fdn);
        assert!(fdn.is_descendant_of(&parent));
        assert!(!parent.is_descendant_of(&fdn));
        assert!(!fdn.is_descendant_of(&fdn));
    }

    #[test]
    fn test_qualifier_lookup_and_unqualified_value() {
        let fdn = wup().with_version("1.2.0");
        assert_eq!(fdn.value_of("wup"), Some("ingest"));
        assert_eq!(fdn.value_of(VERSION_QUALIFIER), Some("1.2.0"));
        assert_eq!(fdn.value_of("missing"), None);
        assert_eq!(fdn.unqualified_value(), "north.ingest.1.2.0");
    }

    #[test]
    fn test_independently_built_fdns_are_interchangeable_keys() {
        let mut map = HashMap::new();
        map.insert(wup(), 1);
        let rebuilt = Fdn::from_token("[site=north][wup=ingest]").unwrap();
        assert_eq!(map.get(&rebuilt), Some(&1));
    }

    #[test]
    fn test_serde_uses_token() {
        let json = serde_json::to_string(&wup()).unwrap();
        assert_eq!(json, "\"[site=north][wup=ingest]\"");
        let back: Fdn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wup());
        assert!(serde_json::from_str::<Fdn>("\"[broken\"").is_err());
    }
}
