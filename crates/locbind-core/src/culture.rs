#![forbid(unsafe_code)]

//! Culture identifiers and system culture detection.
//!
//! A [`Culture`] is an immutable, normalized language tag such as `"en"`,
//! `"de-AT"` or `"zh-Hans-CN"`. Equality and hashing use the normalized tag,
//! so `de_AT.UTF-8` and `de-AT` name the same culture.
//!
//! # Invariants
//!
//! 1. A `Culture` always holds a normalized tag: subtags separated by `-`,
//!    each subtag non-empty ASCII alphanumeric.
//! 2. The empty tag is the *invariant* culture and is the root of every
//!    [`Culture::lineage`].
//! 3. `parent()` strictly shortens the tag, so lineage walks terminate.

use std::env;
use std::fmt;

/// Errors from culture parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CultureError {
    /// The tag contained characters or empty subtags that cannot name a culture.
    Invalid(String),
}

impl fmt::Display for CultureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(tag) => write!(f, "invalid culture tag: {tag:?}"),
        }
    }
}

impl std::error::Error for CultureError {}

/// An immutable culture (locale) identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct Culture {
    tag: String,
}

impl Culture {
    /// The invariant culture (empty tag).
    #[must_use]
    pub const fn invariant() -> Self {
        Self { tag: String::new() }
    }

    /// Parse and normalize a culture tag.
    ///
    /// Accepts POSIX-style locale strings (`fr_FR.UTF-8`, `sr_RS@latin`);
    /// `C` and `POSIX` map to `en`. An empty or blank string yields the
    /// invariant culture.
    pub fn parse(raw: &str) -> Result<Self, CultureError> {
        match normalize_tag(raw) {
            Some(tag) => Ok(Self { tag }),
            None => Err(CultureError::Invalid(raw.to_string())),
        }
    }

    /// Normalized tag, e.g. `"de-AT"`.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Whether this is the invariant culture.
    #[must_use]
    pub fn is_invariant(&self) -> bool {
        self.tag.is_empty()
    }

    /// Primary language subtag (`"de"` for `"de-AT"`).
    #[must_use]
    pub fn language(&self) -> &str {
        self.tag.split('-').next().unwrap_or("")
    }

    /// The next more general culture: `de-AT` → `de` → invariant.
    ///
    /// Returns `None` for the invariant culture.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.is_invariant() {
            return None;
        }
        let tag = match self.tag.rfind('-') {
            Some(idx) => self.tag[..idx].to_string(),
            None => String::new(),
        };
        Some(Self { tag })
    }

    /// This culture followed by all of its parents, ending at invariant.
    #[must_use]
    pub fn lineage(&self) -> Vec<Self> {
        let mut chain = vec![self.clone()];
        let mut cursor = self.parent();
        while let Some(c) = cursor {
            cursor = c.parent();
            chain.push(c);
        }
        chain
    }
}

impl fmt::Display for Culture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invariant() {
            f.write_str("(invariant)")
        } else {
            f.write_str(&self.tag)
        }
    }
}

impl std::str::FromStr for Culture {
    type Err = CultureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Culture {
    type Error = CultureError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Culture {
    type Error = CultureError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Culture> for String {
    fn from(value: Culture) -> Self {
        value.tag
    }
}

impl PartialEq<str> for Culture {
    fn eq(&self, other: &str) -> bool {
        self.tag == other
    }
}

impl PartialEq<&str> for Culture {
    fn eq(&self, other: &&str) -> bool {
        self.tag == *other
    }
}

/// Detect the host culture from environment variables.
///
/// Preference order: `LC_ALL`, `LC_MESSAGES`, then `LANG`. Values that fail
/// to normalize are skipped. Falls back to `"en"`.
#[must_use]
pub fn detect_system_culture() -> Culture {
    let lc_all = env::var("LC_ALL").ok();
    let lc_messages = env::var("LC_MESSAGES").ok();
    let lang = env::var("LANG").ok();
    detect_from(&[lc_all.as_deref(), lc_messages.as_deref(), lang.as_deref()])
}

pub(crate) fn detect_from(candidates: &[Option<&str>]) -> Culture {
    candidates
        .iter()
        .flatten()
        .filter_map(|raw| normalize_tag(raw))
        .find(|tag| !tag.is_empty())
        .map(|tag| Culture { tag })
        .unwrap_or_else(|| Culture {
            tag: "en".to_string(),
        })
}

fn normalize_tag(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let raw = raw.split('@').next().unwrap_or(raw);
    let raw = raw.split('.').next().unwrap_or(raw).trim();
    if raw.is_empty() {
        return Some(String::new());
    }
    if raw.eq_ignore_ascii_case("c") || raw.eq_ignore_ascii_case("posix") {
        return Some("en".to_string());
    }

    let mut out = String::with_capacity(raw.len());
    for (i, part) in raw.split(['-', '_']).enumerate() {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_alphanumeric()) {
            return None;
        }
        if i > 0 {
            out.push('-');
        }
        // BCP-47 casing: language lower, 4-letter script title, region upper,
        // everything else (extlang, variants, numeric regions) lower.
        match (i, part.len()) {
            (0, _) => out.push_str(&part.to_ascii_lowercase()),
            (_, 4) if part.chars().all(|c| c.is_ascii_alphabetic()) => {
                let mut chars = part.chars();
                if let Some(first) = chars.next() {
                    out.push(first.to_ascii_uppercase());
                }
                out.extend(chars.map(|c| c.to_ascii_lowercase()));
            }
            (_, 2) => out.push_str(&part.to_ascii_uppercase()),
            _ => out.push_str(&part.to_ascii_lowercase()),
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_normalizes_posix_forms() {
        assert_eq!(Culture::parse("fr_FR.UTF-8").unwrap(), "fr-FR");
        assert_eq!(Culture::parse("sr_rs@latin").unwrap(), "sr-RS");
        assert_eq!(Culture::parse("C").unwrap(), "en");
        assert_eq!(Culture::parse("zh_hans_cn").unwrap(), "zh-Hans-CN");
    }

    #[test]
    fn variant_subtags_compare_case_insensitively() {
        let upper = Culture::parse("de-DE-Bavaria").unwrap();
        let lower = Culture::parse("de-de-bavaria").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper, "de-DE-bavaria");
        assert_eq!(Culture::parse("ca-ES-VALENCIA").unwrap(), "ca-ES-valencia");
        assert_eq!(Culture::parse("es-419").unwrap(), "es-419");
        assert_eq!(Culture::parse("zh-YUE").unwrap(), "zh-yue");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Culture::parse("en--US").is_err());
        assert!(Culture::parse("en US").is_err());
        assert!(matches!(
            Culture::parse("de/AT"),
            Err(CultureError::Invalid(tag)) if tag == "de/AT"
        ));
    }

    #[test]
    fn blank_is_invariant() {
        let c = Culture::parse("  ").unwrap();
        assert!(c.is_invariant());
        assert_eq!(c, Culture::invariant());
        assert_eq!(c.to_string(), "(invariant)");
    }

    #[test]
    fn lineage_walks_to_invariant() {
        let c = Culture::parse("zh-Hans-CN").unwrap();
        let tags: Vec<String> = c.lineage().into_iter().map(String::from).collect();
        assert_eq!(tags, vec!["zh-Hans-CN", "zh-Hans", "zh", ""]);
        assert_eq!(Culture::invariant().parent(), None);
    }

    #[test]
    fn language_subtag() {
        assert_eq!(Culture::parse("de-AT").unwrap().language(), "de");
        assert_eq!(Culture::invariant().language(), "");
    }

    #[test]
    fn detection_prefers_lc_all() {
        let c = detect_from(&[Some("fr_FR.UTF-8"), None, Some("en_US.UTF-8")]);
        assert_eq!(c, "fr-FR");
    }

    #[test]
    fn detection_skips_blank_and_invalid() {
        let c = detect_from(&[Some(""), Some("??"), Some("de_DE.UTF-8")]);
        assert_eq!(c, "de-DE");
    }

    #[test]
    fn detection_defaults_to_en() {
        assert_eq!(detect_from(&[None, None, None]), "en");
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_tag() {
        let c = Culture::parse("pt_BR").unwrap();
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"pt-BR\"");
        let back: Culture = serde_json::from_str("\"pt-br\"").unwrap();
        assert_eq!(back, c);
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(
            parts in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 1..4)
        ) {
            let raw = parts.join("_");
            let once = Culture::parse(&raw).unwrap();
            let twice = Culture::parse(once.tag()).unwrap();
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn equality_ignores_input_case(
            parts in proptest::collection::vec("[a-zA-Z0-9]{1,8}", 1..4)
        ) {
            let raw = parts.join("-");
            let lower = Culture::parse(&raw.to_ascii_lowercase()).unwrap();
            let upper = Culture::parse(&raw.to_ascii_uppercase()).unwrap();
            prop_assert_eq!(lower, upper);
        }

        #[test]
        fn lineage_terminates_at_invariant(
            parts in proptest::collection::vec("[a-z]{2,3}", 1..5)
        ) {
            let c = Culture::parse(&parts.join("-")).unwrap();
            let chain = c.lineage();
            prop_assert_eq!(chain.len(), parts.len() + 1);
            prop_assert!(chain.last().unwrap().is_invariant());
        }
    }
}
