//! Hierarchical citation references
//!
//! A citation such as `1.22.3` (book, chapter, section) addresses one
//! passage of a canonically structured text. Components are unsigned
//! integers compared level by level.

use atoi::FromRadix10Checked;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CitationError {
    #[error("empty citation")]
    Empty,

    #[error("invalid component {component:?} in citation {citation:?}")]
    InvalidComponent { citation: String, component: String },
}

/// How a reference is tested against a `start..=end` citation range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RangeMode {
    /// Every component of `start` is <= the reference's and every component
    /// of `end` is >= it, level by level.
    #[default]
    Componentwise,
    /// The reference falls between `start` and `end` in document order.
    Ordered,
}

/// A hierarchical citation reference
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Citation(Vec<u32>);

impl Citation {
    pub fn new(components: Vec<u32>) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[u32] {
        &self.0
    }

    /// Number of citation levels
    pub fn depth(&self) -> usize {
        self.0.len()
    }

    /// Test whether this reference lies inside `start..=end`.
    ///
    /// Ranges are compared over their own depth, so a section-level
    /// reference can fall inside a chapter-level range. A reference that is
    /// shallower than either bound never matches: `1` is not inside
    /// `1.1..=1.5` even though it agrees with both bounds on the first level.
    pub fn within(&self, start: &Citation, end: &Citation, mode: RangeMode) -> bool {
        if self.depth() < start.depth() || self.depth() < end.depth() {
            return false;
        }

        match mode {
            RangeMode::Componentwise => {
                let after_start = start.0.iter().zip(&self.0).all(|(s, r)| s <= r);
                let before_end = end.0.iter().zip(&self.0).all(|(e, r)| e >= r);
                after_start && before_end
            }
            RangeMode::Ordered => {
                self.0[..start.depth()] >= start.0[..] && self.0[..end.depth()] <= end.0[..]
            }
        }
    }
}

impl From<Vec<u32>> for Citation {
    fn from(components: Vec<u32>) -> Self {
        Self(components)
    }
}

impl FromStr for Citation {
    type Err = CitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(CitationError::Empty);
        }

        let components = s
            .split('.')
            .map(|part| {
                parse_component(part).ok_or_else(|| CitationError::InvalidComponent {
                    citation: s.to_string(),
                    component: part.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(components))
    }
}

/// Parse a run of ASCII digits, rejecting signs, blanks and overflow
fn parse_component(part: &str) -> Option<u32> {
    let bytes = part.as_bytes();
    if bytes.is_empty() {
        return None;
    }
    match u32::from_radix_10_checked(bytes) {
        (Some(n), used) if used == bytes.len() => Some(n),
        _ => None,
    }
}

impl fmt::Display for Citation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(s: &str) -> Citation {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_and_display() {
        let c = cite("1.22.3");
        assert_eq!(c.components(), &[1, 22, 3]);
        assert_eq!(c.depth(), 3);
        assert_eq!(c.to_string(), "1.22.3");
        assert_eq!(cite(" 7 ").components(), &[7]);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!("".parse::<Citation>(), Err(CitationError::Empty));
        assert!("1..2".parse::<Citation>().is_err());
        assert!("1.a".parse::<Citation>().is_err());
        assert!("1.-2".parse::<Citation>().is_err());
        assert!("1.+2".parse::<Citation>().is_err());
        assert!("1.2 3".parse::<Citation>().is_err());
        assert!("4294967296".parse::<Citation>().is_err());
    }

    #[test]
    fn test_within_componentwise() {
        let start = cite("1.1");
        let end = cite("1.5");
        assert!(cite("1.3").within(&start, &end, RangeMode::Componentwise));
        assert!(cite("1.1").within(&start, &end, RangeMode::Componentwise));
        assert!(cite("1.5").within(&start, &end, RangeMode::Componentwise));
        assert!(!cite("1.6").within(&start, &end, RangeMode::Componentwise));
        assert!(!cite("2.3").within(&start, &end, RangeMode::Componentwise));
    }

    #[test]
    fn test_within_deeper_reference_uses_range_depth() {
        let start = cite("1.1");
        let end = cite("1.5");
        assert!(cite("1.3.9").within(&start, &end, RangeMode::Componentwise));
        assert!(cite("1.3.9").within(&start, &end, RangeMode::Ordered));
    }

    #[test]
    fn test_within_rejects_short_reference() {
        let start = cite("1.1");
        let end = cite("1.5");
        assert!(!cite("1").within(&start, &end, RangeMode::Componentwise));
        assert!(!cite("1").within(&start, &end, RangeMode::Ordered));
    }

    #[test]
    fn test_ordered_spans_chapter_boundary() {
        let start = cite("1.22.1");
        let end = cite("1.23.3");
        let reference = cite("1.22.5");
        // Level-by-level comparison fails on the section: 5 > 3
        assert!(!reference.within(&start, &end, RangeMode::Componentwise));
        assert!(reference.within(&start, &end, RangeMode::Ordered));
        assert!(!cite("1.23.4").within(&start, &end, RangeMode::Ordered));
        assert!(!cite("1.21.9").within(&start, &end, RangeMode::Ordered));
    }
}
