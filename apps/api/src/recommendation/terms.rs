//! Academic term progression (1A through 4B) and the course level each term implies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Level assumed when the profile's term is missing or unrecognized.
pub const DEFAULT_TERM_LEVEL: i32 = 200;

/// Successor assumed for an unrecognized term code.
pub const DEFAULT_NEXT_TERM: &str = "2A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AcademicTerm {
    #[serde(rename = "1A")]
    OneA,
    #[serde(rename = "1B")]
    OneB,
    #[serde(rename = "2A")]
    TwoA,
    #[serde(rename = "2B")]
    TwoB,
    #[serde(rename = "3A")]
    ThreeA,
    #[serde(rename = "3B")]
    ThreeB,
    #[serde(rename = "4A")]
    FourA,
    #[serde(rename = "4B")]
    FourB,
}

impl AcademicTerm {
    pub const ALL: [AcademicTerm; 8] = [
        AcademicTerm::OneA,
        AcademicTerm::OneB,
        AcademicTerm::TwoA,
        AcademicTerm::TwoB,
        AcademicTerm::ThreeA,
        AcademicTerm::ThreeB,
        AcademicTerm::FourA,
        AcademicTerm::FourB,
    ];

    pub fn code(&self) -> &'static str {
        match self {
            AcademicTerm::OneA => "1A",
            AcademicTerm::OneB => "1B",
            AcademicTerm::TwoA => "2A",
            AcademicTerm::TwoB => "2B",
            AcademicTerm::ThreeA => "3A",
            AcademicTerm::ThreeB => "3B",
            AcademicTerm::FourA => "4A",
            AcademicTerm::FourB => "4B",
        }
    }

    /// Course level (100-400) matching the student's year.
    pub fn level(&self) -> i32 {
        match self {
            AcademicTerm::OneA | AcademicTerm::OneB => 100,
            AcademicTerm::TwoA | AcademicTerm::TwoB => 200,
            AcademicTerm::ThreeA | AcademicTerm::ThreeB => 300,
            AcademicTerm::FourA | AcademicTerm::FourB => 400,
        }
    }

    /// Chronological successor. 4B is terminal and maps to itself.
    pub fn next(&self) -> AcademicTerm {
        match self {
            AcademicTerm::OneA => AcademicTerm::OneB,
            AcademicTerm::OneB => AcademicTerm::TwoA,
            AcademicTerm::TwoA => AcademicTerm::TwoB,
            AcademicTerm::TwoB => AcademicTerm::ThreeA,
            AcademicTerm::ThreeA => AcademicTerm::ThreeB,
            AcademicTerm::ThreeB => AcademicTerm::FourA,
            AcademicTerm::FourA | AcademicTerm::FourB => AcademicTerm::FourB,
        }
    }
}

impl fmt::Display for AcademicTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown academic term '{0}' (expected 1A..4B)")]
pub struct UnknownTerm(pub String);

impl FromStr for AcademicTerm {
    type Err = UnknownTerm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AcademicTerm::ALL
            .into_iter()
            .find(|t| t.code() == s)
            .ok_or_else(|| UnknownTerm(s.to_string()))
    }
}

/// Level implied by a raw term code; unknown codes fall back to 200.
pub fn term_level(term: &str) -> i32 {
    term.parse::<AcademicTerm>()
        .map(|t| t.level())
        .unwrap_or(DEFAULT_TERM_LEVEL)
}

/// Successor code for a raw term code; unknown codes fall back to "2A".
pub fn next_term_code(term: &str) -> &'static str {
    term.parse::<AcademicTerm>()
        .map(|t| t.next().code())
        .unwrap_or(DEFAULT_NEXT_TERM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_pair_by_year() {
        assert_eq!(term_level("1A"), 100);
        assert_eq!(term_level("1B"), 100);
        assert_eq!(term_level("2B"), 200);
        assert_eq!(term_level("3A"), 300);
        assert_eq!(term_level("4B"), 400);
    }

    #[test]
    fn test_unknown_term_level_defaults_to_200() {
        assert_eq!(term_level("5A"), 200);
        assert_eq!(term_level(""), 200);
        assert_eq!(term_level("3b"), 200);
    }

    #[test]
    fn test_progression_walks_all_terms() {
        let codes: Vec<&str> = AcademicTerm::ALL.iter().map(|t| t.next().code()).collect();
        assert_eq!(codes, ["1B", "2A", "2B", "3A", "3B", "4A", "4B", "4B"]);
    }

    #[test]
    fn test_next_term_of_unknown_is_2a() {
        assert_eq!(next_term_code("grad"), "2A");
        assert_eq!(next_term_code("3B"), "4A");
    }

    #[test]
    fn test_parse_rejects_unknown_code() {
        assert!("4C".parse::<AcademicTerm>().is_err());
        assert_eq!("2A".parse::<AcademicTerm>(), Ok(AcademicTerm::TwoA));
    }
}
