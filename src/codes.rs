//! Canonical behavior codes
//!
//! Behavior annotations arrive as free text typed by hand into spreadsheets. This module
//! defines the closed set of canonical codes they are mapped onto, and the raw synonyms
//! each code is allowed to appear as.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Canonical larval behavior, serialized as its single-letter code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorCode {
    #[serde(rename = "Q")]
    Quiet,
    #[serde(rename = "F")]
    Forward,
    #[serde(rename = "B")]
    Backward,
    #[serde(rename = "H")]
    Hunch,
    #[serde(rename = "T")]
    Turn,
    #[serde(rename = "O")]
    Other,
    #[serde(rename = "P")]
    BackHunch,
}

/// Raw spreadsheet synonyms for each code, in declaration order.
///
/// Synonym sets must be pairwise disjoint; the recoder rejects any label matched twice.
/// The leading-space `" hunch"` is a real variant found in the annotation sheets.
pub const BEHAVIOR_CODES: &[(BehaviorCode, &[&str])] = &[
    (BehaviorCode::Quiet, &["Quiet", "quiet"]),
    (BehaviorCode::Forward, &["Forward", "forward"]),
    (BehaviorCode::Backward, &["Backward", "backward"]),
    (BehaviorCode::Hunch, &["Hunch", "hunch", " hunch"]),
    (BehaviorCode::Turn, &["Turn", "turn"]),
    (BehaviorCode::Other, &["Other", "other", "others"]),
    (BehaviorCode::BackHunch, &["Back Hunch", "back hunch"]),
];

impl BehaviorCode {
    /// All codes in declaration order
    pub const ALL: [BehaviorCode; 7] = [
        BehaviorCode::Quiet,
        BehaviorCode::Forward,
        BehaviorCode::Backward,
        BehaviorCode::Hunch,
        BehaviorCode::Turn,
        BehaviorCode::Other,
        BehaviorCode::BackHunch,
    ];

    /// Single-letter code as used in output tables
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorCode::Quiet => "Q",
            BehaviorCode::Forward => "F",
            BehaviorCode::Backward => "B",
            BehaviorCode::Hunch => "H",
            BehaviorCode::Turn => "T",
            BehaviorCode::Other => "O",
            BehaviorCode::BackHunch => "P",
        }
    }

    /// Human-readable behavior name
    pub fn name(&self) -> &'static str {
        match self {
            BehaviorCode::Quiet => "Quiet",
            BehaviorCode::Forward => "Forward",
            BehaviorCode::Backward => "Backward",
            BehaviorCode::Hunch => "Hunch",
            BehaviorCode::Turn => "Turn",
            BehaviorCode::Other => "Other",
            BehaviorCode::BackHunch => "Back Hunch",
        }
    }

    /// Raw synonyms registered for this code in [`BEHAVIOR_CODES`]
    pub fn synonyms(&self) -> &'static [&'static str] {
        BEHAVIOR_CODES
            .iter()
            .find(|(code, _)| code == self)
            .map(|(_, synonyms)| *synonyms)
            .unwrap_or(&[])
    }

    /// Parse a canonical single-letter code
    pub fn from_letter(letter: &str) -> Option<BehaviorCode> {
        BehaviorCode::ALL
            .into_iter()
            .find(|code| code.as_str() == letter)
    }
}

/// Codes sort by letter, so default behavior lists come out as B, F, H, O, P, Q, T.
impl Ord for BehaviorCode {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_str().cmp(other.as_str())
    }
}

impl PartialOrd for BehaviorCode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BehaviorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BehaviorCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BehaviorCode::from_letter(s.trim()).ok_or_else(|| {
            format!(
                "Unknown behavior code '{}' (expected one of Q, F, B, H, T, O, P)",
                s
            )
        })
    }
}

/// The synonym table extended with each code's own letter.
///
/// Annotation blobs exported from MATLAB may already carry canonical letters. Letters never
/// collide with a synonym, so the extended table is still a partition.
pub fn table_with_letters() -> Vec<(BehaviorCode, Vec<&'static str>)> {
    BEHAVIOR_CODES
        .iter()
        .map(|(code, synonyms)| {
            let mut labels = Vec::with_capacity(synonyms.len() + 1);
            labels.push(code.as_str());
            labels.extend_from_slice(synonyms);
            (*code, labels)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_synonym_sets_are_disjoint() {
        let mut seen = HashSet::new();
        for (_, synonyms) in BEHAVIOR_CODES {
            for synonym in synonyms.iter() {
                assert!(seen.insert(*synonym), "synonym {:?} registered twice", synonym);
            }
        }
    }

    #[test]
    fn test_letters_extend_table_without_collision() {
        let mut seen = HashSet::new();
        for (_, labels) in table_with_letters() {
            for label in labels {
                assert!(seen.insert(label));
            }
        }
        assert_eq!(seen.len(), 7 + 16);
    }

    #[test]
    fn test_ordering_follows_letters() {
        let mut codes = BehaviorCode::ALL.to_vec();
        codes.sort();
        let letters: Vec<&str> = codes.iter().map(|c| c.as_str()).collect();
        assert_eq!(letters, vec!["B", "F", "H", "O", "P", "Q", "T"]);
    }

    #[test]
    fn test_letter_round_trip_and_serde() {
        for code in BehaviorCode::ALL {
            assert_eq!(code.as_str().parse::<BehaviorCode>().unwrap(), code);
        }
        assert!("X".parse::<BehaviorCode>().is_err());

        let json = serde_json::to_string(&BehaviorCode::BackHunch).unwrap();
        assert_eq!(json, "\"P\"");
    }

    #[test]
    fn test_synonyms_lookup() {
        assert_eq!(BehaviorCode::Hunch.synonyms(), &["Hunch", "hunch", " hunch"]);
        assert_eq!(BehaviorCode::BackHunch.name(), "Back Hunch");
    }
}
