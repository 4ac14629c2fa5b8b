use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Term-to-position boosts applied to fallback vectors.
///
/// Fallback vectors are pseudo-random, so on their own two queries about shoes
/// land nowhere near each other. Adding a fixed increment at the same positions for
/// shared vocabulary gives fallback vectors a weak topical pull toward each other.
/// Related terms deliberately share some positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostTable {
    /// Added to every mapped position of a matching term.
    pub increment: f32,
    /// Lowercased term -> vector positions.
    pub terms: HashMap<String, Vec<usize>>,
}

const DEFAULT_INCREMENT: f32 = 0.5;

const RETAIL_TERMS: &[(&str, &[usize])] = &[
    ("shoes", &[0, 1, 2, 3, 4, 5]),
    ("running", &[6, 7, 8, 9, 10, 11]),
    ("marathon", &[8, 9, 10, 11, 12, 13]),
    ("training", &[14, 15, 16, 17, 18, 19]),
    ("athletic", &[20, 21, 22, 23, 24, 25]),
    ("sports", &[22, 23, 24, 25, 26, 27]),
    ("fitness", &[28, 29, 30, 31, 32, 33]),
    ("exercise", &[30, 31, 32, 33, 34, 35]),
    ("workout", &[32, 33, 34, 35, 36, 37]),
    ("comfortable", &[40, 41, 42, 43, 44, 45]),
];

impl BoostTable {
    /// An empty table with the given increment.
    pub fn new(increment: f32) -> Self {
        Self {
            increment,
            terms: HashMap::new(),
        }
    }

    /// No boosts at all; fallback vectors stay purely hash-derived.
    pub fn empty() -> Self {
        Self::new(DEFAULT_INCREMENT)
    }

    /// Athletic-retail vocabulary used by the default catalog.
    pub fn retail_default() -> Self {
        RETAIL_TERMS
            .iter()
            .fold(Self::new(DEFAULT_INCREMENT), |table, (term, positions)| {
                table.with_term(*term, positions.to_vec())
            })
    }

    pub fn with_term(mut self, term: impl Into<String>, positions: Vec<usize>) -> Self {
        self.terms.insert(term.into().to_lowercase(), positions);
        self
    }

    pub fn positions(&self, term: &str) -> Option<&[usize]> {
        self.terms.get(term).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Add the increment for every whitespace token of `lowered` found in the table.
    /// Positions beyond the vector length are ignored.
    pub fn apply(&self, lowered: &str, vector: &mut [f32]) {
        for token in lowered.split_whitespace() {
            let Some(positions) = self.positions(token) else {
                continue;
            };
            for &pos in positions {
                if let Some(slot) = vector.get_mut(pos) {
                    *slot += self.increment;
                }
            }
        }
    }
}

impl Default for BoostTable {
    fn default() -> Self {
        Self::retail_default()
    }
}
