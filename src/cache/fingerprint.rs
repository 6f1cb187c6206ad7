// src/cache/fingerprint.rs
//! Lexical fingerprints for near-duplicate detection.
//!
//! A fingerprint is the list of the most frequent significant tokens of a
//! posting with their counts. It is a cheap sketch, not an embedding: two
//! postings are compared by the Jaccard overlap of their token sets.

use super::normalize::normalize;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

pub const MAX_FINGERPRINT_TOKENS: usize = 20;
/// Tokens of this many characters or fewer are ignored.
pub const MIN_TOKEN_CHARS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fingerprint {
    entries: Vec<(String, u32)>,
}

impl Fingerprint {
    pub fn from_text(text: &str) -> Self {
        let stripped: String = normalize(text)
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '_' || c.is_whitespace())
            .collect();

        // Insertion order is kept so equal counts rank by first occurrence.
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<String, u32> = HashMap::new();
        for token in stripped.split_whitespace() {
            if token.chars().count() <= MIN_TOKEN_CHARS {
                continue;
            }
            let count = counts.entry(token.to_string()).or_insert_with(|| {
                order.push(token.to_string());
                0
            });
            *count += 1;
        }

        let mut entries: Vec<(String, u32)> = order
            .into_iter()
            .map(|token| {
                let count = counts[&token];
                (token, count)
            })
            .collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));
        entries.truncate(MAX_FINGERPRINT_TOKENS);

        Self { entries }
    }

    pub fn entries(&self) -> &[(String, u32)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn token_set(&self) -> HashSet<&str> {
        self.entries.iter().map(|(token, _)| token.as_str()).collect()
    }

    /// Jaccard similarity of the token sets, counts ignored.
    ///
    /// Two empty fingerprints are identical and score 1.0.
    pub fn similarity(&self, other: &Fingerprint) -> f64 {
        let a = self.token_set();
        let b = other.token_set();
        let union = a.union(&b).count();
        if union == 0 {
            return 1.0;
        }
        let intersection = a.intersection(&b).count();
        intersection as f64 / union as f64
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self
            .entries
            .iter()
            .map(|(token, count)| format!("{}:{}", token, count))
            .collect::<Vec<_>>()
            .join("|");
        f.write_str(&encoded)
    }
}

impl FromStr for Fingerprint {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::default());
        }

        let mut entries = Vec::new();
        for part in s.split('|') {
            let (token, count) = part
                .rsplit_once(':')
                .ok_or_else(|| anyhow::anyhow!("Fingerprint entry without count: {}", part))?;
            if token.is_empty() {
                anyhow::bail!("Fingerprint entry with empty token: {}", part);
            }
            let count = count
                .parse::<u32>()
                .map_err(|_| anyhow::anyhow!("Invalid fingerprint count in entry: {}", part))?;
            entries.push((token.to_string(), count));
        }

        if entries.len() > MAX_FINGERPRINT_TOKENS {
            anyhow::bail!(
                "Fingerprint has {} tokens, at most {} allowed",
                entries.len(),
                MAX_FINGERPRINT_TOKENS
            );
        }

        Ok(Self { entries })
    }
}
