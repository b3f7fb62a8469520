use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::constants::NULL_SYMBOL;

/// A single species symbol.
///
/// The reserved null symbol never forms a `Species`; it only exists in
/// textual codes, where it marks an empty side of a reaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct Species(char);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SpeciesError {
    #[error("'0' is the null symbol and cannot name a species")]
    NullSymbol,
    #[error("whitespace cannot name a species")]
    Whitespace,
}

impl Species {
    pub fn new(symbol: char) -> Result<Self, SpeciesError> {
        if symbol == NULL_SYMBOL {
            return Err(SpeciesError::NullSymbol);
        }
        if symbol.is_whitespace() {
            return Err(SpeciesError::Whitespace);
        }
        Ok(Self(symbol))
    }

    pub fn symbol(self) -> char {
        self.0
    }
}

impl TryFrom<char> for Species {
    type Error = SpeciesError;

    fn try_from(symbol: char) -> Result<Self, Self::Error> {
        Self::new(symbol)
    }
}

impl From<Species> for char {
    fn from(species: Species) -> Self {
        species.0
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Multiset of species with integer multiplicities.
///
/// Terms keep first-encounter order and every count is at least one, so two
/// codes spelling the same multiset in the same order compare equal. The
/// legacy textual form repeats a symbol once per unit (`"AAB"` is two `A` and
/// one `B`); null symbols are dropped while parsing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Stoichiometry {
    terms: Vec<(Species, u32)>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid species code {code:?}: {source}")]
pub struct ParseCodeError {
    pub code: String,
    #[source]
    pub source: SpeciesError,
}

impl Stoichiometry {
    /// The empty multiset, written `"0"`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from explicit terms. Zero counts are skipped and repeated
    /// species are merged into their first occurrence.
    pub fn from_terms(terms: impl IntoIterator<Item = (Species, u32)>) -> Self {
        let mut stoichiometry = Self::empty();
        for (species, count) in terms {
            stoichiometry.add(species, count);
        }
        stoichiometry
    }

    pub fn parse(code: &str) -> Result<Self, ParseCodeError> {
        let mut stoichiometry = Self::empty();
        for symbol in code.chars().filter(|&c| c != NULL_SYMBOL) {
            let species = Species::new(symbol).map_err(|source| ParseCodeError {
                code: code.to_string(),
                source,
            })?;
            stoichiometry.add(species, 1);
        }
        Ok(stoichiometry)
    }

    fn add(&mut self, species: Species, count: u32) {
        if count == 0 {
            return;
        }
        match self.terms.iter_mut().find(|(s, _)| *s == species) {
            Some((_, existing)) => *existing = existing.saturating_add(count),
            None => self.terms.push((species, count)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// `(species, multiplicity)` pairs in first-encounter order.
    pub fn terms(&self) -> &[(Species, u32)] {
        &self.terms
    }

    /// Distinct species in first-encounter order.
    pub fn species(&self) -> impl Iterator<Item = Species> + '_ {
        self.terms.iter().map(|&(species, _)| species)
    }

    pub fn count_of(&self, species: Species) -> u32 {
        self.terms
            .iter()
            .find(|(s, _)| *s == species)
            .map_or(0, |&(_, count)| count)
    }

    /// Total number of units, counting multiplicity.
    pub fn total_count(&self) -> u64 {
        self.terms.iter().map(|&(_, count)| u64::from(count)).sum()
    }
}

impl FromStr for Stoichiometry {
    type Err = ParseCodeError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        Self::parse(code)
    }
}

impl fmt::Display for Stoichiometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "{NULL_SYMBOL}");
        }
        for &(species, count) in &self.terms {
            for _ in 0..count {
                write!(f, "{species}")?;
            }
        }
        Ok(())
    }
}
