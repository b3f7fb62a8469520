use std::fmt::Write as _;

use crate::constants::NOOP_REACTION;
use crate::registry::{render, Registration, SpeciesRegistry};
use crate::species::{ParseCodeError, Species, Stoichiometry};

/// Stable index of a reaction in its catalog.
pub type ReactionId = usize;

/// One reaction channel.
///
/// `coefficients` set how the propensity depends on populations; `reactants`
/// set what is consumed and what must be present to fire. The two sides are
/// independent, which allows catalytic and autocatalytic kinetics.
#[derive(Clone, Debug, PartialEq)]
pub struct Reaction {
    pub reactants: Stoichiometry,
    pub products: Stoichiometry,
    pub rate: f64,
    pub coefficients: Stoichiometry,
}

impl Reaction {
    pub fn new(reactants: Stoichiometry, products: Stoichiometry, rate: f64) -> Self {
        Self {
            reactants,
            products,
            rate,
            coefficients: Stoichiometry::empty(),
        }
    }

    pub fn with_coefficients(mut self, coefficients: Stoichiometry) -> Self {
        self.coefficients = coefficients;
        self
    }

    /// Parse the legacy textual form, e.g. `("NR", "NN", 1.0, "N")`.
    pub fn parse(
        reactants: &str,
        products: &str,
        rate: f64,
        coefficients: &str,
    ) -> Result<Self, ParseCodeError> {
        Ok(Self {
            reactants: reactants.parse()?,
            products: products.parse()?,
            rate,
            coefficients: coefficients.parse()?,
        })
    }

    fn noop() -> Self {
        Self::new(Stoichiometry::empty(), Stoichiometry::empty(), 0.0)
    }

    /// Distinct species mentioned on any side, in reactants/products/coefficients order.
    pub fn species(&self) -> Vec<Species> {
        let mut all: Vec<Species> = Vec::new();
        for species in self
            .reactants
            .species()
            .chain(self.products.species())
            .chain(self.coefficients.species())
        {
            if !all.contains(&species) {
                all.push(species);
            }
        }
        all
    }

    /// Net population change of `species` when this reaction fires.
    pub fn net_change(&self, species: Species) -> i64 {
        i64::from(self.products.count_of(species)) - i64::from(self.reactants.count_of(species))
    }
}

/// Why a reaction was not added to the catalog.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Rejection {
    #[error("rate {rate} must be positive and finite")]
    InvalidRate { rate: f64 },
    #[error("unregistered species {}", render(.species))]
    UnknownSpecies { species: Vec<Species> },
}

/// Append-only list of reactions. Index 0 always holds a no-op with rate 0.
#[derive(Clone, Debug)]
pub struct ReactionCatalog {
    reactions: Vec<Reaction>,
}

impl Default for ReactionCatalog {
    fn default() -> Self {
        Self {
            reactions: vec![Reaction::noop()],
        }
    }
}

impl ReactionCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate `reaction` against `registry` and append it.
    ///
    /// Nothing is mutated on rejection. In permissive mode unknown species are
    /// registered with population 0 before the reaction is stored.
    pub fn add_reaction(
        &mut self,
        registry: &mut SpeciesRegistry,
        reaction: Reaction,
        mode: Registration,
    ) -> Result<ReactionId, Rejection> {
        if !(reaction.rate.is_finite() && reaction.rate > 0.0) {
            log::debug!("rejecting reaction with rate {}", reaction.rate);
            return Err(Rejection::InvalidRate {
                rate: reaction.rate,
            });
        }
        let unknown: Vec<Species> = reaction
            .species()
            .into_iter()
            .filter(|&s| !registry.contains(s))
            .collect();
        if !unknown.is_empty() {
            match mode {
                Registration::Strict => {
                    log::debug!(
                        "rejecting reaction {} -> {}: unregistered species {}",
                        reaction.reactants,
                        reaction.products,
                        render(&unknown)
                    );
                    return Err(Rejection::UnknownSpecies { species: unknown });
                }
                Registration::Permissive => {
                    for species in unknown {
                        registry.register(species, 0);
                    }
                }
            }
        }
        self.reactions.push(reaction);
        Ok(self.reactions.len() - 1)
    }

    /// Number of reactions, including the no-op at index 0.
    pub fn len(&self) -> usize {
        self.reactions.len()
    }

    /// True when only the no-op is present.
    pub fn is_empty(&self) -> bool {
        self.reactions.len() <= 1
    }

    pub fn get(&self, id: ReactionId) -> Option<&Reaction> {
        self.reactions.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reaction> {
        self.reactions.iter()
    }

    /// Reactions added by callers, with their ids.
    pub fn user_reactions(&self) -> impl Iterator<Item = (ReactionId, &Reaction)> {
        self.reactions.iter().enumerate().skip(NOOP_REACTION + 1)
    }

    /// Tab-separated listing of the user reactions for diagnostics.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        if self.is_empty() {
            out.push_str("# No reactions defined\n");
            return out;
        }
        out.push_str("# Reactants\tProducts\tRate\tCoefficients\n");
        out.push_str("# =============================================\n");
        for (_, reaction) in self.user_reactions() {
            let _ = writeln!(
                out,
                "# {}\t->\t{}\t{:e}\t{}",
                reaction.reactants, reaction.products, reaction.rate, reaction.coefficients
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> Stoichiometry {
        Stoichiometry::parse(s).unwrap()
    }

    fn reaction(r: &str, p: &str, rate: f64, c: &str) -> Reaction {
        Reaction::parse(r, p, rate, c).unwrap()
    }

    #[test]
    fn new_catalog_holds_only_the_noop() {
        let catalog = ReactionCatalog::new();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.is_empty());
        let noop = catalog.get(NOOP_REACTION).unwrap();
        assert_eq!(noop.rate, 0.0);
        assert!(noop.reactants.is_empty() && noop.products.is_empty());
    }

    #[test]
    fn rejects_non_positive_and_non_finite_rates() {
        let mut registry = SpeciesRegistry::with_species(&code("A"));
        let mut catalog = ReactionCatalog::new();
        for rate in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let result = catalog.add_reaction(
                &mut registry,
                reaction("A", "0", rate, "A"),
                Registration::Permissive,
            );
            assert!(matches!(result, Err(Rejection::InvalidRate { .. })));
        }
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn strict_mode_rejects_unknown_species_without_side_effects() {
        let mut registry = SpeciesRegistry::with_species(&code("A"));
        let mut catalog = ReactionCatalog::new();
        let result = catalog.add_reaction(
            &mut registry,
            reaction("A", "B", 1.0, "C"),
            Registration::Strict,
        );
        assert_eq!(
            result,
            Err(Rejection::UnknownSpecies {
                species: vec![Species::new('B').unwrap(), Species::new('C').unwrap()]
            })
        );
        assert_eq!(catalog.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn permissive_mode_registers_species_at_zero() {
        let mut registry = SpeciesRegistry::new();
        let mut catalog = ReactionCatalog::new();
        let id = catalog
            .add_reaction(
                &mut registry,
                reaction("Bb", "BB", 1.0, "B"),
                Registration::Permissive,
            )
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.populations(), &[0, 0]);
    }

    #[test]
    fn net_change_accounts_for_both_sides() {
        let r = reaction("PR", "PP", 1.0, "0");
        let p = Species::new('P').unwrap();
        let rr = Species::new('R').unwrap();
        assert_eq!(r.net_change(p), 1);
        assert_eq!(r.net_change(rr), -1);
    }

    #[test]
    fn describe_lists_user_reactions() {
        let mut registry = SpeciesRegistry::new();
        let mut catalog = ReactionCatalog::new();
        assert_eq!(catalog.describe(), "# No reactions defined\n");
        catalog
            .add_reaction(
                &mut registry,
                reaction("GA", "0", 2.0, "G"),
                Registration::Permissive,
            )
            .unwrap();
        let listing = catalog.describe();
        assert!(listing.starts_with("# Reactants\tProducts\tRate\tCoefficients\n"));
        assert!(listing.contains("# GA\t->\t0\t2e0\tG\n"));
    }
}
