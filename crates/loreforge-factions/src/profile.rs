//! Trait and value sampling for new faction personalities.
//!
//! A fresh personality starts from uniform random traits, gets nudged by
//! faction kind (a temple hierarchy leans religious and idealistic, a
//! thieves' guild secretive and pragmatic), then derives its decision
//! weights as fixed combinations of specific trait/value pairs,
//! normalized to sum to 1.

use std::collections::BTreeMap;

use rand::Rng;

use loreforge_types::FactionKind;

/// The named traits every personality carries.
pub const TRAIT_NAMES: &[&str] = &[
    "aggressive",
    "ambitious",
    "cautious",
    "diplomatic",
    "honorable",
    "idealistic",
    "mercantile",
    "militaristic",
    "pragmatic",
    "religious",
    "scholarly",
    "secretive",
];

/// The named values every personality carries.
pub const VALUE_NAMES: &[&str] = &[
    "freedom",
    "glory",
    "honor",
    "innovation",
    "knowledge",
    "order",
    "power",
    "security",
    "tradition",
    "wealth",
];

/// Per-kind trait adjustments applied after uniform sampling.
///
/// Each entry is `(trait_name, signed_adjustment)`; results are clamped
/// to `[0, 1]`.
const fn kind_adjustments(kind: FactionKind) -> &'static [(&'static str, f64)] {
    match kind {
        FactionKind::Religious => &[("religious", 0.5), ("idealistic", 0.3)],
        FactionKind::Military => &[("militaristic", 0.5), ("aggressive", 0.3)],
        FactionKind::Criminal => &[("secretive", 0.5), ("pragmatic", 0.3), ("honorable", -0.3)],
        FactionKind::Mercantile => &[("mercantile", 0.5), ("pragmatic", 0.2)],
        FactionKind::Political => &[("diplomatic", 0.4), ("ambitious", 0.3)],
        FactionKind::Arcane => &[("scholarly", 0.4), ("secretive", 0.2)],
        FactionKind::Scholarly => &[("scholarly", 0.5), ("cautious", 0.2)],
        FactionKind::Cult => &[("religious", 0.4), ("secretive", 0.4), ("aggressive", 0.2)],
    }
}

/// Sample the trait map: uniform in `[0, 1]`, adjusted per kind, clamped.
pub fn sample_traits(rng: &mut impl Rng, kind: FactionKind) -> BTreeMap<String, f64> {
    let mut traits: BTreeMap<String, f64> = TRAIT_NAMES
        .iter()
        .map(|name| ((*name).to_owned(), rng.random_range(0.0..1.0)))
        .collect();

    for &(name, adjustment) in kind_adjustments(kind) {
        if let Some(value) = traits.get_mut(name) {
            *value = (*value + adjustment).clamp(0.0, 1.0);
        }
    }

    traits
}

/// Sample the value map: uniform in `[0, 1]`, then boost 3..=5 randomly
/// chosen values to `uniform(0.7, 1.0)` so every faction has something
/// it genuinely cares about.
pub fn sample_values(rng: &mut impl Rng) -> BTreeMap<String, f64> {
    let mut values: BTreeMap<String, f64> = VALUE_NAMES
        .iter()
        .map(|name| ((*name).to_owned(), rng.random_range(0.0..1.0)))
        .collect();

    let boost_count = rng.random_range(3..=5);
    let mut names: Vec<&str> = VALUE_NAMES.to_vec();
    for _ in 0..boost_count {
        if names.is_empty() {
            break;
        }
        let index = rng.random_range(0..names.len());
        let name = names.swap_remove(index);
        if let Some(value) = values.get_mut(name) {
            *value = rng.random_range(0.7..1.0);
        }
    }

    values
}

/// Look up a map entry, defaulting to 0 for unknown names.
fn get(map: &BTreeMap<String, f64>, name: &str) -> f64 {
    map.get(name).copied().unwrap_or(0.0)
}

/// Derive decision weights as fixed trait/value combinations, normalized
/// so the weights sum to 1 (uniform when everything is zero).
pub fn derive_weights(
    traits: &BTreeMap<String, f64>,
    values: &BTreeMap<String, f64>,
) -> BTreeMap<String, f64> {
    let mut weights = BTreeMap::new();
    weights.insert(
        String::from("economic_benefit"),
        0.5 * get(values, "wealth") + 0.5 * get(traits, "mercantile"),
    );
    weights.insert(
        String::from("military_advantage"),
        0.5 * get(values, "power") + 0.5 * get(traits, "militaristic"),
    );
    weights.insert(
        String::from("political_gain"),
        0.4 * get(values, "power") + 0.6 * get(traits, "ambitious"),
    );
    weights.insert(
        String::from("knowledge_pursuit"),
        0.5 * get(values, "knowledge") + 0.5 * get(traits, "scholarly"),
    );
    weights.insert(
        String::from("reputation"),
        0.5 * get(values, "honor") + 0.5 * get(traits, "honorable"),
    );
    weights.insert(
        String::from("risk_tolerance"),
        0.5 * get(traits, "aggressive") + 0.5 * (1.0 - get(traits, "cautious")),
    );

    normalize(&mut weights);
    weights
}

/// Scale the map in place so its entries sum to 1. A zero-sum map
/// becomes uniform.
fn normalize(weights: &mut BTreeMap<String, f64>) {
    let sum: f64 = weights.values().sum();
    if sum > f64::EPSILON {
        for value in weights.values_mut() {
            *value /= sum;
        }
    } else if !weights.is_empty() {
        let uniform = 1.0 / weights.len() as f64;
        for value in weights.values_mut() {
            *value = uniform;
        }
    }
}
