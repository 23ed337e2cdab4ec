//! Option scoring and memory selection for faction decisions.
//!
//! The scoring is deliberately simple and fully deterministic: it is
//! both the ranking shown to the LLM and the fallback answer when the
//! LLM is unavailable or returns something unusable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use loreforge_types::{FactionId, FactionMemory, FactionPersonality};

/// A choice put before a faction.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FactionDecision {
    /// Decision category (e.g. `diplomatic`, `military`, `economic`).
    pub decision_type: String,
    /// What is being decided.
    pub description: String,
    /// The faction the decision concerns, if it concerns one.
    pub subject: Option<FactionId>,
    /// The options on the table.
    pub options: Vec<DecisionOption>,
}

/// One course of action a faction may take.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DecisionOption {
    /// Short name, used to match the LLM's pick.
    pub name: String,
    /// What taking this option means.
    pub description: String,
    /// Expected upsides.
    pub benefits: Vec<String>,
    /// Expected downsides.
    pub risks: Vec<String>,
    /// Numeric costs (gold, troops, favors) keyed by resource name.
    pub requirements: BTreeMap<String, f64>,
}

/// The outcome of a faction decision.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionOutcome {
    /// Name of the chosen option.
    pub choice: String,
    /// The LLM's stated reasoning, when the LLM made the pick.
    pub reasoning: Option<String>,
    /// Deterministic score per option name.
    pub scores: BTreeMap<String, f64>,
}

/// Trait level above which a disposition changes how risks are weighed.
const TRAIT_GATE: f64 = 0.6;

/// Score one option against a personality.
///
/// Base is half a point per benefit. Pragmatic factions subtract
/// `0.3` per risk, aggressive factions add `0.1` per risk (danger is
/// opportunity), and every unit of numeric requirement costs `0.1`.
pub fn score_option(personality: &FactionPersonality, option: &DecisionOption) -> f64 {
    let mut score = option.benefits.len() as f64 * 0.5;

    let pragmatic = personality.traits.get("pragmatic").copied().unwrap_or(0.0);
    let aggressive = personality.traits.get("aggressive").copied().unwrap_or(0.0);
    let risk_count = option.risks.len() as f64;

    if pragmatic > TRAIT_GATE {
        score -= 0.3 * risk_count;
    }
    if aggressive > TRAIT_GATE {
        score += 0.1 * risk_count;
    }

    let requirement_total: f64 = option.requirements.values().sum();
    score -= 0.1 * requirement_total;

    score
}

/// Score every option, keyed by option name.
pub fn score_options(
    personality: &FactionPersonality,
    decision: &FactionDecision,
) -> BTreeMap<String, f64> {
    decision
        .options
        .iter()
        .map(|option| (option.name.clone(), score_option(personality, option)))
        .collect()
}

/// The option with the highest deterministic score (first wins ties).
pub fn best_option<'a>(
    personality: &FactionPersonality,
    decision: &'a FactionDecision,
) -> Option<&'a DecisionOption> {
    let mut best: Option<(&DecisionOption, f64)> = None;
    for option in &decision.options {
        let score = score_option(personality, option);
        let replace = match best {
            Some((_, best_score)) => score > best_score,
            None => true,
        };
        if replace {
            best = Some((option, score));
        }
    }
    best.map(|(option, _)| option)
}

/// Map a decision category to the memory event type it resonates with.
///
/// Only two categories are mapped; decisions of any other category rely
/// purely on participant matching to retrieve memories.
pub fn relevant_event_type(decision_type: &str) -> Option<&'static str> {
    match decision_type {
        "diplomatic" => Some("faction_interaction"),
        "military" => Some("military_conflict"),
        _ => None,
    }
}

/// Select the memories that should inform a decision.
///
/// A memory qualifies when it is still active (effective impact at or
/// above the relevance floor) and either the decision's subject faction
/// took part in it or its event type matches the decision category per
/// [`relevant_event_type`].
pub fn relevant_memories<'a>(
    personality: &'a FactionPersonality,
    decision: &FactionDecision,
    now: DateTime<Utc>,
) -> Vec<&'a FactionMemory> {
    let mapped_type = relevant_event_type(&decision.decision_type);
    personality
        .memories
        .iter()
        .filter(|memory| memory.is_active(now))
        .filter(|memory| {
            let by_participant = decision
                .subject
                .is_some_and(|subject| memory.involves(subject));
            let by_type = mapped_type.is_some_and(|t| memory.event_type == t);
            by_participant || by_type
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;

    use loreforge_types::{FactionMood, LearningData};

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_750_000_000, 0).unwrap_or_default()
    }

    fn personality(traits: &[(&str, f64)]) -> FactionPersonality {
        FactionPersonality {
            faction: FactionId::new(),
            traits: traits
                .iter()
                .map(|(name, value)| ((*name).to_owned(), *value))
                .collect(),
            values: BTreeMap::new(),
            decision_weights: BTreeMap::new(),
            mood: FactionMood::Cautious,
            decision_style: String::from("measured"),
            memories: Vec::new(),
            learning: LearningData::default(),
            last_learning: None,
        }
    }

    fn option(name: &str, benefits: usize, risks: usize) -> DecisionOption {
        DecisionOption {
            name: String::from(name),
            description: String::new(),
            benefits: (0..benefits).map(|i| format!("benefit {i}")).collect(),
            risks: (0..risks).map(|i| format!("risk {i}")).collect(),
            requirements: BTreeMap::new(),
        }
    }

    #[test]
    fn benefits_drive_the_base_score() {
        let p = personality(&[]);
        let opt = option("expand", 4, 0);
        assert!((score_option(&p, &opt) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn pragmatic_factions_penalize_risks() {
        let p = personality(&[("pragmatic", 0.8)]);
        let opt = option("gamble", 2, 3);
        // 1.0 base - 0.9 risk penalty
        assert!((score_option(&p, &opt) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn aggressive_factions_relish_risks() {
        let p = personality(&[("aggressive", 0.9)]);
        let opt = option("raid", 2, 3);
        // 1.0 base + 0.3 risk bonus
        assert!((score_option(&p, &opt) - 1.3).abs() < 1e-12);
    }

    #[test]
    fn trait_gate_is_strict() {
        let p = personality(&[("pragmatic", 0.6), ("aggressive", 0.6)]);
        let opt = option("wait", 1, 5);
        // Exactly at the gate neither modifier applies.
        assert!((score_option(&p, &opt) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn requirements_cost_a_tenth_each() {
        let p = personality(&[]);
        let mut opt = option("hire", 3, 0);
        opt.requirements.insert(String::from("gold"), 5.0);
        opt.requirements.insert(String::from("favors"), 2.0);
        // 1.5 base - 0.7 requirements
        assert!((score_option(&p, &opt) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn best_option_picks_highest_score() {
        let p = personality(&[("pragmatic", 0.9)]);
        let decision = FactionDecision {
            decision_type: String::from("economic"),
            description: String::from("What to do with the surplus"),
            subject: None,
            options: vec![option("hoard", 1, 0), option("invest", 3, 1), option("burn", 0, 4)],
        };
        let best = best_option(&p, &decision);
        assert_eq!(best.map(|o| o.name.as_str()), Some("invest"));
    }

    #[test]
    fn relevance_table_maps_exactly_two_categories() {
        assert_eq!(relevant_event_type("diplomatic"), Some("faction_interaction"));
        assert_eq!(relevant_event_type("military"), Some("military_conflict"));
        assert_eq!(relevant_event_type("economic"), None);
        assert_eq!(relevant_event_type("arcane"), None);
    }

    #[test]
    fn memories_match_by_subject_or_type() {
        let subject = FactionId::new();
        let mut p = personality(&[]);
        p.memories.push(FactionMemory::new(
            "military_conflict",
            "skirmish at the bridge",
            0.8,
            0.95,
            Vec::new(),
            now(),
        ));
        p.memories.push(FactionMemory::new(
            "trade_agreement",
            "grain deal with the subject",
            0.6,
            0.95,
            vec![subject],
            now(),
        ));
        p.memories.push(FactionMemory::new(
            "trade_agreement",
            "unrelated deal",
            0.6,
            0.95,
            Vec::new(),
            now(),
        ));

        let decision = FactionDecision {
            decision_type: String::from("military"),
            description: String::new(),
            subject: Some(subject),
            options: Vec::new(),
        };
        let selected = relevant_memories(&p, &decision, now());
        let descriptions: Vec<&str> =
            selected.iter().map(|m| m.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec!["skirmish at the bridge", "grain deal with the subject"]
        );
    }

    #[test]
    fn spent_memories_are_ignored() {
        let mut p = personality(&[]);
        p.memories.push(FactionMemory::new(
            "military_conflict",
            "ancient defeat",
            0.3,
            0.9,
            Vec::new(),
            now() - TimeDelta::days(120),
        ));

        let decision = FactionDecision {
            decision_type: String::from("military"),
            description: String::new(),
            subject: None,
            options: Vec::new(),
        };
        assert!(relevant_memories(&p, &decision, now()).is_empty());
    }
}
