//! Combat encounter generator.
//!
//! Prompt assembly with the party's XP budget, LLM call, JSON
//! extraction, then the derivation pass: party-specific tactics, the
//! roster's true XP total, the count- and size-adjusted XP, the average
//! challenge rating, and rescaling budgets.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

use loreforge_db::EncounterRepo;
use loreforge_llm::{LlmClient, decode_response};
use loreforge_types::{
    Difficulty, Encounter, EncounterEnemy, EncounterId, ScalingOptions, SessionId,
};

use crate::error::GenerateError;
use crate::prompt::{ENCOUNTER_SYSTEM, PromptLibrary};
use crate::tables::{
    cr_numeric, cr_to_xp, group_multiplier, party_size_modifier, xp_budget,
};

const KIND: &str = "encounter";

/// A request to generate a combat encounter.
#[derive(Debug, Clone)]
pub struct EncounterRequest {
    /// Session the encounter is for, when known.
    pub session: Option<SessionId>,
    /// Average party level, `1..=20`.
    pub party_level: u32,
    /// Number of characters in the party, at least 1.
    pub party_size: u32,
    /// Class names of the party members.
    pub party_composition: Vec<String>,
    /// Requested difficulty label; unknown labels read as medium.
    pub difficulty: String,
    /// Kind of encounter ("ambush", "siege", "guardian").
    pub encounter_type: String,
    /// Where the fight happens.
    pub location: String,
    /// Story context the encounter should fit.
    pub narrative_context: String,
    /// Free-form requests from the referee.
    pub special_requests: String,
}

/// The encounter shape as the LLM returns it.
#[derive(Debug, Deserialize)]
struct RawEncounter {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    enemies: Vec<RawEnemy>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnemy {
    #[serde(default)]
    name: String,
    /// The model sends this as a string ("1/2") or a bare number.
    #[serde(default)]
    challenge_rating: serde_json::Value,
    #[serde(default = "default_quantity")]
    quantity: u32,
}

const fn default_quantity() -> u32 {
    1
}

/// Generates and persists combat encounters.
pub struct EncounterGenerator {
    llm: Arc<LlmClient>,
    encounters: Arc<dyn EncounterRepo>,
    prompts: Arc<PromptLibrary>,
}

impl EncounterGenerator {
    /// Create a generator over the given collaborators.
    pub fn new(
        llm: Arc<LlmClient>,
        encounters: Arc<dyn EncounterRepo>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            llm,
            encounters,
            prompts,
        }
    }

    /// Generate, derive, and persist an encounter.
    pub async fn generate(
        &self,
        ctx: &CancellationToken,
        request: &EncounterRequest,
    ) -> Result<Encounter, GenerateError> {
        if !(1..=20).contains(&request.party_level) {
            return Err(GenerateError::Input(format!(
                "party level must be between 1 and 20, got {}",
                request.party_level
            )));
        }
        if request.party_size == 0 {
            return Err(GenerateError::Input(String::from(
                "party size must be at least 1",
            )));
        }

        let difficulty = Difficulty::parse_lossy(&request.difficulty);
        let budget = xp_budget(request.party_level, difficulty, request.party_size);

        let user = self.prompts.render(
            "encounter",
            json!({
                "party_level": request.party_level,
                "party_size": request.party_size,
                "composition": request.party_composition,
                "difficulty": format!("{difficulty:?}").to_lowercase(),
                "xp_budget": budget,
                "encounter_type": request.encounter_type,
                "location": request.location,
                "narrative_context": request.narrative_context,
                "special_requests": request.special_requests,
            }),
        )?;
        let text = self
            .llm
            .generate_completion(ctx, &user, ENCOUNTER_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;

        let raw: RawEncounter =
            decode_response(&text).map_err(|_| GenerateError::Parse { kind: KIND })?;

        let encounter = derive_encounter(request, difficulty, budget, raw);
        self.encounters.create(&encounter).await?;
        info!(
            title = encounter.title,
            adjusted_xp = encounter.adjusted_xp,
            "generated encounter"
        );
        Ok(encounter)
    }
}

/// Run the derivation pass over a decoded roster.
fn derive_encounter(
    request: &EncounterRequest,
    difficulty: Difficulty,
    budget: u32,
    raw: RawEncounter,
) -> Encounter {
    let enemies: Vec<EncounterEnemy> = raw
        .enemies
        .into_iter()
        .map(|enemy| EncounterEnemy {
            name: enemy.name,
            cr: normalize_cr(&enemy.challenge_rating),
            quantity: enemy.quantity,
        })
        .collect();

    let total_xp: u32 = enemies
        .iter()
        .map(|e| cr_to_xp(&e.cr).saturating_mul(e.quantity))
        .sum();
    let enemy_count: u32 = enemies.iter().map(|e| e.quantity).sum();
    let adjusted =
        total_xp as f64 * group_multiplier(enemy_count) * party_size_modifier(request.party_size);

    let average_cr = if enemy_count == 0 {
        0.0
    } else {
        enemies
            .iter()
            .map(|e| cr_numeric(&e.cr) * f64::from(e.quantity))
            .sum::<f64>()
            / f64::from(enemy_count)
    };

    let hard = xp_budget(request.party_level, Difficulty::Hard, request.party_size);
    let scaling = ScalingOptions {
        easy: xp_budget(request.party_level, Difficulty::Easy, request.party_size),
        medium: xp_budget(request.party_level, Difficulty::Medium, request.party_size),
        hard,
        deadly: hard.saturating_mul(2),
    };

    Encounter {
        id: EncounterId::new(),
        session: request.session,
        title: if raw.title.is_empty() {
            format!("{} encounter", request.encounter_type)
        } else {
            raw.title
        },
        description: raw.description,
        difficulty,
        enemies,
        xp_budget: budget,
        total_xp,
        adjusted_xp: adjusted.round() as u32,
        average_cr,
        tactics: party_tactics(&request.party_composition),
        scaling,
    }
}

/// Turn the model's challenge-rating value into canonical string form.
fn normalize_cr(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.trim().to_owned(),
        serde_json::Value::Number(n) => {
            if let Some(int) = n.as_u64() {
                int.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if (f - 0.125).abs() < 1e-9 => String::from("1/8"),
                    Some(f) if (f - 0.25).abs() < 1e-9 => String::from("1/4"),
                    Some(f) if (f - 0.5).abs() < 1e-9 => String::from("1/2"),
                    Some(f) => format!("{f}"),
                    None => String::from("0"),
                }
            }
        }
        _ => String::from("0"),
    }
}

/// Tactical notes keyed by what the party brings to the table.
fn party_tactics(composition: &[String]) -> BTreeMap<String, String> {
    let mut tactics = BTreeMap::new();
    let lowered: Vec<String> = composition.iter().map(|c| c.to_lowercase()).collect();
    let has_any =
        |names: &[&str]| lowered.iter().any(|c| names.iter().any(|n| c.contains(n)));

    if has_any(&["cleric", "druid", "bard"]) {
        tactics.insert(
            String::from("vs_healer"),
            String::from("Focus fire the healer before they stabilize the line."),
        );
    }
    if has_any(&["wizard", "sorcerer", "warlock"]) {
        tactics.insert(
            String::from("vs_caster"),
            String::from("Close distance fast and force concentration checks."),
        );
    }
    if has_any(&["fighter", "paladin", "barbarian"]) {
        tactics.insert(
            String::from("vs_tank"),
            String::from("Slip past the front line instead of trading blows with it."),
        );
    }
    tactics
}
