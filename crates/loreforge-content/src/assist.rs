//! DM-assistant generators: dialogue, locations, combat narration,
//! plot twists, hazards, and portrait prompts.
//!
//! These produce table-ready material on demand and persist nothing;
//! the referee decides what enters the record. All of them run the same
//! prompt/call/parse pipeline as the persisted generators.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;

use loreforge_llm::{LlmClient, decode_response};
use loreforge_types::{EnvironmentalHazard, GeneratedLocation, PlotTwist};

use crate::error::GenerateError;
use crate::prompt::{
    COMBAT_SYSTEM, DIALOGUE_SYSTEM, HAZARD_SYSTEM, LOCATION_SYSTEM, PLOT_SYSTEM,
    PORTRAIT_SYSTEM, PromptLibrary,
};

/// How an attack resolved, selecting the narration template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombatOutcome {
    /// The attack failed to connect.
    Miss,
    /// The attack dealt damage.
    Hit,
    /// The attack dropped the defender.
    Kill,
}

/// A request for in-character NPC dialogue.
#[derive(Debug, Clone)]
pub struct DialogueRequest {
    /// Who is speaking.
    pub npc_name: String,
    /// The NPC's personality sketch.
    pub personality: String,
    /// The scene the conversation happens in.
    pub situation: String,
    /// What the player just said.
    pub player_input: String,
}

/// A request for a location description.
#[derive(Debug, Clone)]
pub struct LocationRequest {
    /// Kind of place ("smugglers' cove", "ruined watchtower").
    pub location_type: String,
    /// Story context the location should fit.
    pub context: String,
}

/// A request for combat narration.
#[derive(Debug, Clone)]
pub struct CombatNarrationRequest {
    /// The acting combatant.
    pub attacker: String,
    /// The target.
    pub defender: String,
    /// The attack or maneuver used.
    pub action: String,
    /// How the attack resolved.
    pub outcome: CombatOutcome,
    /// Damage dealt (zero on a miss).
    pub damage: u32,
    /// Whether the hit was a critical.
    pub critical: bool,
    /// The defender's remaining hit points after the attack.
    pub defender_hp: i64,
    /// The defender's hit point maximum.
    pub defender_max_hp: u32,
}

/// A request for a plot twist.
#[derive(Debug, Clone)]
pub struct PlotTwistRequest {
    /// The campaign so far.
    pub current_plot: String,
    /// What the players have been doing.
    pub player_actions: String,
}

/// A request for an environmental hazard.
#[derive(Debug, Clone)]
pub struct HazardRequest {
    /// Environment the hazard lives in.
    pub environment: String,
    /// Average party level the hazard should threaten.
    pub party_level: u32,
    /// Intended difficulty label.
    pub difficulty: String,
}

/// A request for an NPC portrait prompt.
#[derive(Debug, Clone)]
pub struct PortraitRequest {
    /// Character name.
    pub npc_name: String,
    /// Ancestry or race.
    pub ancestry: String,
    /// Occupation or class.
    pub occupation: String,
    /// Appearance notes.
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct RawDialogue {
    #[serde(default)]
    dialogue: String,
}

/// Produces table-ready assists for the referee.
pub struct DmAssistant {
    llm: Arc<LlmClient>,
    prompts: Arc<PromptLibrary>,
}

impl DmAssistant {
    /// Create an assistant over the given collaborators.
    pub fn new(llm: Arc<LlmClient>, prompts: Arc<PromptLibrary>) -> Self {
        Self { llm, prompts }
    }

    /// In-character dialogue for an NPC.
    pub async fn npc_dialogue(
        &self,
        ctx: &CancellationToken,
        request: &DialogueRequest,
    ) -> Result<String, GenerateError> {
        const KIND: &str = "dialogue";
        let user = self.prompts.render(
            "dialogue",
            json!({
                "npc_name": request.npc_name,
                "personality": request.personality,
                "situation": request.situation,
                "player_input": request.player_input,
            }),
        )?;
        let text = self
            .llm
            .generate_completion(ctx, &user, DIALOGUE_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;
        let raw: RawDialogue =
            decode_response(&text).map_err(|_| GenerateError::Parse { kind: KIND })?;
        if raw.dialogue.trim().is_empty() {
            return Err(GenerateError::Parse { kind: KIND });
        }
        Ok(raw.dialogue)
    }

    /// A location description.
    ///
    /// When the response is not the expected JSON, the raw text is
    /// wrapped as a bare description instead of failing -- prose about a
    /// place is still useful at the table.
    pub async fn describe_location(
        &self,
        ctx: &CancellationToken,
        request: &LocationRequest,
    ) -> Result<GeneratedLocation, GenerateError> {
        const KIND: &str = "location";
        let user = self.prompts.render(
            "location",
            json!({
                "location_type": request.location_type,
                "context": request.context,
            }),
        )?;
        let text = self
            .llm
            .generate_completion(ctx, &user, LOCATION_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;

        match decode_response::<GeneratedLocation>(&text) {
            Ok(location) => Ok(location),
            Err(_) => Ok(GeneratedLocation {
                name: request.location_type.clone(),
                description: text.trim().to_owned(),
                notable_features: Vec::new(),
                hooks: Vec::new(),
            }),
        }
    }

    /// Narration for one combat beat.
    pub async fn narrate_combat(
        &self,
        ctx: &CancellationToken,
        request: &CombatNarrationRequest,
    ) -> Result<String, GenerateError> {
        const KIND: &str = "combat narration";
        let template = match request.outcome {
            CombatOutcome::Miss => "combat_miss",
            CombatOutcome::Hit => "combat_hit",
            CombatOutcome::Kill => "combat_kill",
        };
        let intensity = narration_intensity(
            request.critical,
            request.defender_hp,
            request.defender_max_hp,
        );
        let user = self.prompts.render(
            template,
            json!({
                "attacker": request.attacker,
                "defender": request.defender,
                "action": request.action,
                "damage": request.damage,
                "intensity": intensity,
            }),
        )?;
        let text = self
            .llm
            .generate_completion(ctx, &user, COMBAT_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;
        Ok(text.trim().to_owned())
    }

    /// A plot twist for the ongoing campaign.
    pub async fn plot_twist(
        &self,
        ctx: &CancellationToken,
        request: &PlotTwistRequest,
    ) -> Result<PlotTwist, GenerateError> {
        const KIND: &str = "plot twist";
        let user = self.prompts.render(
            "plot",
            json!({
                "current_plot": request.current_plot,
                "player_actions": request.player_actions,
            }),
        )?;
        let text = self
            .llm
            .generate_completion(ctx, &user, PLOT_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;
        let mut twist: PlotTwist =
            decode_response(&text).map_err(|_| GenerateError::Parse { kind: KIND })?;
        if twist.title.trim().is_empty() {
            twist.title = String::from("An unexpected turn");
        }
        Ok(twist)
    }

    /// An environmental hazard for a location.
    pub async fn environmental_hazard(
        &self,
        ctx: &CancellationToken,
        request: &HazardRequest,
    ) -> Result<EnvironmentalHazard, GenerateError> {
        const KIND: &str = "hazard";
        let user = self.prompts.render(
            "hazard",
            json!({
                "environment": request.environment,
                "party_level": request.party_level,
                "difficulty": request.difficulty,
            }),
        )?;
        let text = self
            .llm
            .generate_completion(ctx, &user, HAZARD_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;
        let mut hazard: EnvironmentalHazard =
            decode_response(&text).map_err(|_| GenerateError::Parse { kind: KIND })?;
        if hazard.difficulty_class == 0 {
            // A zero DC means the model forgot the field.
            hazard.difficulty_class = 10;
        }
        Ok(hazard)
    }

    /// An image-generator prompt for an NPC portrait.
    pub async fn portrait_prompt(
        &self,
        ctx: &CancellationToken,
        request: &PortraitRequest,
    ) -> Result<String, GenerateError> {
        const KIND: &str = "portrait";
        let user = self.prompts.render(
            "portrait",
            json!({
                "npc_name": request.npc_name,
                "ancestry": request.ancestry,
                "occupation": request.occupation,
                "description": request.description,
            }),
        )?;
        let text = self
            .llm
            .generate_completion(ctx, &user, PORTRAIT_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(GenerateError::Parse { kind: KIND });
        }
        Ok(trimmed.to_owned())
    }
}

/// Narration intensity from the state of the defender.
///
/// A critical hit is always "epic"; a defender at or below a quarter of
/// their maximum reads "desperate"; everything else is "normal".
pub fn narration_intensity(critical: bool, defender_hp: i64, defender_max_hp: u32) -> &'static str {
    if critical {
        "epic"
    } else if defender_hp <= i64::from(defender_max_hp) / 4 {
        "desperate"
    } else {
        "normal"
    }
}
