//! Prompt assembly for the content generators, via `minijinja`.
//!
//! System prompts fix the domain voice and the exact JSON shape each
//! generator expects back; user templates interpolate the request
//! fields. Templates are embedded in the binary -- generation behavior
//! is code, not operator configuration.

use minijinja::Environment;
use serde::Serialize;

use crate::error::GenerateError;

// ---------------------------------------------------------------------------
// System prompts (domain voice + required JSON shape)
// ---------------------------------------------------------------------------

/// System prompt for the class generator.
pub const CLASS_SYSTEM: &str = "\
You are a veteran game designer creating balanced character classes for a \
d20 fantasy tabletop game. Respond with JSON only, in exactly this shape:\n\
{\"name\": \"...\", \"description\": \"...\", \"hitDie\": 8, \
\"primaryAbility\": \"Dexterity\", \"savingThrowProficiencies\": [\"...\", \"...\"], \
\"spellcastingAbility\": null, \
\"classFeatures\": [{\"level\": 1, \"name\": \"...\", \"description\": \"...\"}]}\n\
Hit die must be 6, 8, 10 or 12. Exactly two saving throw proficiencies. \
At least one feature at level 1.";

/// System prompt for the encounter generator.
pub const ENCOUNTER_SYSTEM: &str = "\
You are a dungeon master designing combat encounters for a d20 fantasy \
tabletop game. Respond with JSON only, in exactly this shape:\n\
{\"title\": \"...\", \"description\": \"...\", \
\"enemies\": [{\"name\": \"...\", \"challengeRating\": \"1/2\", \"quantity\": 3}]}\n\
Keep the roster's total XP near the given budget.";

/// System prompt for NPC dialogue.
pub const DIALOGUE_SYSTEM: &str = "\
You voice non-player characters at a fantasy tabletop. Stay in character. \
Respond with JSON only: {\"dialogue\": \"...\"}";

/// System prompt for location descriptions.
pub const LOCATION_SYSTEM: &str = "\
You describe locations for a fantasy tabletop game in evocative, read-aloud \
prose. Respond with JSON only:\n\
{\"name\": \"...\", \"description\": \"...\", \
\"notable_features\": [\"...\"], \"hooks\": [\"...\"]}";

/// System prompt for combat narration.
pub const COMBAT_SYSTEM: &str = "\
You narrate combat beats at a fantasy tabletop in one or two vivid \
sentences. Match the requested intensity. Respond with the narration text \
only, no JSON.";

/// System prompt for plot twists.
pub const PLOT_SYSTEM: &str = "\
You devise plot twists for an ongoing fantasy campaign. Respond with JSON \
only:\n{\"title\": \"...\", \"description\": \"...\", \
\"foreshadowing\": [\"...\"], \"impact\": \"...\"}";

/// System prompt for environmental hazards.
pub const HAZARD_SYSTEM: &str = "\
You design environmental hazards for a d20 fantasy tabletop game. Respond \
with JSON only:\n{\"name\": \"...\", \"description\": \"...\", \
\"trigger\": \"...\", \"effect\": \"...\", \"difficulty_class\": 13, \
\"damage\": \"2d6 piercing\"}";

/// System prompt for NPC portrait prompts.
pub const PORTRAIT_SYSTEM: &str = "\
You write prompts for an image generator producing fantasy character \
portraits. Respond with the portrait prompt text only, no JSON.";

/// System prompt for the faction generator.
pub const FACTION_SYSTEM: &str = "\
You invent factions for a fantasy campaign world. Respond with JSON only:\n\
{\"name\": \"...\", \"description\": \"...\", \
\"public_goals\": [\"...\"], \"secret_goals\": [\"...\"]}";

// ---------------------------------------------------------------------------
// User templates
// ---------------------------------------------------------------------------

const CLASS_USER: &str = "\
Design a character class.\n\
Name: {{ name }}\n\
Concept: {{ description }}\n\
Party role: {{ role }}\n\
Power style: {{ style }}\n\
Signature features: {{ features }}";

const ENCOUNTER_USER: &str = "\
Design a combat encounter.\n\
Party: {{ party_size }} characters of level {{ party_level }}\
{% if composition %} ({{ composition | join(\", \") }}){% endif %}\n\
Difficulty: {{ difficulty }} (XP budget {{ xp_budget }})\n\
Encounter type: {{ encounter_type }}\n\
Location: {{ location }}\n\
Narrative context: {{ narrative_context }}\n\
{% if special_requests %}Special requests: {{ special_requests }}{% endif %}";

const DIALOGUE_USER: &str = "\
NPC: {{ npc_name }}\n\
Personality: {{ personality }}\n\
Situation: {{ situation }}\n\
The player says: \"{{ player_input }}\"\n\
What does {{ npc_name }} reply?";

const LOCATION_USER: &str = "\
Describe a location.\n\
Type: {{ location_type }}\n\
Context: {{ context }}";

const COMBAT_MISS_USER: &str = "\
Narrate a miss, {{ intensity }} intensity: {{ attacker }} attacks \
{{ defender }} with {{ action }} and fails to connect.";

const COMBAT_HIT_USER: &str = "\
Narrate a hit, {{ intensity }} intensity: {{ attacker }} strikes \
{{ defender }} with {{ action }} for {{ damage }} damage.";

const COMBAT_KILL_USER: &str = "\
Narrate a killing blow, {{ intensity }} intensity: {{ attacker }} fells \
{{ defender }} with {{ action }} ({{ damage }} damage).";

const PLOT_USER: &str = "\
The campaign so far: {{ current_plot }}\n\
What the players have done: {{ player_actions }}\n\
Devise a twist that recontextualizes events without invalidating player \
choices.";

const HAZARD_USER: &str = "\
Design an environmental hazard.\n\
Environment: {{ environment }}\n\
Party level: {{ party_level }}\n\
Intended difficulty: {{ difficulty }}";

const PORTRAIT_USER: &str = "\
Write a portrait prompt for this character:\n\
Name: {{ npc_name }}\n\
Ancestry: {{ ancestry }}\n\
Occupation: {{ occupation }}\n\
Appearance notes: {{ description }}";

const FACTION_USER: &str = "\
Invent a faction.\n\
Kind: {{ kind }}\n\
{% if name %}It is called: {{ name }}\n{% endif %}\
Campaign theme: {{ theme }}";

/// All user templates, keyed by name.
const USER_TEMPLATES: &[(&str, &str)] = &[
    ("class", CLASS_USER),
    ("encounter", ENCOUNTER_USER),
    ("dialogue", DIALOGUE_USER),
    ("location", LOCATION_USER),
    ("combat_miss", COMBAT_MISS_USER),
    ("combat_hit", COMBAT_HIT_USER),
    ("combat_kill", COMBAT_KILL_USER),
    ("plot", PLOT_USER),
    ("hazard", HAZARD_USER),
    ("portrait", PORTRAIT_USER),
    ("faction", FACTION_USER),
];

/// Pre-loaded prompt templates for every generator kind.
pub struct PromptLibrary {
    env: Environment<'static>,
}

impl PromptLibrary {
    /// Load all embedded templates.
    ///
    /// # Errors
    ///
    /// Returns [`GenerateError::Template`] if an embedded template fails
    /// to compile (a programming error caught at startup).
    pub fn new() -> Result<Self, GenerateError> {
        let mut env = Environment::new();
        for (name, source) in USER_TEMPLATES {
            env.add_template(name, source)
                .map_err(|e| GenerateError::Template(format!("failed to load {name}: {e}")))?;
        }
        Ok(Self { env })
    }

    /// Render a user template against a serializable context.
    pub fn render(
        &self,
        name: &str,
        context: impl Serialize,
    ) -> Result<String, GenerateError> {
        self.env
            .get_template(name)
            .map_err(|e| GenerateError::Template(format!("missing template {name}: {e}")))?
            .render(context)
            .map_err(|e| GenerateError::Template(format!("{name} render failed: {e}")))
    }
}
