//! Faction generator with a procedural fallback.
//!
//! The LLM supplies name, description, and goals; power levels and
//! membership are always derived procedurally from the faction kind.
//! When the LLM or the parse fails, a fully procedural faction is built
//! from the request fields instead -- the caller cannot tell the two
//! paths apart, and the failure is only logged.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::Rng;
use serde::Deserialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use loreforge_db::FactionRepo;
use loreforge_llm::{LlmClient, LlmError, decode_response};
use loreforge_types::{Faction, FactionId, FactionKind, SessionId};

use crate::error::GenerateError;
use crate::prompt::{FACTION_SYSTEM, PromptLibrary};

/// Lower bound on derived membership.
const MIN_MEMBERS: u32 = 10;

/// A request to generate a faction.
#[derive(Debug, Clone)]
pub struct FactionRequest {
    /// Session the faction belongs to.
    pub session: SessionId,
    /// Preferred name, when the referee has one.
    pub name: Option<String>,
    /// Faction kind (drives power tables and fallback flavor).
    pub kind: FactionKind,
    /// Campaign theme the faction should fit.
    pub theme: String,
}

/// The faction shape as the LLM returns it.
#[derive(Debug, Deserialize)]
struct RawFaction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    public_goals: Vec<String>,
    #[serde(default)]
    secret_goals: Vec<String>,
}

/// Generates and persists factions.
pub struct FactionGenerator {
    llm: Arc<LlmClient>,
    factions: Arc<dyn FactionRepo>,
    prompts: Arc<PromptLibrary>,
}

impl FactionGenerator {
    /// Create a generator over the given collaborators.
    pub fn new(
        llm: Arc<LlmClient>,
        factions: Arc<dyn FactionRepo>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            llm,
            factions,
            prompts,
        }
    }

    /// Generate and persist a faction.
    ///
    /// Never fails on LLM trouble; only cancellation and persistence
    /// failures surface.
    pub async fn generate(
        &self,
        ctx: &CancellationToken,
        request: &FactionRequest,
        rng: &mut (impl Rng + Send),
    ) -> Result<Faction, GenerateError> {
        let flavor = match self.ask_flavor(ctx, request).await {
            Ok(raw) => raw,
            Err(LlmError::Cancelled) => return Err(GenerateError::Cancelled),
            Err(e) => {
                warn!(error = %e, kind = ?request.kind, "faction flavor generation failed, building procedurally");
                procedural_flavor(request, rng)
            }
        };

        let faction = assemble(request, flavor, rng);
        self.factions.create(&faction).await?;
        info!(faction = faction.name, kind = ?faction.kind, "generated faction");
        Ok(faction)
    }

    /// Ask the LLM for name, description, and goals.
    async fn ask_flavor(
        &self,
        ctx: &CancellationToken,
        request: &FactionRequest,
    ) -> Result<RawFaction, LlmError> {
        let user = self
            .prompts
            .render(
                "faction",
                json!({
                    "kind": format!("{:?}", request.kind).to_lowercase(),
                    "name": request.name.clone().unwrap_or_default(),
                    "theme": request.theme,
                }),
            )
            .map_err(|e| LlmError::Transport {
                provider: "prompt",
                message: e.to_string(),
            })?;
        let text = self
            .llm
            .generate_completion(ctx, &user, FACTION_SYSTEM)
            .await?;
        decode_response(&text).map_err(|e| LlmError::Transport {
            provider: "parse",
            message: e.to_string(),
        })
    }
}

/// Build flavor without the LLM, from the request and the kind's stock
/// material.
fn procedural_flavor(request: &FactionRequest, rng: &mut impl Rng) -> RawFaction {
    const PREFIXES: &[&str] = &[
        "Crimson", "Gilded", "Silent", "Iron", "Veiled", "Ashen", "Sable", "Hollow",
    ];
    let prefix = PREFIXES
        .get(rng.random_range(0..PREFIXES.len()))
        .copied()
        .unwrap_or("Gilded");
    let (noun, public_goal, secret_goal) = stock_flavor(request.kind);

    let name = request
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| format!("The {prefix} {noun}"));

    RawFaction {
        name,
        description: format!("A {noun_lower} whose reach grows by the season.", noun_lower = noun.to_lowercase()),
        public_goals: vec![public_goal.to_owned()],
        secret_goals: vec![secret_goal.to_owned()],
    }
}

/// Stock noun and goals per faction kind.
const fn stock_flavor(kind: FactionKind) -> (&'static str, &'static str, &'static str) {
    match kind {
        FactionKind::Religious => (
            "Covenant",
            "spread the faith to every hearth",
            "unseat the high temple's current hierarch",
        ),
        FactionKind::Military => (
            "Legion",
            "keep the borders unbroken",
            "install a soldier on the throne",
        ),
        FactionKind::Criminal => (
            "Syndicate",
            "keep the streets quiet and profitable",
            "own every judge in the city",
        ),
        FactionKind::Mercantile => (
            "Consortium",
            "open new trade routes",
            "corner the grain market before the famine",
        ),
        FactionKind::Political => (
            "Assembly",
            "speak for the common districts",
            "rewrite the charter of succession",
        ),
        FactionKind::Arcane => (
            "Circle",
            "advance the understanding of the Art",
            "recover the sealed grimoires",
        ),
        FactionKind::Scholarly => (
            "Athenaeum",
            "preserve knowledge against the dark",
            "decode the pre-Imperial star charts",
        ),
        FactionKind::Cult => (
            "Communion",
            "offer comfort to the forgotten",
            "wake the sleeper beneath the lake",
        ),
    }
}

/// Base power levels per kind: `(influence, military, economic, magical)`.
const fn base_powers(kind: FactionKind) -> (u8, u8, u8, u8) {
    match kind {
        FactionKind::Religious => (6, 4, 5, 5),
        FactionKind::Military => (5, 8, 4, 2),
        FactionKind::Criminal => (5, 4, 6, 2),
        FactionKind::Mercantile => (6, 2, 8, 2),
        FactionKind::Political => (8, 3, 6, 2),
        FactionKind::Arcane => (4, 3, 4, 8),
        FactionKind::Scholarly => (4, 2, 4, 6),
        FactionKind::Cult => (3, 3, 2, 7),
    }
}

/// Base membership per kind, before scaling by influence.
const fn base_members(kind: FactionKind) -> u32 {
    match kind {
        FactionKind::Religious => 250,
        FactionKind::Military => 300,
        FactionKind::Criminal => 120,
        FactionKind::Mercantile => 150,
        FactionKind::Political => 80,
        FactionKind::Arcane => 40,
        FactionKind::Scholarly => 60,
        FactionKind::Cult => 50,
    }
}

/// Jitter a base power by -1, 0, or +1, clamped to `1..=10`.
fn jitter_power(base: u8, rng: &mut impl Rng) -> u8 {
    let delta: i16 = rng.random_range(-1..=1);
    (i16::from(base) + delta).clamp(1, 10) as u8
}

/// Assemble the full faction from flavor plus derived numbers.
fn assemble(request: &FactionRequest, flavor: RawFaction, rng: &mut impl Rng) -> Faction {
    let (influence_base, military_base, economic_base, magical_base) = base_powers(request.kind);
    let influence = jitter_power(influence_base, rng);
    let military_strength = jitter_power(military_base, rng);
    let economic_power = jitter_power(economic_base, rng);
    let magical_power = jitter_power(magical_base, rng);

    let scale: f64 = rng.random_range(0.8..1.2);
    let member_count = (f64::from(base_members(request.kind)) * (f64::from(influence) / 5.0)
        * scale)
        .floor()
        .max(f64::from(MIN_MEMBERS)) as u32;

    Faction {
        id: FactionId::new(),
        session: request.session,
        name: flavor.name,
        kind: request.kind,
        description: flavor.description,
        public_goals: flavor.public_goals,
        secret_goals: flavor.secret_goals,
        traits: BTreeMap::new(),
        values: BTreeMap::new(),
        influence,
        military_strength,
        economic_power,
        magical_power,
        member_count,
        relationships: BTreeMap::new(),
    }
}
