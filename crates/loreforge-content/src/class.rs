//! Custom character class generator.
//!
//! Prompt assembly, LLM call, JSON extraction, domain validation with
//! balance scoring, then persistence. Fails closed: a class that breaks
//! an invariant is never stored.

use std::sync::Arc;

use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use loreforge_db::ClassRepo;
use loreforge_llm::{LlmClient, decode_response};
use loreforge_types::{Ability, CharacterClass, ClassFeature, ClassId};

use crate::error::GenerateError;
use crate::prompt::{CLASS_SYSTEM, PromptLibrary};

const KIND: &str = "class";

/// Allowed hit die sizes.
const HIT_DICE: [u32; 4] = [6, 8, 10, 12];

/// A request to generate a character class.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ClassRequest {
    /// Working name for the class.
    pub name: String,
    /// Concept description.
    pub description: String,
    /// Intended party role.
    pub role: String,
    /// Power style (e.g. "balanced", "bursty").
    pub style: String,
    /// Signature features the class should have.
    pub features: String,
}

/// The class shape as the LLM returns it (camelCase keys).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawClass {
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    hit_die: u32,
    #[serde(default)]
    primary_ability: String,
    #[serde(default)]
    saving_throw_proficiencies: Vec<String>,
    #[serde(default)]
    spellcasting_ability: Option<String>,
    #[serde(default)]
    class_features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    #[serde(default)]
    level: u32,
    #[serde(default)]
    name: String,
    #[serde(default)]
    description: String,
}

/// Generates and persists custom character classes.
pub struct ClassGenerator {
    llm: Arc<LlmClient>,
    classes: Arc<dyn ClassRepo>,
    prompts: Arc<PromptLibrary>,
}

impl ClassGenerator {
    /// Create a generator over the given collaborators.
    pub fn new(
        llm: Arc<LlmClient>,
        classes: Arc<dyn ClassRepo>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            llm,
            classes,
            prompts,
        }
    }

    /// Generate, validate, and persist a character class.
    pub async fn generate(
        &self,
        ctx: &CancellationToken,
        request: &ClassRequest,
    ) -> Result<CharacterClass, GenerateError> {
        let user = self.prompts.render("class", request)?;
        let text = self
            .llm
            .generate_completion(ctx, &user, CLASS_SYSTEM)
            .await
            .map_err(|e| GenerateError::upstream(KIND, e))?;

        let raw: RawClass =
            decode_response(&text).map_err(|_| GenerateError::Parse { kind: KIND })?;

        let class = validate_class(request, raw)?;
        self.classes.create(&class).await?;
        info!(class = class.name, balance = class.balance_score, "generated class");
        Ok(class)
    }
}

/// Check the domain invariants and derive the balance score.
fn validate_class(request: &ClassRequest, raw: RawClass) -> Result<CharacterClass, GenerateError> {
    if !HIT_DICE.contains(&raw.hit_die) {
        return Err(GenerateError::validation(
            KIND,
            format!("invalid hit die: {}", raw.hit_die),
        ));
    }
    if raw.saving_throw_proficiencies.len() != 2 {
        return Err(GenerateError::validation(
            KIND,
            "classes must have exactly 2 saving throw proficiencies",
        ));
    }
    if !raw.class_features.iter().any(|f| f.level == 1) {
        return Err(GenerateError::validation(
            KIND,
            "class must have at least one level 1 feature",
        ));
    }
    let Some(primary_ability) = Ability::parse(&raw.primary_ability) else {
        return Err(GenerateError::validation(
            KIND,
            format!("invalid primary ability: {}", raw.primary_ability),
        ));
    };

    let spellcasting_ability = raw
        .spellcasting_ability
        .filter(|ability| !ability.trim().is_empty());
    let balance_score = balance_score(
        raw.hit_die,
        spellcasting_ability.is_some(),
        raw.class_features.len(),
    );

    let name = if raw.name.trim().is_empty() {
        request.name.clone()
    } else {
        raw.name
    };
    let description = if raw.description.trim().is_empty() {
        request.description.clone()
    } else {
        raw.description
    };

    Ok(CharacterClass {
        id: ClassId::new(),
        name,
        description,
        role: request.role.clone(),
        hit_die: raw.hit_die,
        primary_ability,
        saving_throw_proficiencies: raw.saving_throw_proficiencies,
        spellcasting_ability,
        class_features: raw
            .class_features
            .into_iter()
            .map(|f| ClassFeature {
                level: f.level,
                name: f.name,
                description: f.description,
            })
            .collect(),
        balance_score,
    })
}

/// Balance score in `0..=10`: hit-die base, +1 for spellcasting, +1 per
/// two features beyond the first.
fn balance_score(hit_die: u32, has_spellcasting: bool, feature_count: usize) -> u8 {
    let mut score: i64 = match hit_die {
        6 => 3,
        8 => 4,
        10 => 5,
        12 => 6,
        _ => 0,
    };
    if has_spellcasting {
        score += 1;
    }
    score += feature_count.saturating_sub(1) as i64 / 2;
    score.clamp(0, 10) as u8
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use loreforge_db::MemoryBackend;
    use loreforge_llm::MockClient;

    use super::*;

    fn request() -> ClassRequest {
        ClassRequest {
            name: String::from("Shadowdancer"),
            description: String::from("A class that manipulates shadows"),
            role: String::from("stealth damage dealer"),
            style: String::from("balanced"),
            features: String::from("shadow magic and stealth"),
        }
    }

    fn generator_with(llm: LlmClient) -> (ClassGenerator, MemoryBackend) {
        let backend = MemoryBackend::new();
        let prompts = PromptLibrary::new().map(Arc::new).unwrap();
        (
            ClassGenerator::new(Arc::new(llm), Arc::new(backend.clone()), prompts),
            backend,
        )
    }

    const SHADOWDANCER_JSON: &str = r#"Here you go!
{"name": "Shadowdancer", "hitDie": 8, "primaryAbility": "Dexterity",
 "savingThrowProficiencies": ["Dexterity", "Charisma"],
 "classFeatures": [
   {"level": 1, "name": "Shadow Step"},
   {"level": 1, "name": "Darkvision"},
   {"level": 3, "name": "Shadow Clone"}
 ]}"#;

    #[tokio::test]
    async fn happy_path_validates_and_persists() {
        let (generator, backend) =
            generator_with(LlmClient::Mock(MockClient::returning(SHADOWDANCER_JSON)));

        let class = generator
            .generate(&CancellationToken::new(), &request())
            .await;
        assert!(class.is_ok());
        let Some(class) = class.ok() else { return };

        assert_eq!(class.name, "Shadowdancer");
        assert_eq!(class.hit_die, 8);
        assert_eq!(class.primary_ability, Ability::Dexterity);
        assert_eq!(class.class_features.len(), 3);
        // Hit die 8 -> 4, three features -> +1, no spellcasting.
        assert_eq!(class.balance_score, 5);

        let stored = ClassRepo::get(&backend, class.id).await;
        assert_eq!(stored.ok(), Some(class));
    }

    #[tokio::test]
    async fn three_saves_are_rejected_verbatim() {
        let json = r#"{"name": "Juggernaut", "hitDie": 10, "primaryAbility": "Strength",
            "savingThrowProficiencies": ["Strength", "Dexterity", "Constitution"],
            "classFeatures": [{"level": 1, "name": "Unstoppable"}]}"#;
        let (generator, backend) =
            generator_with(LlmClient::Mock(MockClient::returning(json)));

        let result = generator
            .generate(&CancellationToken::new(), &request())
            .await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("class validation failed"));
        assert!(message.contains("classes must have exactly 2 saving throw proficiencies"));
        assert_eq!(backend.class_count().await, 0);
    }

    #[tokio::test]
    async fn bad_hit_die_is_rejected() {
        let json = r#"{"hitDie": 13, "primaryAbility": "Strength",
            "savingThrowProficiencies": ["Strength", "Constitution"],
            "classFeatures": [{"level": 1, "name": "Bulk"}]}"#;
        let (generator, _backend) =
            generator_with(LlmClient::Mock(MockClient::returning(json)));

        let result = generator
            .generate(&CancellationToken::new(), &request())
            .await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("invalid hit die: 13"));
    }

    #[tokio::test]
    async fn missing_level_one_feature_is_rejected() {
        let json = r#"{"hitDie": 8, "primaryAbility": "Wisdom",
            "savingThrowProficiencies": ["Wisdom", "Charisma"],
            "classFeatures": [{"level": 2, "name": "Late Bloomer"}]}"#;
        let (generator, _backend) =
            generator_with(LlmClient::Mock(MockClient::returning(json)));

        let result = generator
            .generate(&CancellationToken::new(), &request())
            .await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("class must have at least one level 1 feature"));
    }

    #[tokio::test]
    async fn unknown_ability_is_rejected() {
        let json = r#"{"hitDie": 8, "primaryAbility": "Luck",
            "savingThrowProficiencies": ["Wisdom", "Charisma"],
            "classFeatures": [{"level": 1, "name": "Fortune"}]}"#;
        let (generator, _backend) =
            generator_with(LlmClient::Mock(MockClient::returning(json)));

        let result = generator
            .generate(&CancellationToken::new(), &request())
            .await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("invalid primary ability"));
    }

    #[tokio::test]
    async fn garbage_response_is_a_parse_failure() {
        let (generator, backend) = generator_with(LlmClient::Mock(MockClient::returning(
            "I cannot design classes today.",
        )));

        let result = generator
            .generate(&CancellationToken::new(), &request())
            .await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "failed to parse class response");
        assert_eq!(backend.class_count().await, 0);
    }

    #[tokio::test]
    async fn gateway_failure_reads_failed_to_generate() {
        let (generator, _backend) =
            generator_with(LlmClient::Mock(MockClient::failing("offline")));

        let result = generator
            .generate(&CancellationToken::new(), &request())
            .await;
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert_eq!(message, "failed to generate class");
    }

    #[test]
    fn balance_score_table() {
        assert_eq!(balance_score(6, false, 1), 3);
        assert_eq!(balance_score(8, false, 1), 4);
        assert_eq!(balance_score(10, false, 1), 5);
        assert_eq!(balance_score(12, false, 1), 6);
        // Spellcasting adds one.
        assert_eq!(balance_score(8, true, 1), 5);
        // Every two features beyond the first add one.
        assert_eq!(balance_score(8, false, 3), 5);
        assert_eq!(balance_score(8, false, 5), 6);
        // Clamped at ten.
        assert_eq!(balance_score(12, true, 20), 10);
    }
}
