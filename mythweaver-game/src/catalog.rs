//! Static catalog: cards, intents, decrees, consumables, combos, era schedule,
//! government profiles and narrative events.
//!
//! The catalog is loaded once and never mutated. Every lookup returns `Option` so a
//! miss is a skipped entry, not a crash of the turn loop.
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

use crate::crisis::BossModifier;
use crate::government::{Government, StatsDelta};

pub const DEFAULT_CATALOG_DATA: &str = include_str!("../assets/data/catalog.json");

/// Card rarity, informational for shops and narration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Rarity {
    #[default]
    Common,
    Uncommon,
    Rare,
    Legendary,
}

/// Fixed enhancement of a card instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Enhancement {
    #[default]
    None,
    Foil,
    Holographic,
}

impl Enhancement {
    /// Multiplier applied to narrative potential.
    #[must_use]
    pub const fn potential_multiplier(self) -> f64 {
        match self {
            Self::None => 1.0,
            Self::Foil => 1.5,
            Self::Holographic => 2.0,
        }
    }

    /// Flat PL bonus granted by the enhancement.
    #[must_use]
    pub const fn pl_bonus(self) -> f64 {
        match self {
            Self::Holographic => 0.5,
            Self::None | Self::Foil => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub physical_value: i32,
    #[serde(default)]
    pub narrative_potential: i32,
    #[serde(default)]
    pub rarity: Rarity,
    #[serde(default)]
    pub enhancement: Enhancement,
    /// Shop price in influence; `None` when the card is not sold.
    #[serde(default)]
    pub cost: Option<u32>,
    /// Discovery-only cards are granted at most once per run.
    #[serde(default)]
    pub discovery: bool,
}

impl Card {
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub id: String,
    pub name: String,
    pub base_nf: f64,
    pub base_pl: f64,
    pub min_cards: usize,
    /// Informational only.
    #[serde(default)]
    pub risk: f64,
}

/// Condition attached to a conditional decree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionTag {
    /// Any selected card carries the `history` tag.
    HistoryTag,
    TwoPlusCards,
    Theocracy,
    HasScapegoats,
    /// Scales with the number of myths created this run.
    PerMyth,
    /// Scales with the summed physical value of the selection.
    PhysicalConvert,
    EraAtLeast(u8),
}

/// Accumulator a conditional decree feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAxis {
    Nf,
    Pl,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DecreeEffect {
    AddNf {
        value: f64,
    },
    AddPl {
        value: f64,
    },
    MultPl {
        value: f64,
    },
    Conditional {
        condition: ConditionTag,
        axis: TargetAxis,
        value: f64,
    },
}

/// Application phase of a decree; decrees apply phase by phase in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DecreePhase {
    AddNf,
    AddPl,
    Conditional,
    MultPl,
}

impl DecreePhase {
    pub const ORDER: [Self; 4] = [Self::AddNf, Self::AddPl, Self::Conditional, Self::MultPl];
}

impl DecreeEffect {
    #[must_use]
    pub const fn phase(&self) -> DecreePhase {
        match self {
            Self::AddNf { .. } => DecreePhase::AddNf,
            Self::AddPl { .. } => DecreePhase::AddPl,
            Self::Conditional { .. } => DecreePhase::Conditional,
            Self::MultPl { .. } => DecreePhase::MultPl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decree {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub effect: DecreeEffect,
    pub cost: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsumableEffect {
    ExtraWeave { amount: u8 },
    ExtraDiscard { amount: u8 },
    RestoreLife { amount: u8 },
    Scapegoat { amount: u32 },
    MythDensity { amount: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumable {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub effect: ConsumableEffect,
    pub cost: u32,
}

/// Recipe of required card identities producing a myth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComboFormula {
    pub id: String,
    pub name: String,
    pub cards: Vec<String>,
    pub myth: String,
    pub bonus_nf: f64,
    pub bonus_pl: f64,
}

/// Difficulty tier of one era.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EraSchedule {
    pub era: u8,
    pub base_target: i64,
    pub boss_modifier: BossModifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernmentProfile {
    pub name: String,
    /// Per-era stat drift, multiplied by the era number at each transition.
    #[serde(default)]
    pub entropy: StatsDelta,
}

/// Effects applied when a narrative choice is taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct EventEffects {
    #[serde(default)]
    pub stats: StatsDelta,
    #[serde(default)]
    pub affinity: BTreeMap<Government, i32>,
    #[serde(default)]
    pub discover: Option<String>,
    #[serde(default)]
    pub scapegoats: u32,
    #[serde(default)]
    pub influence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventChoice {
    pub label: String,
    #[serde(default)]
    pub effects: EventEffects,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeEvent {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub text: String,
    /// Era the event may surface in; `None` means any era.
    #[serde(default)]
    pub era: Option<u8>,
    pub choices: Vec<EventChoice>,
}

impl NarrativeEvent {
    #[must_use]
    pub fn fits_era(&self, era: u8) -> bool {
        self.era.is_none_or(|e| e == era)
    }
}

/// Errors raised when catalog data is malformed or internally inconsistent.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate {kind} id `{id}`")]
    DuplicateId { kind: &'static str, id: String },
    #[error("{context} references unknown card `{card_id}`")]
    UnknownCard { context: String, card_id: String },
    #[error("era schedule does not cover era {missing} (final era {final_era})")]
    MissingEra { missing: u8, final_era: u8 },
    #[error("narrative event `{0}` has no choices")]
    EmptyEvent(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Catalog {
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub intents: Vec<Intent>,
    #[serde(default)]
    pub decrees: Vec<Decree>,
    #[serde(default)]
    pub consumables: Vec<Consumable>,
    /// Declaration order is match priority.
    #[serde(default)]
    pub combos: Vec<ComboFormula>,
    #[serde(default)]
    pub starter_deck: Vec<String>,
    #[serde(default)]
    pub eras: Vec<EraSchedule>,
    #[serde(default)]
    pub governments: BTreeMap<Government, GovernmentProfile>,
    #[serde(default)]
    pub events: Vec<NarrativeEvent>,
}

impl Catalog {
    /// Create an empty catalog (useful for tests)
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse and validate catalog JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON cannot be parsed or the data is inconsistent.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// The catalog bundled with the crate.
    #[must_use]
    pub fn load_from_static() -> Self {
        match Self::from_json(DEFAULT_CATALOG_DATA) {
            Ok(catalog) => catalog,
            Err(err) => {
                log::error!("bundled catalog rejected: {err}");
                Self::empty()
            }
        }
    }

    /// Check identities and cross references.
    ///
    /// # Errors
    ///
    /// Returns the first logic fault found.
    pub fn validate(&self) -> Result<(), CatalogError> {
        ensure_unique("card", self.cards.iter().map(|c| c.id.as_str()))?;
        ensure_unique("intent", self.intents.iter().map(|i| i.id.as_str()))?;
        ensure_unique("decree", self.decrees.iter().map(|d| d.id.as_str()))?;
        ensure_unique("consumable", self.consumables.iter().map(|c| c.id.as_str()))?;
        ensure_unique("combo", self.combos.iter().map(|c| c.id.as_str()))?;
        ensure_unique("event", self.events.iter().map(|e| e.id.as_str()))?;

        for combo in &self.combos {
            self.ensure_known_cards(&format!("combo `{}`", combo.id), &combo.cards)?;
        }
        self.ensure_known_cards("starter deck", &self.starter_deck)?;
        for event in &self.events {
            if event.choices.is_empty() {
                return Err(CatalogError::EmptyEvent(event.id.clone()));
            }
            for choice in &event.choices {
                if let Some(card_id) = &choice.effects.discover {
                    self.ensure_known_cards(
                        &format!("event `{}`", event.id),
                        std::slice::from_ref(card_id),
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Ensure the era schedule covers `1..=final_era`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MissingEra` naming the first uncovered era.
    pub fn ensure_eras(&self, final_era: u8) -> Result<(), CatalogError> {
        for era in 1..=final_era {
            if self.era(era).is_none() {
                return Err(CatalogError::MissingEra {
                    missing: era,
                    final_era,
                });
            }
        }
        Ok(())
    }

    fn ensure_known_cards(&self, context: &str, ids: &[String]) -> Result<(), CatalogError> {
        for id in ids {
            if self.card(id).is_none() {
                return Err(CatalogError::UnknownCard {
                    context: context.to_string(),
                    card_id: id.clone(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn card(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn intent(&self, id: &str) -> Option<&Intent> {
        self.intents.iter().find(|i| i.id == id)
    }

    #[must_use]
    pub fn decree(&self, id: &str) -> Option<&Decree> {
        self.decrees.iter().find(|d| d.id == id)
    }

    #[must_use]
    pub fn consumable(&self, id: &str) -> Option<&Consumable> {
        self.consumables.iter().find(|c| c.id == id)
    }

    #[must_use]
    pub fn event(&self, id: &str) -> Option<&NarrativeEvent> {
        self.events.iter().find(|e| e.id == id)
    }

    #[must_use]
    pub fn era(&self, era: u8) -> Option<&EraSchedule> {
        self.eras.iter().find(|e| e.era == era)
    }

    #[must_use]
    pub fn government_profile(&self, government: Government) -> Option<&GovernmentProfile> {
        self.governments.get(&government)
    }

    /// Resolve equipped decree ids, skipping unknown ids.
    #[must_use]
    pub fn resolve_decrees(&self, ids: &[String]) -> Vec<Decree> {
        ids.iter()
            .filter_map(|id| {
                let decree = self.decree(id);
                if decree.is_none() {
                    log::warn!("equipped decree `{id}` missing from catalog; skipped");
                }
                decree.cloned()
            })
            .collect()
    }

    /// Starter deck cards, skipping unknown ids.
    #[must_use]
    pub fn starter_cards(&self) -> Vec<Card> {
        self.starter_deck
            .iter()
            .filter_map(|id| self.card(id).cloned())
            .collect()
    }
}

fn ensure_unique<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(CatalogError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(())
}
