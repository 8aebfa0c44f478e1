//! Weave scoring pipeline.
//!
//! A weave accumulates two values: Narrative Force (NF) and Political Leverage (PL).
//! Steps run in a fixed order and each one sees the totals left by the steps before it;
//! the resulting [`ScoringBreakdown`] lists every step in that order. Combo bonuses are
//! appended afterwards by the caller (see [`crate::combo`]).
//!
//! The final score is `floor(NF * PL)` over the unrounded accumulators. The one-decimal
//! values on the breakdown are for display only.
use serde::{Deserialize, Serialize};

use crate::catalog::{Card, ConditionTag, Decree, DecreeEffect, DecreePhase, Intent, TargetAxis};
use crate::crisis::BossModifier;
use crate::government::Government;
use crate::numbers::{floor_f64_to_i64, round_to_tenth, usize_to_f64};

/// Tag groups that reward thematically coherent weaves.
pub const AFFINITY_GROUPS: &[(&str, &[&str])] = &[
    ("faith", &["myth", "ritual", "sacred", "prophecy"]),
    ("force", &["weapon", "fear", "war", "blood"]),
    ("order", &["law", "history", "record", "tax"]),
    ("kin", &["food", "harvest", "tribe", "family"]),
];

const FOOD_TAG: &str = "food";
const HISTORY_TAG: &str = "history";
const NARRATIVE_CAP: i32 = 50;
const LEVEL_NF_STEP: f64 = 10.0;
const LEVEL_PL_STEP: f64 = 0.5;
const TAG_MATCH_NF: f64 = 10.0;
const SHARED_GROUP_PL: f64 = 1.0;
const PAIR_BONUS_NF: f64 = 15.0;
const TRIO_BONUS_NF: f64 = 30.0;
const TRIO_BONUS_PL: f64 = 0.5;
const SLOT_ONE_NF: f64 = 5.0;
const SLOT_TWO_PL: f64 = 0.3;
const SLOT_THREE_PL_MULT: f64 = 1.15;
const THEOCRACY_NF_MULT: f64 = 1.15;
const WARLORD_PL_MULT: f64 = 1.15;
const BUREAUCRACY_NF: f64 = 20.0;
const TRIBAL_PL: f64 = 0.5;
const FELA_MULT: f64 = 0.7;
const MYTH_DENSITY_RATE: f64 = 0.005;

/// Everything the pipeline reads. Scoring never mutates game state.
#[derive(Debug, Clone, Copy)]
pub struct ScoringInput<'a> {
    pub intent: &'a Intent,
    /// Intent level, 1-based.
    pub level: u32,
    /// Selected cards in selection order.
    pub cards: &'a [Card],
    pub decrees: &'a [Decree],
    pub government: Government,
    pub myth_density: u32,
    pub myth_count: usize,
    pub scapegoats: u32,
    pub era: u8,
    pub boss_modifier: Option<BossModifier>,
}

/// One applied step and the running totals immediately after it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringStep {
    pub label: String,
    pub nf_delta: f64,
    pub pl_delta: f64,
    pub nf_total: f64,
    pub pl_total: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ScoringBreakdown {
    /// Append-only; order is significant.
    pub steps: Vec<ScoringStep>,
    pub raw_nf: f64,
    pub raw_pl: f64,
    pub final_nf: f64,
    pub final_pl: f64,
    pub final_score: i64,
}

impl ScoringBreakdown {
    /// Append an additive step.
    pub fn push_add(&mut self, label: impl Into<String>, nf_delta: f64, pl_delta: f64) {
        self.raw_nf += nf_delta;
        self.raw_pl += pl_delta;
        self.record(label.into(), nf_delta, pl_delta);
    }

    /// Append a multiplicative step against the current totals.
    pub fn push_scale(&mut self, label: impl Into<String>, nf_factor: f64, pl_factor: f64) {
        let nf = self.raw_nf * nf_factor;
        let pl = self.raw_pl * pl_factor;
        let nf_delta = nf - self.raw_nf;
        let pl_delta = pl - self.raw_pl;
        self.raw_nf = nf;
        self.raw_pl = pl;
        self.record(label.into(), nf_delta, pl_delta);
    }

    fn record(&mut self, label: String, nf_delta: f64, pl_delta: f64) {
        self.steps.push(ScoringStep {
            label,
            nf_delta,
            pl_delta,
            nf_total: self.raw_nf,
            pl_total: self.raw_pl,
        });
    }

    /// Recompute the rounded display totals and the integer score.
    pub fn finalize(&mut self) {
        self.final_nf = round_to_tenth(self.raw_nf);
        self.final_pl = round_to_tenth(self.raw_pl);
        self.final_score = floor_f64_to_i64(self.raw_nf * self.raw_pl);
    }
}

/// Whether `count` cards satisfy the intent's minimum.
#[must_use]
pub const fn meets_minimum(intent: &Intent, count: usize) -> bool {
    count >= intent.min_cards
}

/// Run the scoring pipeline.
///
/// Callers must check [`meets_minimum`] first.
#[must_use]
pub fn compute_score(input: &ScoringInput<'_>) -> ScoringBreakdown {
    debug_assert!(
        meets_minimum(input.intent, input.cards.len()),
        "intent `{}` invoked with too few cards",
        input.intent.id
    );
    let mut breakdown = ScoringBreakdown::default();

    apply_intent_base(&mut breakdown, input);
    apply_card_contributions(&mut breakdown, input);
    let shared_group = apply_tag_affinity(&mut breakdown, input.cards);
    apply_card_count_bonus(&mut breakdown, input.cards.len());
    apply_slot_bonuses(&mut breakdown, input.cards.len());
    apply_decrees(&mut breakdown, input);
    apply_government(&mut breakdown, input.government, shared_group);

    if input.myth_density > 0 {
        let factor = 1.0 + f64::from(input.myth_density) * MYTH_DENSITY_RATE;
        breakdown.push_scale(format!("Myth density {}", input.myth_density), factor, 1.0);
    }
    if input.boss_modifier == Some(BossModifier::FelaDecay) {
        breakdown.push_scale("Boss: fela decay", FELA_MULT, FELA_MULT);
    }

    breakdown.finalize();
    breakdown
}

fn apply_intent_base(breakdown: &mut ScoringBreakdown, input: &ScoringInput<'_>) {
    let level = input.level.max(1);
    let extra = f64::from(level - 1);
    breakdown.push_add(
        format!("{} (level {level})", input.intent.name),
        input.intent.base_nf + LEVEL_NF_STEP * extra,
        input.intent.base_pl + LEVEL_PL_STEP * extra,
    );
}

/// Narrative potential of a card after boss modifiers and enhancement.
#[must_use]
pub fn effective_potential(card: &Card, boss_modifier: Option<BossModifier>) -> f64 {
    let mut potential = card.narrative_potential;
    match boss_modifier {
        Some(BossModifier::NoFoodCards) if card.has_tag(FOOD_TAG) => potential = 0,
        Some(BossModifier::NarrativeCap) => potential = potential.min(NARRATIVE_CAP),
        _ => {}
    }
    f64::from(potential) * card.enhancement.potential_multiplier()
}

fn apply_card_contributions(breakdown: &mut ScoringBreakdown, input: &ScoringInput<'_>) {
    for card in input.cards {
        let nf = effective_potential(card, input.boss_modifier);
        breakdown.push_add(card.name.clone(), nf, card.enhancement.pl_bonus());
    }
}

/// Tag occurrences across the selection that fall into affinity groups,
/// counted once per group a tag belongs to.
#[must_use]
pub fn affinity_match_count(cards: &[Card]) -> usize {
    cards
        .iter()
        .flat_map(|card| card.tags.iter())
        .map(|tag| {
            AFFINITY_GROUPS
                .iter()
                .filter(|(_, members)| members.contains(&tag.as_str()))
                .count()
        })
        .sum()
}

/// True when at least two cards are selected and all share one affinity group.
#[must_use]
pub fn shares_affinity_group(cards: &[Card]) -> bool {
    cards.len() >= 2
        && AFFINITY_GROUPS.iter().any(|(_, members)| {
            cards
                .iter()
                .all(|card| card.tags.iter().any(|tag| members.contains(&tag.as_str())))
        })
}

fn apply_tag_affinity(breakdown: &mut ScoringBreakdown, cards: &[Card]) -> bool {
    let matches = affinity_match_count(cards);
    let shared = shares_affinity_group(cards);
    let nf = TAG_MATCH_NF * usize_to_f64(matches);
    let pl = if shared { SHARED_GROUP_PL } else { 0.0 };
    if matches > 0 || shared {
        breakdown.push_add(format!("Tag affinity ({matches} matches)"), nf, pl);
    }
    shared
}

fn apply_card_count_bonus(breakdown: &mut ScoringBreakdown, count: usize) {
    match count {
        2 => breakdown.push_add("Pair bonus", PAIR_BONUS_NF, 0.0),
        3 => breakdown.push_add("Trio bonus", TRIO_BONUS_NF, TRIO_BONUS_PL),
        _ => {}
    }
}

fn apply_slot_bonuses(breakdown: &mut ScoringBreakdown, count: usize) {
    if count == 0 {
        return;
    }
    let pl = if count >= 2 { SLOT_TWO_PL } else { 0.0 };
    breakdown.push_add("Slot bonus", SLOT_ONE_NF, pl);
    if count >= 3 {
        breakdown.push_scale("Third slot", 1.0, SLOT_THREE_PL_MULT);
    }
}

fn apply_decrees(breakdown: &mut ScoringBreakdown, input: &ScoringInput<'_>) {
    for phase in DecreePhase::ORDER {
        for decree in input.decrees.iter().filter(|d| d.effect.phase() == phase) {
            match decree.effect {
                DecreeEffect::AddNf { value } => breakdown.push_add(decree.name.clone(), value, 0.0),
                DecreeEffect::AddPl { value } => breakdown.push_add(decree.name.clone(), 0.0, value),
                DecreeEffect::MultPl { value } => {
                    breakdown.push_scale(decree.name.clone(), 1.0, value);
                }
                DecreeEffect::Conditional {
                    condition,
                    axis,
                    value,
                } => {
                    let Some(amount) = condition_amount(condition, value, input) else {
                        continue;
                    };
                    match axis {
                        TargetAxis::Nf => breakdown.push_add(decree.name.clone(), amount, 0.0),
                        TargetAxis::Pl => breakdown.push_add(decree.name.clone(), 0.0, amount),
                    }
                }
            }
        }
    }
}

/// Amount a conditional decree contributes, or `None` when its condition fails.
fn condition_amount(condition: ConditionTag, value: f64, input: &ScoringInput<'_>) -> Option<f64> {
    match condition {
        ConditionTag::HistoryTag => input
            .cards
            .iter()
            .any(|c| c.has_tag(HISTORY_TAG))
            .then_some(value),
        ConditionTag::TwoPlusCards => (input.cards.len() >= 2).then_some(value),
        ConditionTag::Theocracy => (input.government == Government::Theocracy).then_some(value),
        ConditionTag::HasScapegoats => (input.scapegoats > 0).then_some(value),
        ConditionTag::PerMyth => {
            (input.myth_count > 0).then(|| value * usize_to_f64(input.myth_count))
        }
        ConditionTag::PhysicalConvert => {
            let physical: i32 = input.cards.iter().map(|c| c.physical_value.max(0)).sum();
            (physical > 0).then(|| value * f64::from(physical))
        }
        ConditionTag::EraAtLeast(era) => (input.era >= era).then_some(value),
    }
}

fn apply_government(breakdown: &mut ScoringBreakdown, government: Government, shared: bool) {
    let label = format!("Government: {government}");
    match government {
        Government::Theocracy => breakdown.push_scale(label, THEOCRACY_NF_MULT, 1.0),
        Government::Warlord => breakdown.push_scale(label, 1.0, WARLORD_PL_MULT),
        Government::Bureaucracy => breakdown.push_add(label, BUREAUCRACY_NF, 0.0),
        Government::Tribal if shared => breakdown.push_add(label, 0.0, TRIBAL_PL),
        Government::Fela => breakdown.push_scale(label, FELA_MULT, FELA_MULT),
        Government::Tribal | Government::Undefined => {}
    }
}
