//! Crisis and era progression state.
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::catalog::EraSchedule;
use crate::config::{LIVES_CAP, RulesConfig};
use crate::government::CollapseCause;
use crate::numbers::{floor_f64_to_i64, i64_to_f64};

/// Crises per era; the last one is the boss.
pub const CRISES_PER_ERA: u8 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrisisType {
    Small,
    Big,
    Boss,
}

impl CrisisType {
    #[must_use]
    pub const fn for_index(crisis_index: u8) -> Self {
        match crisis_index {
            0 => Self::Small,
            1 => Self::Big,
            _ => Self::Boss,
        }
    }
}

impl fmt::Display for CrisisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Small => write!(f, "small"),
            Self::Big => write!(f, "big"),
            Self::Boss => write!(f, "boss"),
        }
    }
}

/// Rule twist carried by a boss crisis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossModifier {
    /// Food-tagged cards contribute no narrative potential.
    NoFoodCards,
    /// Narrative potential is capped at 50 per card.
    NarrativeCap,
    /// Combo detection is disabled.
    NoCombos,
    /// Only one weave per attempt.
    Silence,
    /// NF and PL decay by 30% at the end of scoring.
    FelaDecay,
}

/// Why the run ended in defeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefeatReason {
    LivesExhausted,
    Riot,
    Starvation,
    Insanity,
}

impl DefeatReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LivesExhausted => "lives_exhausted",
            Self::Riot => "riot",
            Self::Starvation => "starvation",
            Self::Insanity => "insanity",
        }
    }
}

impl fmt::Display for DefeatReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CollapseCause> for DefeatReason {
    fn from(value: CollapseCause) -> Self {
        match value {
            CollapseCause::Riot => Self::Riot,
            CollapseCause::Starvation => Self::Starvation,
            CollapseCause::Insanity => Self::Insanity,
        }
    }
}

/// Progression state machine phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum Phase {
    #[default]
    CrisisStart,
    Weave,
    CrisisEnd,
    Shop,
    EraTransition,
    NarrativeEvent {
        event_id: String,
    },
    Victory,
    Defeat {
        reason: DefeatReason,
    },
}

impl Phase {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Victory | Self::Defeat { .. })
    }
}

/// Outcome of evaluating a finished crisis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CrisisResolution {
    /// Target missed, a life was spent and the same crisis restarts.
    Retry { lives_remaining: u8 },
    /// Target missed on the last life.
    Defeat,
    /// Target reached.
    Cleared { influence: u32, era_complete: bool },
}

/// State of the crisis being played.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrisisState {
    pub era: u8,
    pub crisis_index: u8,
    pub crisis_type: CrisisType,
    pub target_score: i64,
    #[serde(default)]
    pub boss_modifier: Option<BossModifier>,
    pub round_score: i64,
    pub total_score: i64,
    pub lives: u8,
    pub weaves_remaining: u8,
    pub discards_remaining: u8,
    pub hand_size: usize,
}

impl CrisisState {
    /// Build a fresh crisis, carrying over lives, hand size and total score.
    #[must_use]
    pub fn build(
        schedule: &EraSchedule,
        crisis_index: u8,
        rules: &RulesConfig,
        lives: u8,
        hand_size: usize,
        total_score: i64,
    ) -> Self {
        let crisis_type = CrisisType::for_index(crisis_index);
        let multiplier = rules.target_multipliers.for_type(crisis_type);
        let target_score = floor_f64_to_i64(i64_to_f64(schedule.base_target) * multiplier);
        let boss_modifier = (crisis_type == CrisisType::Boss).then_some(schedule.boss_modifier);
        Self {
            era: schedule.era,
            crisis_index,
            crisis_type,
            target_score,
            boss_modifier,
            round_score: 0,
            total_score,
            lives: lives.min(LIVES_CAP),
            weaves_remaining: weaves_for(boss_modifier, rules),
            discards_remaining: rules.discards_per_crisis,
            hand_size,
        }
    }

    #[must_use]
    pub fn has_modifier(&self, modifier: BossModifier) -> bool {
        self.boss_modifier == Some(modifier)
    }

    #[must_use]
    pub const fn is_cleared(&self) -> bool {
        self.round_score >= self.target_score
    }

    /// Spend a weave; false when none remain.
    pub fn consume_weave(&mut self) -> bool {
        if self.weaves_remaining == 0 {
            return false;
        }
        self.weaves_remaining -= 1;
        true
    }

    /// Spend a discard; false when none remain.
    pub fn consume_discard(&mut self) -> bool {
        if self.discards_remaining == 0 {
            return false;
        }
        self.discards_remaining -= 1;
        true
    }

    /// Add a weave's score to round and run totals.
    pub fn record_score(&mut self, score: i64) {
        let score = score.max(0);
        self.round_score = self.round_score.saturating_add(score);
        self.total_score = self.total_score.saturating_add(score);
    }

    /// Spend a life; returns lives left.
    pub fn lose_life(&mut self) -> u8 {
        self.lives = self.lives.saturating_sub(1);
        self.lives
    }

    /// Restore lives up to `max_lives` (never beyond the hard cap).
    pub fn restore_lives(&mut self, amount: u8, max_lives: u8) {
        let cap = max_lives.min(LIVES_CAP);
        self.lives = self.lives.saturating_add(amount).min(cap);
    }

    /// Reset the attempt counters for a retry of the same crisis.
    pub fn reset_for_retry(&mut self, rules: &RulesConfig) {
        self.round_score = 0;
        self.weaves_remaining = weaves_for(self.boss_modifier, rules);
        self.discards_remaining = rules.discards_per_crisis;
    }

    /// Influence earned for clearing this crisis.
    #[must_use]
    pub fn influence_reward(&self, rules: &RulesConfig) -> u32 {
        let base = rules.influence.base_for(self.crisis_type);
        let overkill = self.round_score >= self.target_score.saturating_mul(2);
        if overkill {
            base + rules.influence.overkill_bonus
        } else {
            base
        }
    }

    #[must_use]
    pub const fn is_last_of_era(&self) -> bool {
        self.crisis_index.saturating_add(1) >= CRISES_PER_ERA
    }
}

/// Weaves granted per attempt, honoring the `silence` modifier.
#[must_use]
pub fn weaves_for(boss_modifier: Option<BossModifier>, rules: &RulesConfig) -> u8 {
    if boss_modifier == Some(BossModifier::Silence) {
        rules.silence_weaves
    } else {
        rules.weaves_per_crisis
    }
}
