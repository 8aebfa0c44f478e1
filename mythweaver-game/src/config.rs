//! Tunable rules: action budgets, caps, rewards and thresholds.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crisis::CrisisType;
use crate::government::AffinityThresholds;

pub const DEFAULT_RULES_DATA: &str = include_str!("../assets/data/rules.json");

/// Hard cap on lives, independent of configuration.
pub const LIVES_CAP: u8 = 3;
/// Hard cap on equipped decrees.
pub const DECREE_SLOTS_CAP: usize = 5;

/// Influence awarded for clearing crises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfluenceRewards {
    #[serde(default = "InfluenceRewards::default_small")]
    pub small: u32,
    #[serde(default = "InfluenceRewards::default_big")]
    pub big: u32,
    #[serde(default = "InfluenceRewards::default_boss")]
    pub boss: u32,
    /// Bonus when the round score reaches twice the target.
    #[serde(default = "InfluenceRewards::default_overkill_bonus")]
    pub overkill_bonus: u32,
}

impl InfluenceRewards {
    const fn default_small() -> u32 {
        3
    }

    const fn default_big() -> u32 {
        5
    }

    const fn default_boss() -> u32 {
        8
    }

    const fn default_overkill_bonus() -> u32 {
        2
    }

    #[must_use]
    pub const fn base_for(&self, crisis_type: CrisisType) -> u32 {
        match crisis_type {
            CrisisType::Small => self.small,
            CrisisType::Big => self.big,
            CrisisType::Boss => self.boss,
        }
    }
}

impl Default for InfluenceRewards {
    fn default() -> Self {
        Self {
            small: Self::default_small(),
            big: Self::default_big(),
            boss: Self::default_boss(),
            overkill_bonus: Self::default_overkill_bonus(),
        }
    }
}

/// Target multipliers per crisis type, applied to the era's base target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetMultipliers {
    #[serde(default = "TargetMultipliers::default_small")]
    pub small: f64,
    #[serde(default = "TargetMultipliers::default_big")]
    pub big: f64,
    #[serde(default = "TargetMultipliers::default_boss")]
    pub boss: f64,
}

impl TargetMultipliers {
    const fn default_small() -> f64 {
        1.0
    }

    const fn default_big() -> f64 {
        1.5
    }

    const fn default_boss() -> f64 {
        2.0
    }

    #[must_use]
    pub const fn for_type(&self, crisis_type: CrisisType) -> f64 {
        match crisis_type {
            CrisisType::Small => self.small,
            CrisisType::Big => self.big,
            CrisisType::Boss => self.boss,
        }
    }
}

impl Default for TargetMultipliers {
    fn default() -> Self {
        Self {
            small: Self::default_small(),
            big: Self::default_big(),
            boss: Self::default_boss(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default = "RulesConfig::default_hand_size")]
    pub hand_size: usize,
    #[serde(default = "RulesConfig::default_lives")]
    pub starting_lives: u8,
    #[serde(default = "RulesConfig::default_lives")]
    pub max_lives: u8,
    #[serde(default = "RulesConfig::default_weaves")]
    pub weaves_per_crisis: u8,
    /// Weaves granted while the `silence` boss modifier is active.
    #[serde(default = "RulesConfig::default_silence_weaves")]
    pub silence_weaves: u8,
    #[serde(default = "RulesConfig::default_discards")]
    pub discards_per_crisis: u8,
    #[serde(default = "RulesConfig::default_decree_slots")]
    pub decree_slots: usize,
    #[serde(default = "RulesConfig::default_consumable_slots")]
    pub consumable_slots: usize,
    #[serde(default = "RulesConfig::default_final_era")]
    pub final_era: u8,
    #[serde(default = "RulesConfig::default_promotion_threshold")]
    pub promotion_threshold: i32,
    #[serde(default = "RulesConfig::default_fela_threshold")]
    pub fela_threshold: i32,
    #[serde(default)]
    pub target_multipliers: TargetMultipliers,
    #[serde(default)]
    pub influence: InfluenceRewards,
    /// Upgrade price per current intent level.
    #[serde(default = "RulesConfig::default_intent_upgrade_cost")]
    pub intent_upgrade_cost: u32,
    /// Myth density gained per combo.
    #[serde(default = "RulesConfig::default_combo_myth_density")]
    pub combo_myth_density: u32,
}

impl RulesConfig {
    const fn default_hand_size() -> usize {
        8
    }

    const fn default_lives() -> u8 {
        LIVES_CAP
    }

    const fn default_weaves() -> u8 {
        3
    }

    const fn default_silence_weaves() -> u8 {
        1
    }

    const fn default_discards() -> u8 {
        2
    }

    const fn default_decree_slots() -> usize {
        DECREE_SLOTS_CAP
    }

    const fn default_consumable_slots() -> usize {
        2
    }

    const fn default_final_era() -> u8 {
        5
    }

    const fn default_promotion_threshold() -> i32 {
        50
    }

    const fn default_fela_threshold() -> i32 {
        20
    }

    const fn default_intent_upgrade_cost() -> u32 {
        4
    }

    const fn default_combo_myth_density() -> u32 {
        10
    }

    /// Parse and validate rules JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or violates a bound.
    pub fn from_json(json: &str) -> Result<Self, RulesConfigError> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `RulesConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), RulesConfigError> {
        if self.hand_size == 0 {
            return Err(RulesConfigError::Zero("hand_size"));
        }
        if self.final_era == 0 {
            return Err(RulesConfigError::Zero("final_era"));
        }
        if self.max_lives == 0 || self.max_lives > LIVES_CAP {
            return Err(RulesConfigError::OutOfRange {
                field: "max_lives",
                max: u32::from(LIVES_CAP),
                value: u32::from(self.max_lives),
            });
        }
        if self.starting_lives == 0 || self.starting_lives > self.max_lives {
            return Err(RulesConfigError::OutOfRange {
                field: "starting_lives",
                max: u32::from(self.max_lives),
                value: u32::from(self.starting_lives),
            });
        }
        if self.decree_slots > DECREE_SLOTS_CAP {
            return Err(RulesConfigError::OutOfRange {
                field: "decree_slots",
                max: u32::try_from(DECREE_SLOTS_CAP).unwrap_or(u32::MAX),
                value: u32::try_from(self.decree_slots).unwrap_or(u32::MAX),
            });
        }
        if self.weaves_per_crisis == 0 || self.silence_weaves == 0 {
            return Err(RulesConfigError::Zero("weaves"));
        }
        if !(0..=100).contains(&self.promotion_threshold)
            || !(0..=100).contains(&self.fela_threshold)
        {
            return Err(RulesConfigError::Threshold {
                promotion: self.promotion_threshold,
                fela: self.fela_threshold,
            });
        }
        Ok(())
    }

    #[must_use]
    pub const fn affinity_thresholds(&self) -> AffinityThresholds {
        AffinityThresholds {
            promotion: self.promotion_threshold,
            fela: self.fela_threshold,
        }
    }
}

impl Default for RulesConfig {
    fn default() -> Self {
        Self {
            hand_size: Self::default_hand_size(),
            starting_lives: Self::default_lives(),
            max_lives: Self::default_lives(),
            weaves_per_crisis: Self::default_weaves(),
            silence_weaves: Self::default_silence_weaves(),
            discards_per_crisis: Self::default_discards(),
            decree_slots: Self::default_decree_slots(),
            consumable_slots: Self::default_consumable_slots(),
            final_era: Self::default_final_era(),
            promotion_threshold: Self::default_promotion_threshold(),
            fela_threshold: Self::default_fela_threshold(),
            target_multipliers: TargetMultipliers::default(),
            influence: InfluenceRewards::default(),
            intent_upgrade_cost: Self::default_intent_upgrade_cost(),
            combo_myth_density: Self::default_combo_myth_density(),
        }
    }
}

/// Errors raised when rules configuration invariants are violated.
#[derive(Debug, Error)]
pub enum RulesConfigError {
    #[error("rules JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{0} must be non-zero")]
    Zero(&'static str),
    #[error("{field} must be between 1 and {max} (got {value})")]
    OutOfRange {
        field: &'static str,
        max: u32,
        value: u32,
    },
    #[error("thresholds must lie in 0..=100 (promotion {promotion}, fela {fela})")]
    Threshold { promotion: i32, fela: i32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_rules_match_defaults() {
        let rules = RulesConfig::from_json(DEFAULT_RULES_DATA).unwrap();
        assert_eq!(rules, RulesConfig::default());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let rules = RulesConfig::from_json(r#"{ "hand_size": 6 }"#).unwrap();
        assert_eq!(rules.hand_size, 6);
        assert_eq!(rules.weaves_per_crisis, 3);
        assert_eq!(rules.influence.boss, 8);
    }

    #[test]
    fn lives_above_cap_are_rejected() {
        let err = RulesConfig::from_json(r#"{ "max_lives": 4 }"#).unwrap_err();
        assert!(matches!(
            err,
            RulesConfigError::OutOfRange {
                field: "max_lives",
                ..
            }
        ));
    }

    #[test]
    fn zero_hand_is_rejected() {
        let cfg = RulesConfig {
            hand_size: 0,
            ..RulesConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(RulesConfigError::Zero("hand_size"))));
    }
}
