//! Nation vitality, government classification and affinity tracking.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::numbers::clamp_stat;

const AFFINITY_MIN: i32 = 0;
const AFFINITY_MAX: i32 = 100;

/// Government classification of the nation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Government {
    #[default]
    Undefined,
    Theocracy,
    Warlord,
    Bureaucracy,
    Tribal,
    /// Degraded state forced by collapsing vitality.
    Fela,
}

impl Government {
    pub const ALL: &'static [Self] = &[
        Self::Undefined,
        Self::Theocracy,
        Self::Warlord,
        Self::Bureaucracy,
        Self::Tribal,
        Self::Fela,
    ];

    /// Governments eligible for affinity promotion, in scan order.
    pub const PROMOTABLE: &'static [Self] = &[
        Self::Theocracy,
        Self::Warlord,
        Self::Bureaucracy,
        Self::Tribal,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Theocracy => "theocracy",
            Self::Warlord => "warlord",
            Self::Bureaucracy => "bureaucracy",
            Self::Tribal => "tribal",
            Self::Fela => "fela",
        }
    }
}

impl fmt::Display for Government {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Government {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|gov| gov.as_str() == s)
            .ok_or(())
    }
}

/// Stat deltas applied by entropy, events and narration.
/// All fields default to 0 if not specified in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatsDelta {
    #[serde(default)]
    pub narrative_integrity: i32,
    #[serde(default)]
    pub violence_authority: i32,
    #[serde(default)]
    pub supply_level: i32,
    #[serde(default)]
    pub sanity: i32,
    #[serde(default)]
    pub cruelty: i32,
    #[serde(default)]
    pub corruption: i32,
    #[serde(default)]
    pub population: i64,
}

impl StatsDelta {
    /// Multiply every component, used for era-scaled entropy.
    #[must_use]
    pub fn scaled(self, factor: i32) -> Self {
        Self {
            narrative_integrity: self.narrative_integrity.saturating_mul(factor),
            violence_authority: self.violence_authority.saturating_mul(factor),
            supply_level: self.supply_level.saturating_mul(factor),
            sanity: self.sanity.saturating_mul(factor),
            cruelty: self.cruelty.saturating_mul(factor),
            corruption: self.corruption.saturating_mul(factor),
            population: self.population.saturating_mul(i64::from(factor)),
        }
    }
}

/// Core vitality stats of the nation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationStats {
    pub narrative_integrity: i32,
    pub violence_authority: i32,
    pub supply_level: i32,
    pub sanity: i32,
    pub cruelty: i32,
    pub corruption: i32,
    pub population: i64,
}

impl Default for NationStats {
    fn default() -> Self {
        Self {
            narrative_integrity: 60,
            violence_authority: 60,
            supply_level: 60,
            sanity: 70,
            cruelty: 10,
            corruption: 10,
            population: 1_000,
        }
    }
}

impl NationStats {
    /// Clamp every stat into its legal range.
    pub fn clamp(&mut self) {
        self.narrative_integrity = clamp_stat(self.narrative_integrity);
        self.violence_authority = clamp_stat(self.violence_authority);
        self.supply_level = clamp_stat(self.supply_level);
        self.sanity = clamp_stat(self.sanity);
        self.cruelty = clamp_stat(self.cruelty);
        self.corruption = clamp_stat(self.corruption);
        self.population = self.population.max(0);
    }

    /// True when integrity, violence and supply have all collapsed below `threshold`.
    #[must_use]
    pub const fn is_collapsing(&self, threshold: i32) -> bool {
        self.narrative_integrity < threshold
            && self.violence_authority < threshold
            && self.supply_level < threshold
    }
}

/// Why the nation fell apart at an era boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollapseCause {
    Riot,
    Starvation,
    Insanity,
}

/// Thresholds driving government reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityThresholds {
    pub promotion: i32,
    pub fela: i32,
}

impl Default for AffinityThresholds {
    fn default() -> Self {
        Self {
            promotion: 50,
            fela: 20,
        }
    }
}

/// The nation: current classification plus vitality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct NationState {
    pub government: Government,
    pub stats: NationStats,
    /// One-shot flag raised when the classification changes; the host narrates and clears it.
    #[serde(default)]
    pub pending_transition: Option<Government>,
}

impl NationState {
    /// Apply stat deltas with clamping.
    pub fn apply_delta(&mut self, delta: &StatsDelta) {
        let stats = &mut self.stats;
        stats.narrative_integrity = stats
            .narrative_integrity
            .saturating_add(delta.narrative_integrity);
        stats.violence_authority = stats
            .violence_authority
            .saturating_add(delta.violence_authority);
        stats.supply_level = stats.supply_level.saturating_add(delta.supply_level);
        stats.sanity = stats.sanity.saturating_add(delta.sanity);
        stats.cruelty = stats.cruelty.saturating_add(delta.cruelty);
        stats.corruption = stats.corruption.saturating_add(delta.corruption);
        stats.population = stats.population.saturating_add(delta.population);
        stats.clamp();
    }

    /// First death condition met, checked as riot, starvation, insanity.
    #[must_use]
    pub const fn collapse_cause(&self) -> Option<CollapseCause> {
        if self.stats.violence_authority <= 0 {
            Some(CollapseCause::Riot)
        } else if self.stats.supply_level <= 0 {
            Some(CollapseCause::Starvation)
        } else if self.stats.sanity <= 0 {
            Some(CollapseCause::Insanity)
        } else {
            None
        }
    }

    /// Force the degraded classification when vitality has collapsed.
    /// Returns the new government when it changed.
    pub fn enforce_fela(&mut self, threshold: i32) -> Option<Government> {
        if self.government == Government::Fela || !self.stats.is_collapsing(threshold) {
            return None;
        }
        log::info!("vitality collapsed, government forced to fela");
        self.set_government(Government::Fela)
    }

    fn set_government(&mut self, government: Government) -> Option<Government> {
        if self.government == government {
            return None;
        }
        self.government = government;
        self.pending_transition = Some(government);
        Some(government)
    }

    /// Clear and return the pending transition flag.
    pub fn take_pending_transition(&mut self) -> Option<Government> {
        self.pending_transition.take()
    }
}

/// Per-government accumulators in `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct GovernmentAffinities(BTreeMap<Government, i32>);

impl GovernmentAffinities {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, government: Government) -> i32 {
        self.0.get(&government).copied().unwrap_or(AFFINITY_MIN)
    }

    /// Add `amount` (possibly negative) to a government's affinity, then reclassify the nation.
    ///
    /// Returns the new government when the classification changed.
    pub fn increment(
        &mut self,
        nation: &mut NationState,
        government: Government,
        amount: i32,
        thresholds: AffinityThresholds,
    ) -> Option<Government> {
        let updated = self
            .get(government)
            .saturating_add(amount)
            .clamp(AFFINITY_MIN, AFFINITY_MAX);
        self.0.insert(government, updated);
        log::debug!("affinity {government} -> {updated}");

        let mut changed = None;
        if nation.government != Government::Fela
            && let Some(leader) = self.leader(thresholds.promotion)
            && let Some(gov) = nation.set_government(leader)
        {
            log::info!("government reclassified as {gov}");
            changed = Some(gov);
        }
        nation.enforce_fela(thresholds.fela).or(changed)
    }

    /// Highest promotable accumulator at or above `threshold`; ties go to scan order.
    #[must_use]
    pub fn leader(&self, threshold: i32) -> Option<Government> {
        let mut best: Option<(Government, i32)> = None;
        for &gov in Government::PROMOTABLE {
            let value = self.get(gov);
            if value < threshold {
                continue;
            }
            if best.is_none_or(|(_, top)| value > top) {
                best = Some((gov, value));
            }
        }
        best.map(|(gov, _)| gov)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> AffinityThresholds {
        AffinityThresholds::default()
    }

    #[test]
    fn promotion_fires_once() {
        let mut affinities = GovernmentAffinities::new();
        let mut nation = NationState::default();

        let first = affinities.increment(&mut nation, Government::Theocracy, 50, thresholds());
        assert_eq!(first, Some(Government::Theocracy));
        assert_eq!(nation.government, Government::Theocracy);
        assert_eq!(nation.take_pending_transition(), Some(Government::Theocracy));

        let second = affinities.increment(&mut nation, Government::Theocracy, 50, thresholds());
        assert_eq!(second, None);
        assert_eq!(nation.pending_transition, None);
        assert_eq!(affinities.get(Government::Theocracy), 100);
    }

    #[test]
    fn below_threshold_keeps_undefined() {
        let mut affinities = GovernmentAffinities::new();
        let mut nation = NationState::default();
        assert_eq!(
            affinities.increment(&mut nation, Government::Warlord, 49, thresholds()),
            None
        );
        assert_eq!(nation.government, Government::Undefined);
    }

    #[test]
    fn affinity_clamps_both_ways() {
        let mut affinities = GovernmentAffinities::new();
        let mut nation = NationState::default();
        affinities.increment(&mut nation, Government::Tribal, 250, thresholds());
        assert_eq!(affinities.get(Government::Tribal), 100);
        affinities.increment(&mut nation, Government::Tribal, -400, thresholds());
        assert_eq!(affinities.get(Government::Tribal), 0);
    }

    #[test]
    fn ties_resolve_in_scan_order() {
        let mut affinities = GovernmentAffinities::new();
        let mut nation = NationState::default();
        affinities.increment(&mut nation, Government::Tribal, 60, thresholds());
        affinities.increment(&mut nation, Government::Warlord, 60, thresholds());
        assert_eq!(affinities.leader(50), Some(Government::Warlord));
        assert_eq!(nation.government, Government::Warlord);
    }

    #[test]
    fn higher_accumulator_overtakes() {
        let mut affinities = GovernmentAffinities::new();
        let mut nation = NationState::default();
        affinities.increment(&mut nation, Government::Theocracy, 55, thresholds());
        let changed = affinities.increment(&mut nation, Government::Bureaucracy, 70, thresholds());
        assert_eq!(changed, Some(Government::Bureaucracy));
    }

    #[test]
    fn fela_overrides_affinity_leader() {
        let mut affinities = GovernmentAffinities::new();
        let mut nation = NationState::default();
        nation.stats.narrative_integrity = 10;
        nation.stats.violence_authority = 10;
        nation.stats.supply_level = 10;

        let changed = affinities.increment(&mut nation, Government::Theocracy, 90, thresholds());
        assert_eq!(changed, Some(Government::Fela));
        assert_eq!(nation.government, Government::Fela);

        nation.stats = NationStats::default();
        let again = affinities.increment(&mut nation, Government::Warlord, 100, thresholds());
        assert_eq!(again, None, "fela is never promoted away automatically");
        assert_eq!(nation.government, Government::Fela);
    }

    #[test]
    fn apply_delta_clamps_and_population_floors() {
        let mut nation = NationState::default();
        nation.apply_delta(&StatsDelta {
            sanity: 500,
            supply_level: -500,
            population: -5_000,
            ..StatsDelta::default()
        });
        assert_eq!(nation.stats.sanity, 100);
        assert_eq!(nation.stats.supply_level, 0);
        assert_eq!(nation.stats.population, 0);
        assert_eq!(nation.collapse_cause(), Some(CollapseCause::Starvation));
    }

    #[test]
    fn government_parses_from_key() {
        assert_eq!("warlord".parse::<Government>(), Ok(Government::Warlord));
        assert!("monarchy".parse::<Government>().is_err());
    }
}
