//! Game state and the session that drives it through crises, eras and the shop.
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::catalog::{Card, Catalog, ConsumableEffect, EraSchedule, Intent};
use crate::combo::{apply_combo_bonus, find_matching_combo};
use crate::config::{DECREE_SLOTS_CAP, RulesConfig};
use crate::crisis::{BossModifier, CrisisResolution, CrisisState, DefeatReason, Phase};
use crate::government::{Government, GovernmentAffinities, NationState};
use crate::narration::NarrationRequest;
use crate::rng::{RngStream, StreamCounters};
use crate::scoring::{ScoringBreakdown, ScoringInput, compute_score, meets_minimum};
use crate::supply::{Discovery, Supply};

const FALLBACK_BASE_TARGET: i64 = 300;

/// Complete, serializable run state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub seed: u64,
    #[serde(default)]
    pub phase: Phase,
    /// Era counter; exceeds the final era once the last boss falls.
    pub era: u8,
    pub crisis: CrisisState,
    #[serde(default)]
    pub supply: Supply,
    #[serde(default)]
    pub nation: NationState,
    #[serde(default)]
    pub affinities: GovernmentAffinities,
    /// Equipped decree ids in acquisition order.
    #[serde(default)]
    pub decrees: Vec<String>,
    #[serde(default)]
    pub consumables: Vec<String>,
    #[serde(default)]
    pub intent_levels: BTreeMap<String, u32>,
    #[serde(default)]
    pub influence: u32,
    #[serde(default)]
    pub myth_density: u32,
    #[serde(default)]
    pub myths: BTreeSet<String>,
    #[serde(default)]
    pub scapegoats: u32,
    #[serde(default)]
    pub seen_events: BTreeSet<String>,
    #[serde(default)]
    pub rng: StreamCounters,
    #[serde(default)]
    pub weaves_spent: u32,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl GameState {
    /// Level of an intent; intents start at level 1.
    #[must_use]
    pub fn intent_level(&self, intent_id: &str) -> u32 {
        self.intent_levels.get(intent_id).copied().unwrap_or(1)
    }

    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.phase.is_terminal()
    }

    #[must_use]
    pub fn myth_count(&self) -> usize {
        self.myths.len()
    }
}

/// Result of a committed weave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaveOutcome {
    pub intent: Intent,
    pub cards: Vec<Card>,
    pub breakdown: ScoringBreakdown,
    /// Id of the combo formula that matched, if any.
    pub combo: Option<String>,
    pub round_score: i64,
    pub target_score: i64,
    /// True when the crisis moved to its end phase.
    pub crisis_over: bool,
}

/// Where an era transition led.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum EraOutcome {
    Collapsed { reason: DefeatReason },
    NarrativeEvent { event_id: String },
    Shop,
}

/// Read-only rules bound to one mutable run.
#[derive(Debug, Clone)]
pub struct GameSession {
    catalog: Catalog,
    rules: RulesConfig,
    state: GameState,
}

impl GameSession {
    /// Start a run: shuffle the starter deck and stage the first crisis.
    #[must_use]
    pub fn new(seed: u64, catalog: Catalog, rules: RulesConfig) -> Self {
        let mut counters = StreamCounters::default();
        let mut supply = Supply::new(catalog.starter_cards());
        supply.shuffle_deck(&mut counters.next_rng(seed, RngStream::Deck));

        let schedule = schedule_for(&catalog, 1);
        let crisis = CrisisState::build(
            &schedule,
            0,
            &rules,
            rules.starting_lives,
            rules.hand_size,
            0,
        );
        let state = GameState {
            seed,
            phase: Phase::CrisisStart,
            era: 1,
            crisis,
            supply,
            nation: NationState::default(),
            affinities: GovernmentAffinities::new(),
            decrees: Vec::new(),
            consumables: Vec::new(),
            intent_levels: BTreeMap::new(),
            influence: 0,
            myth_density: 0,
            myths: BTreeSet::new(),
            scapegoats: 0,
            seen_events: BTreeSet::new(),
            rng: counters,
            weaves_spent: 0,
            logs: vec![String::from("log.run.start")],
        };
        log::info!("run started with seed {seed}");
        Self {
            catalog,
            rules,
            state,
        }
    }

    /// Resume a run from saved state.
    #[must_use]
    pub const fn from_state(state: GameState, catalog: Catalog, rules: RulesConfig) -> Self {
        Self {
            catalog,
            rules,
            state,
        }
    }

    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    pub const fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    pub fn with_state_mut<F, R>(&mut self, f: F) -> R
    where
        F: FnOnce(&mut GameState) -> R,
    {
        f(&mut self.state)
    }

    #[must_use]
    pub fn into_state(self) -> GameState {
        self.state
    }

    #[must_use]
    pub const fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    #[must_use]
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// `CrisisStart -> Weave`, filling the hand.
    pub fn start_crisis(&mut self) -> bool {
        if self.state.phase != Phase::CrisisStart {
            return false;
        }
        let state = &mut self.state;
        let mut rng = state.rng.next_rng(state.seed, RngStream::Deck);
        let drawn = state.supply.fill_hand(state.crisis.hand_size, &mut rng);
        state.phase = Phase::Weave;
        state.logs.push(String::from("log.crisis.start"));
        log::info!(
            "era {} crisis {} ({}) started, target {}, drew {drawn}",
            state.crisis.era,
            state.crisis.crisis_index,
            state.crisis.crisis_type,
            state.crisis.target_score
        );
        true
    }

    pub fn select(&mut self, card_id: &str) -> bool {
        self.state.phase == Phase::Weave && self.state.supply.select(card_id)
    }

    pub fn deselect(&mut self, card_id: &str) -> bool {
        self.state.supply.deselect(card_id)
    }

    pub fn clear_selection(&mut self) {
        self.state.supply.clear_selection();
    }

    pub fn discover(&mut self, card_id: &str) -> Discovery {
        let outcome = self.state.supply.discover(card_id, &self.catalog);
        if outcome == Discovery::NewlyDiscovered {
            self.state.logs.push(String::from("log.card.discovered"));
        }
        outcome
    }

    /// Whether a weave with `intent_id` would be accepted right now.
    #[must_use]
    pub fn can_weave(&self, intent_id: &str) -> bool {
        self.state.phase == Phase::Weave
            && self.state.crisis.weaves_remaining > 0
            && self
                .catalog
                .intent(intent_id)
                .is_some_and(|intent| meets_minimum(intent, self.state.supply.selection.len()))
    }

    /// Score the selection under an intent and commit the result.
    ///
    /// Returns `None`, leaving state untouched, when the weave is not allowed.
    pub fn weave(&mut self, intent_id: &str) -> Option<WeaveOutcome> {
        if !self.can_weave(intent_id) {
            return None;
        }
        let intent = self.catalog.intent(intent_id)?.clone();
        let cards: Vec<Card> = self.state.supply.selection.to_vec();
        let decrees = self.catalog.resolve_decrees(&self.state.decrees);

        let mut breakdown = compute_score(&ScoringInput {
            intent: &intent,
            level: self.state.intent_level(intent_id),
            cards: &cards,
            decrees: &decrees,
            government: self.state.nation.government,
            myth_density: self.state.myth_density,
            myth_count: self.state.myth_count(),
            scapegoats: self.state.scapegoats,
            era: self.state.crisis.era,
            boss_modifier: self.state.crisis.boss_modifier,
        });

        let combo = if self.state.crisis.has_modifier(BossModifier::NoCombos) {
            None
        } else {
            let selected = self.state.supply.selected_ids();
            find_matching_combo(&self.catalog.combos, &selected).cloned()
        };
        if let Some(combo) = &combo {
            apply_combo_bonus(&mut breakdown, combo, combo.cards.len());
        }

        let state = &mut self.state;
        state.crisis.consume_weave();
        state.crisis.record_score(breakdown.final_score);
        state.supply.discard_selected();
        let mut rng = state.rng.next_rng(state.seed, RngStream::Deck);
        state.supply.fill_hand(state.crisis.hand_size, &mut rng);
        state.weaves_spent = state.weaves_spent.saturating_add(1);
        state.logs.push(String::from("log.weave.scored"));

        if let Some(combo) = &combo {
            state.myths.insert(combo.myth.clone());
            state.myth_density = state
                .myth_density
                .saturating_add(self.rules.combo_myth_density);
            state.logs.push(String::from("log.weave.combo"));
        }

        let crisis_over = state.crisis.is_cleared() || state.crisis.weaves_remaining == 0;
        if crisis_over {
            state.phase = Phase::CrisisEnd;
        }
        log::debug!(
            "weave {} scored {} (nf {}, pl {}), round {}/{}",
            intent.id,
            breakdown.final_score,
            breakdown.final_nf,
            breakdown.final_pl,
            state.crisis.round_score,
            state.crisis.target_score
        );

        Some(WeaveOutcome {
            intent,
            cards,
            breakdown,
            combo: combo.map(|c| c.id),
            round_score: state.crisis.round_score,
            target_score: state.crisis.target_score,
            crisis_over,
        })
    }

    /// Discard the selection and draw the same number of cards.
    pub fn discard_selection(&mut self) -> Option<usize> {
        let state = &mut self.state;
        if state.phase != Phase::Weave
            || state.supply.selection.is_empty()
            || !state.crisis.consume_discard()
        {
            return None;
        }
        let count = state.supply.discard_selected();
        let mut rng = state.rng.next_rng(state.seed, RngStream::Deck);
        let drawn = state.supply.draw(count, &mut rng);
        state.logs.push(String::from("log.discard"));
        log::debug!("discarded {count}, drew {drawn}");
        Some(count)
    }

    /// Spend a held consumable.
    pub fn use_consumable(&mut self, consumable_id: &str) -> bool {
        if self.state.phase != Phase::Weave {
            return false;
        }
        let Some(slot) = self
            .state
            .consumables
            .iter()
            .position(|id| id == consumable_id)
        else {
            return false;
        };
        let Some(consumable) = self.catalog.consumable(consumable_id) else {
            log::warn!("held consumable `{consumable_id}` missing from catalog; skipped");
            return false;
        };
        let state = &mut self.state;
        match consumable.effect {
            ConsumableEffect::ExtraWeave { amount } => {
                state.crisis.weaves_remaining = state.crisis.weaves_remaining.saturating_add(amount);
            }
            ConsumableEffect::ExtraDiscard { amount } => {
                state.crisis.discards_remaining =
                    state.crisis.discards_remaining.saturating_add(amount);
            }
            ConsumableEffect::RestoreLife { amount } => {
                state.crisis.restore_lives(amount, self.rules.max_lives);
            }
            ConsumableEffect::Scapegoat { amount } => {
                state.scapegoats = state.scapegoats.saturating_add(amount);
            }
            ConsumableEffect::MythDensity { amount } => {
                state.myth_density = state.myth_density.saturating_add(amount);
            }
        }
        state.consumables.remove(slot);
        state.logs.push(String::from("log.consumable.used"));
        log::debug!("used consumable {consumable_id}");
        true
    }

    /// Evaluate the finished crisis.
    pub fn resolve_crisis(&mut self) -> Option<CrisisResolution> {
        if self.state.phase != Phase::CrisisEnd {
            return None;
        }
        let state = &mut self.state;
        let resolution = if state.crisis.is_cleared() {
            let influence = state.crisis.influence_reward(&self.rules);
            state.influence = state.influence.saturating_add(influence);
            let era_complete = state.crisis.is_last_of_era();
            state.supply.recall_all();
            state.phase = if era_complete {
                Phase::EraTransition
            } else {
                Phase::Shop
            };
            state.logs.push(String::from("log.crisis.cleared"));
            log::info!(
                "crisis cleared with {} / {}, +{influence} influence",
                state.crisis.round_score,
                state.crisis.target_score
            );
            CrisisResolution::Cleared {
                influence,
                era_complete,
            }
        } else {
            let lives_remaining = state.crisis.lose_life();
            if lives_remaining == 0 {
                state.phase = Phase::Defeat {
                    reason: DefeatReason::LivesExhausted,
                };
                state.logs.push(String::from("log.run.defeat"));
                log::info!("crisis failed on the last life; run lost");
                CrisisResolution::Defeat
            } else {
                state.crisis.reset_for_retry(&self.rules);
                state.supply.recall_all();
                state.phase = Phase::CrisisStart;
                state.logs.push(String::from("log.crisis.retry"));
                log::info!("crisis failed, retrying with {lives_remaining} lives");
                CrisisResolution::Retry { lives_remaining }
            }
        };
        Some(resolution)
    }

    /// Apply era entropy and survival checks, then open an event or the shop.
    pub fn advance_era(&mut self) -> Option<EraOutcome> {
        if self.state.phase != Phase::EraTransition {
            return None;
        }
        let completed = self.state.era;
        let government = self.state.nation.government;
        if let Some(profile) = self.catalog.government_profile(government) {
            let entropy = profile.entropy.scaled(i32::from(completed));
            self.state.nation.apply_delta(&entropy);
            log::debug!("era {completed} entropy for {government}: {entropy:?}");
        }
        if self
            .state
            .nation
            .enforce_fela(self.rules.fela_threshold)
            .is_some()
        {
            self.state.logs.push(String::from("log.government.fela"));
        }
        if let Some(reason) = self.check_collapse() {
            return Some(EraOutcome::Collapsed { reason });
        }

        self.state.era = completed.saturating_add(1);
        self.state.logs.push(String::from("log.era.advanced"));
        log::info!("era {completed} complete");

        if self.state.era <= self.rules.final_era
            && let Some(event_id) = self.pick_event()
        {
            self.state.seen_events.insert(event_id.clone());
            self.state.phase = Phase::NarrativeEvent {
                event_id: event_id.clone(),
            };
            self.state.logs.push(String::from("log.event.open"));
            return Some(EraOutcome::NarrativeEvent { event_id });
        }
        self.state.phase = Phase::Shop;
        Some(EraOutcome::Shop)
    }

    fn pick_event(&mut self) -> Option<String> {
        let era = self.state.era;
        let candidates: Vec<&str> = self
            .catalog
            .events
            .iter()
            .filter(|event| event.fits_era(era) && !self.state.seen_events.contains(&event.id))
            .map(|event| event.id.as_str())
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let mut rng = self.state.rng.next_rng(self.state.seed, RngStream::Event);
        candidates.choose(&mut rng).map(|id| (*id).to_string())
    }

    fn check_collapse(&mut self) -> Option<DefeatReason> {
        let cause = self.state.nation.collapse_cause()?;
        let reason = DefeatReason::from(cause);
        self.state.phase = Phase::Defeat { reason };
        self.state.logs.push(String::from("log.run.collapse"));
        log::info!("nation collapsed: {reason}");
        Some(reason)
    }

    /// Apply the chosen option of the open narrative event.
    pub fn choose_event_option(&mut self, index: usize) -> bool {
        let Phase::NarrativeEvent { event_id } = &self.state.phase else {
            return false;
        };
        let Some(choice) = self
            .catalog
            .event(event_id)
            .and_then(|event| event.choices.get(index))
            .cloned()
        else {
            return false;
        };
        let effects = choice.effects;
        self.state.nation.apply_delta(&effects.stats);
        for (government, amount) in effects.affinity {
            self.increment_affinity(government, amount);
        }
        if let Some(card_id) = &effects.discover {
            self.discover(card_id);
        }
        self.state.scapegoats = self.state.scapegoats.saturating_add(effects.scapegoats);
        self.state.influence = self.state.influence.saturating_add(effects.influence);
        self.state.logs.push(String::from("log.event.resolved"));
        log::debug!("event option {index} taken: {}", choice.label);

        if self
            .state
            .nation
            .enforce_fela(self.rules.fela_threshold)
            .is_some()
        {
            self.state.logs.push(String::from("log.government.fela"));
        }
        if self.check_collapse().is_none() {
            self.state.phase = Phase::Shop;
        }
        true
    }

    fn spend(&mut self, cost: u32) -> bool {
        if self.state.phase != Phase::Shop || self.state.influence < cost {
            return false;
        }
        self.state.influence -= cost;
        true
    }

    /// Buy and equip a decree.
    pub fn buy_decree(&mut self, decree_id: &str) -> bool {
        let slots = self.rules.decree_slots.min(DECREE_SLOTS_CAP);
        if self.state.decrees.len() >= slots || self.state.decrees.iter().any(|d| d == decree_id) {
            return false;
        }
        let Some(cost) = self.catalog.decree(decree_id).map(|d| d.cost) else {
            return false;
        };
        if !self.spend(cost) {
            return false;
        }
        self.state.decrees.push(decree_id.to_string());
        self.state.logs.push(String::from("log.shop.decree"));
        log::debug!("equipped decree {decree_id}");
        true
    }

    pub fn buy_consumable(&mut self, consumable_id: &str) -> bool {
        if self.state.consumables.len() >= self.rules.consumable_slots {
            return false;
        }
        let Some(cost) = self.catalog.consumable(consumable_id).map(|c| c.cost) else {
            return false;
        };
        if !self.spend(cost) {
            return false;
        }
        self.state.consumables.push(consumable_id.to_string());
        self.state.logs.push(String::from("log.shop.consumable"));
        true
    }

    /// Buy a purchasable card into the deck.
    pub fn buy_card(&mut self, card_id: &str) -> bool {
        let Some(card) = self.catalog.card(card_id).filter(|c| !c.discovery) else {
            return false;
        };
        let Some(cost) = card.cost else {
            return false;
        };
        let card = card.clone();
        if !self.spend(cost) {
            return false;
        }
        self.state.supply.add_card(card);
        self.state.logs.push(String::from("log.shop.card"));
        log::debug!("bought card {card_id}");
        true
    }

    /// Raise an intent one level; costs the upgrade rate times the current level.
    pub fn upgrade_intent(&mut self, intent_id: &str) -> bool {
        if self.catalog.intent(intent_id).is_none() {
            return false;
        }
        let level = self.state.intent_level(intent_id);
        let cost = self.rules.intent_upgrade_cost.saturating_mul(level);
        if !self.spend(cost) {
            return false;
        }
        self.state
            .intent_levels
            .insert(intent_id.to_string(), level + 1);
        self.state.logs.push(String::from("log.shop.intent"));
        true
    }

    /// Leave the shop for the next crisis, or win once every era is done.
    pub fn leave_shop(&mut self) -> bool {
        if self.state.phase != Phase::Shop {
            return false;
        }
        let state = &mut self.state;
        if state.era > self.rules.final_era {
            state.phase = Phase::Victory;
            state.logs.push(String::from("log.run.victory"));
            log::info!("run won with total score {}", state.crisis.total_score);
            return true;
        }
        let next_index = if state.era == state.crisis.era {
            state.crisis.crisis_index.saturating_add(1)
        } else {
            0
        };
        let schedule = schedule_for(&self.catalog, state.era);
        state.crisis = CrisisState::build(
            &schedule,
            next_index,
            &self.rules,
            state.crisis.lives,
            state.crisis.hand_size,
            state.crisis.total_score,
        );
        state.phase = Phase::CrisisStart;
        true
    }

    /// Adjust a government affinity and reclassify the nation.
    pub fn increment_affinity(&mut self, government: Government, amount: i32) -> Option<Government> {
        let changed = self.state.affinities.increment(
            &mut self.state.nation,
            government,
            amount,
            self.rules.affinity_thresholds(),
        );
        if changed.is_some() {
            self.state.logs.push(String::from("log.government.changed"));
        }
        changed
    }

    pub fn take_pending_transition(&mut self) -> Option<Government> {
        self.state.nation.take_pending_transition()
    }

    /// Narration input for a committed weave.
    #[must_use]
    pub fn narration_request(&self, outcome: &WeaveOutcome) -> NarrationRequest {
        NarrationRequest {
            intent: outcome.intent.clone(),
            cards: outcome.cards.clone(),
            nation: self.state.nation.clone(),
            score: outcome.breakdown.final_score,
        }
    }
}

fn schedule_for(catalog: &Catalog, era: u8) -> EraSchedule {
    catalog.era(era).copied().unwrap_or_else(|| {
        log::warn!("era {era} missing from schedule; using fallback target");
        EraSchedule {
            era,
            base_target: FALLBACK_BASE_TARGET.saturating_mul(i64::from(era)),
            boss_modifier: BossModifier::NarrativeCap,
        }
    })
}
