use mythweaver_game::{
    AsyncNarrator, Catalog, CrisisResolution, GameSession, NarrationError, NarrationRequest,
    Phase, RulesConfig, SELECTION_CAP, WeaveOutcome, narrate_with_timeout,
};
use serde::Serialize;
use std::time::Duration;

const STEP_LIMIT: usize = 10_000;
const NARRATION_TIMEOUT: Duration = Duration::from_millis(50);

/// Narrator whose transport is never reachable; every call exercises the fallback.
pub struct UnreachableNarrator;

impl AsyncNarrator for UnreachableNarrator {
    async fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrationError> {
        Err(NarrationError::Unavailable(
            "no narration service configured".to_string(),
        ))
    }
}

/// Summary of one automated run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub seed: u64,
    pub outcome: String,
    pub era_reached: u8,
    pub crises_cleared: u32,
    pub total_score: i64,
    pub government: String,
    pub weaves: u32,
    pub myths: usize,
    pub narrations: usize,
    pub violations: Vec<String>,
}

impl RunSummary {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    #[must_use]
    pub fn won(&self) -> bool {
        self.outcome == "victory"
    }
}

/// Greedy player: strongest cards, strongest eligible intent, first event choice,
/// first affordable decree.
pub struct Autoplayer {
    session: GameSession,
    narrate: bool,
    purchased_cards: usize,
    starting_cards: usize,
    crises_cleared: u32,
    narrations: usize,
    last_total: i64,
    violations: Vec<String>,
}

impl Autoplayer {
    #[must_use]
    pub fn new(seed: u64, catalog: Catalog, rules: RulesConfig, narrate: bool) -> Self {
        let session = GameSession::new(seed, catalog, rules);
        let starting_cards = session.state().supply.total_cards();
        Self {
            session,
            narrate,
            purchased_cards: 0,
            starting_cards,
            crises_cleared: 0,
            narrations: 0,
            last_total: 0,
            violations: Vec::new(),
        }
    }

    pub async fn play(mut self) -> RunSummary {
        let mut steps = 0;
        while !self.session.state().is_over() {
            if steps >= STEP_LIMIT {
                self.violations
                    .push(format!("run did not finish within {STEP_LIMIT} steps"));
                break;
            }
            steps += 1;
            if !self.step().await {
                self.violations.push(format!(
                    "no legal action in phase {:?}",
                    self.session.state().phase
                ));
                break;
            }
            self.check_invariants();
        }
        self.summary()
    }

    async fn step(&mut self) -> bool {
        match self.session.state().phase.clone() {
            Phase::CrisisStart => self.session.start_crisis(),
            Phase::Weave => self.weave().await,
            Phase::CrisisEnd => {
                let resolution = self.session.resolve_crisis();
                if matches!(resolution, Some(CrisisResolution::Cleared { .. })) {
                    self.crises_cleared += 1;
                }
                resolution.is_some()
            }
            Phase::EraTransition => self.session.advance_era().is_some(),
            Phase::NarrativeEvent { .. } => self.session.choose_event_option(0),
            Phase::Shop => {
                self.shop();
                self.session.leave_shop()
            }
            Phase::Victory | Phase::Defeat { .. } => false,
        }
    }

    async fn weave(&mut self) -> bool {
        let mut hand = self.session.state().supply.hand.clone();
        hand.sort_by(|a, b| b.narrative_potential.cmp(&a.narrative_potential));
        for card in hand.iter().take(SELECTION_CAP) {
            self.session.select(&card.id);
        }
        let mut intents = self.session.catalog().intents.clone();
        intents.sort_by(|a, b| b.base_nf.total_cmp(&a.base_nf));
        let Some(intent) = intents
            .iter()
            .find(|intent| self.session.can_weave(&intent.id))
        else {
            return false;
        };
        let Some(outcome) = self.session.weave(&intent.id) else {
            return false;
        };
        if self.narrate {
            self.narrate_weave(&outcome).await;
        }
        true
    }

    async fn narrate_weave(&mut self, outcome: &WeaveOutcome) {
        let request = self.session.narration_request(outcome);
        let narration =
            narrate_with_timeout(&UnreachableNarrator, &request, NARRATION_TIMEOUT).await;
        log::debug!("{}: {}", narration.title, narration.story_text);
        self.narrations += 1;
    }

    fn shop(&mut self) {
        let influence = self.session.state().influence;
        let affordable: Vec<String> = self
            .session
            .catalog()
            .decrees
            .iter()
            .filter(|decree| decree.cost <= influence)
            .map(|decree| decree.id.clone())
            .collect();
        for id in affordable {
            if self.session.buy_decree(&id) {
                return;
            }
        }
        let cards: Vec<String> = self
            .session
            .catalog()
            .cards
            .iter()
            .filter(|card| card.cost.is_some_and(|cost| cost <= influence) && !card.discovery)
            .map(|card| card.id.clone())
            .collect();
        if let Some(id) = cards.first()
            && self.session.buy_card(id)
        {
            self.purchased_cards += 1;
        }
    }

    fn check_invariants(&mut self) {
        let state = self.session.state();
        if state.crisis.total_score < self.last_total {
            self.violations.push(format!(
                "total score fell from {} to {}",
                self.last_total, state.crisis.total_score
            ));
        }
        self.last_total = state.crisis.total_score;
        if state.crisis.lives > 3 {
            self.violations
                .push(format!("lives exceeded cap: {}", state.crisis.lives));
        }
        let expected =
            self.starting_cards + self.purchased_cards + state.supply.discovered.len();
        let actual = state.supply.total_cards();
        if actual != expected {
            self.violations
                .push(format!("card count {actual} differs from expected {expected}"));
        }
    }

    fn summary(self) -> RunSummary {
        let state = self.session.into_state();
        let outcome = match &state.phase {
            Phase::Victory => "victory".to_string(),
            Phase::Defeat { reason } => format!("defeat: {reason}"),
            _ => "unfinished".to_string(),
        };
        RunSummary {
            seed: state.seed,
            outcome,
            era_reached: state.crisis.era,
            crises_cleared: self.crises_cleared,
            total_score: state.crisis.total_score,
            government: state.nation.government.to_string(),
            weaves: state.weaves_spent,
            myths: state.myths.len(),
            narrations: self.narrations,
            violations: self.violations,
        }
    }
}
