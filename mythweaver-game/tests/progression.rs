use mythweaver_game::{
    Catalog, CrisisResolution, CrisisType, DefeatReason, EraOutcome, GameSession, Government,
    Phase, RulesConfig,
};

fn new_session(seed: u64) -> GameSession {
    GameSession::new(seed, Catalog::load_from_static(), RulesConfig::default())
}

/// Select up to three cards with the highest narrative potential.
fn select_best(session: &mut GameSession) {
    let mut hand = session.state().supply.hand.clone();
    hand.sort_by(|a, b| b.narrative_potential.cmp(&a.narrative_potential));
    for card in hand.iter().take(3) {
        session.select(&card.id);
    }
}

fn best_intent(session: &GameSession) -> Option<String> {
    let mut intents = session.catalog().intents.clone();
    intents.sort_by(|a, b| b.base_nf.total_cmp(&a.base_nf));
    intents
        .into_iter()
        .find(|intent| session.can_weave(&intent.id))
        .map(|intent| intent.id)
}

fn step(session: &mut GameSession) {
    match session.state().phase.clone() {
        Phase::CrisisStart => assert!(session.start_crisis()),
        Phase::Weave => {
            select_best(session);
            let intent = best_intent(session).expect("an intent fits three cards");
            assert!(session.weave(&intent).is_some());
        }
        Phase::CrisisEnd => assert!(session.resolve_crisis().is_some()),
        Phase::EraTransition => assert!(session.advance_era().is_some()),
        Phase::NarrativeEvent { .. } => assert!(session.choose_event_option(0)),
        Phase::Shop => {
            let affordable: Vec<String> = session
                .catalog()
                .decrees
                .iter()
                .filter(|d| d.cost <= session.state().influence)
                .map(|d| d.id.clone())
                .collect();
            for id in affordable {
                if session.buy_decree(&id) {
                    break;
                }
            }
            assert!(session.leave_shop());
        }
        Phase::Victory | Phase::Defeat { .. } => {}
    }
}

#[test]
fn greedy_runs_terminate_and_hold_invariants() {
    for seed in [1_u64, 7, 42, 1337, 9001] {
        let mut session = new_session(seed);
        let mut last_total = 0;
        for _ in 0..5_000 {
            if session.state().is_over() {
                break;
            }
            step(&mut session);
            let state = session.state();
            assert!(state.crisis.total_score >= last_total, "seed {seed}");
            last_total = state.crisis.total_score;
            assert!(state.crisis.lives <= 3);
            assert!(state.crisis.round_score >= 0);
            assert!(state.supply.selection.len() <= 3);
            assert!(state.decrees.len() <= 5);
        }
        assert!(session.state().is_over(), "seed {seed} never finished");
    }
}

#[test]
fn card_count_tracks_purchases_and_discoveries() {
    let mut session = new_session(3);
    let start = session.state().supply.total_cards();
    session.start_crisis();
    select_best(&mut session);
    session.discard_selection();
    assert_eq!(session.state().supply.total_cards(), start);

    session.with_state_mut(|state| {
        state.phase = Phase::Shop;
        state.influence = 10;
    });
    assert!(session.buy_card("iron_chariot"));
    session.discover("founding_epic");
    session.discover("founding_epic");
    assert_eq!(session.state().supply.total_cards(), start + 2);
}

#[test]
fn guard_rejections_leave_crisis_untouched() {
    let mut session = new_session(8);
    session.start_crisis();
    session.with_state_mut(|state| state.crisis.weaves_remaining = 0);
    select_best(&mut session);
    let before = session.state().clone();
    assert!(session.weave("propaganda").is_none());
    assert_eq!(session.state(), &before);
}

#[test]
fn final_boss_leads_to_victory() {
    let mut session = new_session(21);
    session.with_state_mut(|state| {
        state.era = 5;
        state.crisis.era = 5;
        state.crisis.crisis_index = 2;
        state.crisis.crisis_type = CrisisType::Boss;
        state.crisis.target_score = 10;
        state.crisis.record_score(25);
        state.phase = Phase::CrisisEnd;
    });
    assert_eq!(
        session.resolve_crisis(),
        Some(CrisisResolution::Cleared {
            influence: 10,
            era_complete: true
        })
    );
    assert_eq!(session.state().phase, Phase::EraTransition);
    assert_eq!(session.advance_era(), Some(EraOutcome::Shop));
    assert_eq!(session.state().era, 6);
    assert!(session.leave_shop());
    assert_eq!(session.state().phase, Phase::Victory);
    assert!(!session.start_crisis());
}

#[test]
fn collapsed_nation_turns_fela_before_dying() {
    let mut session = new_session(2);
    session.with_state_mut(|state| {
        state.nation.stats.narrative_integrity = 10;
        state.nation.stats.violence_authority = 5;
        state.nation.stats.supply_level = 10;
    });
    assert_eq!(
        session.increment_affinity(Government::Warlord, 60),
        Some(Government::Fela)
    );
    assert_eq!(session.state().nation.government, Government::Fela);

    session.with_state_mut(|state| state.phase = Phase::EraTransition);
    assert_eq!(
        session.advance_era(),
        Some(EraOutcome::Collapsed {
            reason: DefeatReason::Riot
        })
    );
}
