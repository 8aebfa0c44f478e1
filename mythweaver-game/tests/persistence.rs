use mythweaver_game::{Catalog, GameSession, GameState, Government, Phase, RulesConfig};

fn advanced_session() -> GameSession {
    let mut session = GameSession::new(77, Catalog::load_from_static(), RulesConfig::default());
    session.start_crisis();
    let ids: Vec<String> = session.state().supply.hand[..2]
        .iter()
        .map(|c| c.id.clone())
        .collect();
    for id in &ids {
        session.select(id);
    }
    session.weave("census");
    session.discover("prophet_scroll");
    session.increment_affinity(Government::Tribal, 55);
    session.with_state_mut(|state| {
        state.decrees.push("assembly".to_string());
        state.consumables.push("festival".to_string());
        state.intent_levels.insert("sermon".to_string(), 3);
    });
    session
}

#[test]
fn game_state_round_trips_through_json() {
    let session = advanced_session();
    let json = serde_json::to_string_pretty(session.state()).unwrap();
    let restored: GameState = serde_json::from_str(&json).unwrap();
    assert_eq!(&restored, session.state());
    assert!(restored.supply.discovered.contains("prophet_scroll"));
    assert_eq!(restored.nation.government, Government::Tribal);
    assert_eq!(restored.affinities.get(Government::Tribal), 55);
    assert_eq!(restored.intent_level("sermon"), 3);
}

#[test]
fn restored_session_replays_identically() {
    let mut original = advanced_session();
    let json = serde_json::to_string(original.state()).unwrap();
    let state: GameState = serde_json::from_str(&json).unwrap();
    let mut restored =
        GameSession::from_state(state, Catalog::load_from_static(), RulesConfig::default());

    for session in [&mut original, &mut restored] {
        if session.state().phase == Phase::Weave {
            let id = session.state().supply.hand[0].id.clone();
            session.select(&id);
            session.discard_selection();
            let id = session.state().supply.hand[0].id.clone();
            session.select(&id);
            session.weave("propaganda");
        }
    }
    assert_eq!(original.state(), restored.state());
}

#[test]
fn sparse_saves_fill_defaults() {
    let session = advanced_session();
    let mut value = serde_json::to_value(session.state()).unwrap();
    let object = value.as_object_mut().unwrap();
    object.remove("logs");
    object.remove("rng");
    object.remove("myths");
    let restored: GameState = serde_json::from_value(value).unwrap();
    assert!(restored.logs.is_empty());
    assert_eq!(restored.rng.deck, 0);
    assert_eq!(restored.crisis, session.state().crisis);
}
