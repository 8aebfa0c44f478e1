use mythweaver_game::{
    BossModifier, Card, Catalog, Decree, Enhancement, Government, Rarity, ScoringInput,
    apply_combo_bonus, compute_score, find_matching_combo, numbers::floor_f64_to_i64,
};

fn catalog() -> Catalog {
    Catalog::load_from_static()
}

fn plain_card(id: &str, potential: i32, tags: &[&str]) -> Card {
    Card {
        id: id.to_string(),
        name: id.to_string(),
        text: String::new(),
        tags: tags.iter().map(ToString::to_string).collect(),
        physical_value: 0,
        narrative_potential: potential,
        rarity: Rarity::Common,
        enhancement: Enhancement::None,
        cost: None,
        discovery: false,
    }
}

fn base_input<'a>(catalog: &'a Catalog, cards: &'a [Card], decrees: &'a [Decree]) -> ScoringInput<'a> {
    ScoringInput {
        intent: catalog.intent("propaganda").unwrap(),
        level: 1,
        cards,
        decrees,
        government: Government::Undefined,
        myth_density: 0,
        myth_count: 0,
        scapegoats: 0,
        era: 1,
        boss_modifier: None,
    }
}

#[test]
fn propaganda_single_card_scores_142() {
    let catalog = catalog();
    let cards = [plain_card("pamphlet", 75, &["trade"])];
    let breakdown = compute_score(&base_input(&catalog, &cards, &[]));
    assert!((breakdown.final_nf - 95.0).abs() < 1e-9);
    assert!((breakdown.final_pl - 1.5).abs() < 1e-9);
    assert_eq!(breakdown.final_score, 142);
}

#[test]
fn propaganda_shared_group_pair_scores_616() {
    let catalog = catalog();
    let cards = [
        plain_card("idol", 75, &["myth"]),
        plain_card("chant", 90, &["ritual"]),
    ];
    let breakdown = compute_score(&base_input(&catalog, &cards, &[]));
    assert!(breakdown.raw_nf >= 210.0);
    assert!((breakdown.final_pl - 2.8).abs() < 1e-9);
    assert_eq!(
        breakdown.final_score,
        floor_f64_to_i64(breakdown.raw_nf * breakdown.raw_pl)
    );
    assert_eq!(breakdown.final_score, 616);
}

#[test]
fn scoring_is_pure() {
    let catalog = catalog();
    let cards: Vec<Card> = ["war_mask", "blood_oath", "king_list"]
        .iter()
        .map(|id| catalog.card(id).unwrap().clone())
        .collect();
    let decrees = catalog.resolve_decrees(&[
        "iron_fist".to_string(),
        "chroniclers".to_string(),
        "oral_tradition".to_string(),
    ]);
    let mut input = base_input(&catalog, &cards, &decrees);
    input.government = Government::Warlord;
    input.myth_density = 30;
    input.boss_modifier = Some(BossModifier::FelaDecay);
    let first = compute_score(&input);
    let second = compute_score(&input);
    assert_eq!(first, second);
    assert_eq!(
        first.final_score,
        floor_f64_to_i64(first.raw_nf * first.raw_pl)
    );
}

#[test]
fn catalog_combo_extends_breakdown() {
    let catalog = catalog();
    let cards: Vec<Card> = ["grain_sack", "clay_idol", "salt_road"]
        .iter()
        .map(|id| catalog.card(id).unwrap().clone())
        .collect();
    let mut breakdown = compute_score(&base_input(&catalog, &cards, &[]));
    let before_steps = breakdown.steps.len();
    let before_score = breakdown.final_score;

    let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
    let combo = find_matching_combo(&catalog.combos, &ids).unwrap();
    assert_eq!(combo.id, "first_harvest_rite");
    apply_combo_bonus(&mut breakdown, combo, combo.cards.len());

    assert_eq!(breakdown.steps.len(), before_steps + 1);
    assert!(breakdown.final_score > before_score);
    let last = breakdown.steps.last().unwrap();
    assert!((last.nf_delta - combo.bonus_nf).abs() < 1e-9);
    assert!((last.nf_total - breakdown.raw_nf).abs() < 1e-9);
}

#[test]
fn boss_modifiers_reduce_score() {
    let catalog = catalog();
    let cards: Vec<Card> = ["grain_sack", "smoked_fish"]
        .iter()
        .map(|id| catalog.card(id).unwrap().clone())
        .collect();
    let normal = compute_score(&base_input(&catalog, &cards, &[]));
    let mut starving = base_input(&catalog, &cards, &[]);
    starving.boss_modifier = Some(BossModifier::NoFoodCards);
    let starved = compute_score(&starving);
    assert!(starved.final_score < normal.final_score);
    assert!((normal.raw_nf - starved.raw_nf - 52.0).abs() < 1e-9);
}
