//! Combo detection over the selected cards.
use crate::catalog::ComboFormula;
use crate::scoring::ScoringBreakdown;

/// First formula, in declaration order, whose required cards are all selected.
///
/// Extra selected cards do not prevent a match. Formulas with no required cards never match.
#[must_use]
pub fn find_matching_combo<'a, S: AsRef<str>>(
    combos: &'a [ComboFormula],
    selected_ids: &[S],
) -> Option<&'a ComboFormula> {
    combos.iter().find(|combo| {
        !combo.cards.is_empty()
            && combo
                .cards
                .iter()
                .all(|required| selected_ids.iter().any(|id| id.as_ref() == required))
    })
}

/// Append the combo step and recompute the final values.
pub fn apply_combo_bonus(
    breakdown: &mut ScoringBreakdown,
    combo: &ComboFormula,
    matched_card_count: usize,
) {
    breakdown.push_add(
        format!("Combo: {} ({matched_card_count} cards)", combo.name),
        combo.bonus_nf,
        combo.bonus_pl,
    );
    breakdown.finalize();
    log::debug!(
        "combo {} matched with {matched_card_count} cards, score now {}",
        combo.id,
        breakdown.final_score
    );
}
