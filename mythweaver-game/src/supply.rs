//! Card supply: deck, hand, discard pile, selection and the discovered set.
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

use crate::catalog::{Card, Catalog};

/// Maximum number of concurrently selected cards.
pub const SELECTION_CAP: usize = 3;

/// Selected cards, stored inline.
pub type Selection = SmallVec<[Card; SELECTION_CAP]>;

/// Result of a discovery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discovery {
    NewlyDiscovered,
    AlreadyKnown,
    /// The id is not in the catalog; nothing happened.
    UnknownCard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Supply {
    /// Draw order runs front to back.
    pub deck: Vec<Card>,
    pub hand: Vec<Card>,
    pub discard: Vec<Card>,
    #[serde(default)]
    pub selection: Selection,
    #[serde(default)]
    pub discovered: BTreeSet<String>,
}

impl Supply {
    #[must_use]
    pub fn new(deck: Vec<Card>) -> Self {
        Self {
            deck,
            ..Self::default()
        }
    }

    pub fn shuffle_deck<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.deck.shuffle(rng);
    }

    /// Move up to `n` cards from deck to hand.
    ///
    /// When the deck is short, the discard pile is shuffled onto the end of the deck first,
    /// even if that still cannot cover `n`. Returns the number of cards drawn.
    pub fn draw<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> usize {
        if self.deck.len() < n && !self.discard.is_empty() {
            let mut recycled = std::mem::take(&mut self.discard);
            recycled.shuffle(rng);
            log::debug!("reshuffled {} discarded cards into the deck", recycled.len());
            self.deck.extend(recycled);
        }
        let take = n.min(self.deck.len());
        self.hand.extend(self.deck.drain(..take));
        take
    }

    /// Draw until the hand holds `hand_size` cards (or supply runs dry).
    pub fn fill_hand<R: Rng + ?Sized>(&mut self, hand_size: usize, rng: &mut R) -> usize {
        let missing = hand_size.saturating_sub(self.hand.len());
        self.draw(missing, rng)
    }

    /// Move a card from hand into the selection.
    ///
    /// No-op when the selection is full, the card is already selected, or it is not in hand.
    pub fn select(&mut self, card_id: &str) -> bool {
        if self.selection.len() >= SELECTION_CAP || self.is_selected(card_id) {
            return false;
        }
        let Some(pos) = self.hand.iter().position(|c| c.id == card_id) else {
            return false;
        };
        let card = self.hand.remove(pos);
        self.selection.push(card);
        true
    }

    /// Return a selected card to hand.
    pub fn deselect(&mut self, card_id: &str) -> bool {
        let Some(pos) = self.selection.iter().position(|c| c.id == card_id) else {
            return false;
        };
        let card = self.selection.remove(pos);
        self.hand.push(card);
        true
    }

    #[must_use]
    pub fn is_selected(&self, card_id: &str) -> bool {
        self.selection.iter().any(|c| c.id == card_id)
    }

    /// Move the whole selection to the discard pile; returns how many cards moved.
    pub fn discard_selected(&mut self) -> usize {
        let count = self.selection.len();
        self.discard.extend(self.selection.drain(..));
        count
    }

    /// Return the selection to hand unconsumed.
    pub fn clear_selection(&mut self) {
        self.hand.extend(self.selection.drain(..));
    }

    /// Grant a catalog card into hand, at most once per run.
    pub fn discover(&mut self, card_id: &str, catalog: &Catalog) -> Discovery {
        if self.discovered.contains(card_id) {
            return Discovery::AlreadyKnown;
        }
        let Some(card) = catalog.card(card_id) else {
            log::warn!("discovery of unknown card `{card_id}` skipped");
            return Discovery::UnknownCard;
        };
        self.discovered.insert(card_id.to_string());
        self.hand.push(card.clone());
        log::debug!("discovered card {card_id}");
        Discovery::NewlyDiscovered
    }

    /// Introduce an awarded or purchased card at the bottom of the deck.
    pub fn add_card(&mut self, card: Card) {
        self.deck.push(card);
    }

    /// Gather selection, hand and discard back into the deck (no shuffle).
    pub fn recall_all(&mut self) {
        self.deck.extend(self.selection.drain(..));
        self.deck.append(&mut self.hand);
        self.deck.append(&mut self.discard);
    }

    #[must_use]
    pub fn total_cards(&self) -> usize {
        self.deck.len() + self.hand.len() + self.discard.len() + self.selection.len()
    }

    /// Sorted identities across every container; equal multisets compare equal.
    #[must_use]
    pub fn card_multiset(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .deck
            .iter()
            .chain(&self.hand)
            .chain(&self.discard)
            .chain(self.selection.iter())
            .map(|c| c.id.clone())
            .collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn selected_ids(&self) -> Vec<&str> {
        self.selection.iter().map(|c| c.id.as_str()).collect()
    }
}
