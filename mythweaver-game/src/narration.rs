//! Cosmetic narration of committed weaves.
//!
//! An external narrator may decorate a weave with a title and story. It runs after the weave
//! is committed, and any failure falls back to a local, deterministic template narrator
//! with the same output shape.
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use thiserror::Error;
use twox_hash::XxHash64;

use crate::catalog::{Card, Intent};
use crate::government::{NationState, StatsDelta};

/// What the narrator is told about a weave.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrationRequest {
    pub intent: Intent,
    pub cards: Vec<Card>,
    pub nation: NationState,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Narration {
    pub title: String,
    pub story_text: String,
    #[serde(default)]
    pub stats_change: Option<StatsDelta>,
}

#[derive(Debug, Error)]
pub enum NarrationError {
    #[error("narrator unavailable: {0}")]
    Unavailable(String),
    #[error("narrator timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("narration payload is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("narration payload has an empty {0}")]
    Blank(&'static str),
}

/// External text generator returning a raw JSON payload.
pub trait Narrator {
    /// # Errors
    ///
    /// Returns an error if the narrator cannot be reached or refuses the request.
    fn narrate(&self, request: &NarrationRequest) -> Result<String, NarrationError>;
}

/// Parse a narrator payload of the form `{title, story_text, stats_change?}`.
///
/// # Errors
///
/// Returns an error for invalid JSON or a blank title or story.
pub fn parse_narration(raw: &str) -> Result<Narration, NarrationError> {
    let narration: Narration = serde_json::from_str(raw)?;
    if narration.title.trim().is_empty() {
        return Err(NarrationError::Blank("title"));
    }
    if narration.story_text.trim().is_empty() {
        return Err(NarrationError::Blank("story_text"));
    }
    Ok(narration)
}

/// Ask the narrator, substituting the local template on any failure.
pub fn narrate_or_fallback<N>(narrator: &N, request: &NarrationRequest) -> Narration
where
    N: Narrator + ?Sized,
{
    match narrator
        .narrate(request)
        .and_then(|raw| parse_narration(&raw))
    {
        Ok(narration) => narration,
        Err(err) => {
            log::warn!("narration fell back to local template: {err}");
            fallback_narration(request)
        }
    }
}

const TEMPLATES: &[(&str, &str)] = &[
    (
        "The {intent} of the {card}",
        "Under the {government} banner, {cards} were bound into one telling. The crowd remembered {score} of its words.",
    ),
    (
        "A Song of {card}",
        "Criers carried {cards} from hearth to hearth. The {government} court counted {score} converts by dusk.",
    ),
    (
        "{card} Remembered",
        "The scribes of the {government} wove {cards} into the {intent}. Its weight was reckoned at {score}.",
    ),
    (
        "When the {card} Spoke",
        "No one recalls who first told of {cards}, only that the {government} profited. The {intent} earned {score}.",
    ),
];

/// Deterministic local narration; a pure function of the request.
#[must_use]
pub fn fallback_narration(request: &NarrationRequest) -> Narration {
    let mut hasher = XxHash64::with_seed(0);
    for card in &request.cards {
        hasher.write(card.id.as_bytes());
        hasher.write_u8(0);
    }
    hasher.write(request.intent.id.as_bytes());
    let pick = usize::try_from(hasher.finish() % TEMPLATES.len() as u64).unwrap_or_default();
    let (title, story) = TEMPLATES[pick];

    let lead = request
        .cards
        .first()
        .map_or("Nameless Thing", |card| card.name.as_str());
    let cards = request
        .cards
        .iter()
        .map(|card| card.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let fill = |template: &str| {
        template
            .replace("{intent}", &request.intent.name)
            .replace("{card}", lead)
            .replace("{cards}", &cards)
            .replace("{government}", request.nation.government.as_str())
            .replace("{score}", &request.score.to_string())
    };
    Narration {
        title: fill(title),
        story_text: fill(story),
        stats_change: None,
    }
}

#[cfg(feature = "async")]
pub use self::async_narration::{AsyncNarrator, narrate_with_timeout};

#[cfg(feature = "async")]
mod async_narration {
    use super::{
        Narration, NarrationError, NarrationRequest, fallback_narration, parse_narration,
    };
    use std::future::Future;
    use std::time::Duration;

    /// Narrator reached over an asynchronous transport.
    pub trait AsyncNarrator {
        fn narrate(
            &self,
            request: &NarrationRequest,
        ) -> impl Future<Output = Result<String, NarrationError>>;
    }

    /// Await the narrator for at most `timeout`, falling back on expiry or failure.
    pub async fn narrate_with_timeout<N>(
        narrator: &N,
        request: &NarrationRequest,
        timeout: Duration,
    ) -> Narration
    where
        N: AsyncNarrator + ?Sized,
    {
        let result = match tokio::time::timeout(timeout, narrator.narrate(request)).await {
            Ok(result) => result.and_then(|raw| parse_narration(&raw)),
            Err(_) => Err(NarrationError::Timeout(timeout)),
        };
        result.unwrap_or_else(|err| {
            log::warn!("async narration fell back to local template: {err}");
            fallback_narration(request)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    struct Scripted(Result<&'static str, &'static str>);

    impl Narrator for Scripted {
        fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrationError> {
            self.0
                .map(str::to_string)
                .map_err(|msg| NarrationError::Unavailable(msg.to_string()))
        }
    }

    fn request() -> NarrationRequest {
        let catalog = Catalog::load_from_static();
        NarrationRequest {
            intent: catalog.intent("sermon").unwrap().clone(),
            cards: vec![
                catalog.card("clay_idol").unwrap().clone(),
                catalog.card("ritual_drum").unwrap().clone(),
            ],
            nation: NationState::default(),
            score: 512,
        }
    }

    #[test]
    fn well_formed_payload_is_used() {
        let narrator = Scripted(Ok(
            r#"{"title":"Drums","story_text":"They danced.","stats_change":{"sanity":3}}"#,
        ));
        let narration = narrate_or_fallback(&narrator, &request());
        assert_eq!(narration.title, "Drums");
        assert_eq!(narration.stats_change.unwrap().sanity, 3);
    }

    #[test]
    fn failures_fall_back_to_template() {
        let expected = fallback_narration(&request());
        for narrator in [
            Scripted(Err("offline")),
            Scripted(Ok("not json")),
            Scripted(Ok(r#"{"title":" ","story_text":"x"}"#)),
        ] {
            assert_eq!(narrate_or_fallback(&narrator, &request()), expected);
        }
    }

    #[test]
    fn fallback_is_deterministic_and_filled() {
        let req = request();
        let a = fallback_narration(&req);
        assert_eq!(a, fallback_narration(&req));
        assert!(!a.title.contains('{'));
        assert!(!a.story_text.contains('{'));
        assert!(a.story_text.contains(&req.cards[1].name));
        assert!(a.stats_change.is_none());
    }

    #[test]
    fn fallback_handles_empty_selection() {
        let mut req = request();
        req.cards.clear();
        let narration = fallback_narration(&req);
        assert!(!narration.title.is_empty());
    }

    #[cfg(feature = "async")]
    mod async_tests {
        use super::*;
        use std::time::Duration;

        struct Slow;

        impl AsyncNarrator for Slow {
            async fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrationError> {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(r#"{"title":"late","story_text":"late"}"#.to_string())
            }
        }

        struct Quick;

        impl AsyncNarrator for Quick {
            async fn narrate(&self, _request: &NarrationRequest) -> Result<String, NarrationError> {
                Ok(r#"{"title":"On time","story_text":"Arrived."}"#.to_string())
            }
        }

        #[tokio::test]
        async fn timeout_falls_back() {
            let req = request();
            let narration = narrate_with_timeout(&Slow, &req, Duration::from_millis(10)).await;
            assert_eq!(narration, fallback_narration(&req));
        }

        #[tokio::test]
        async fn prompt_narrator_is_used() {
            let narration =
                narrate_with_timeout(&Quick, &request(), Duration::from_secs(1)).await;
            assert_eq!(narration.title, "On time");
        }
    }
}
