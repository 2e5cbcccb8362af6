//! Extension projections.
//!
//! Each projection is a typed, editable view of one extension attached to a
//! lock. It starts enabled when the lock carries the extension, tracks its
//! own modified flag, and transcodes back to an [`ExtensionConfigDto`] for the
//! extensions edit. Setters only mark the projection modified while it is
//! enabled; toggling `set_enabled` always does.

use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use tracing::error;

use lks_schemas::{ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, Lock};

mod dice;
mod guess_timer;
mod hygiene;
mod penalties;
mod pillory;
mod random_events;
mod share_link;
mod tasks;
mod verification;
mod wheel;

pub use dice::Dice;
pub use guess_timer::GuessTheTimer;
pub use hygiene::HygieneOpening;
pub use penalties::{
    FrequencyPenalty, Penalties, PenaltyActions, PenaltyTimeLimit, TimeLimitPenalty,
};
pub use pillory::{Pillory, PILLORY_MAX_SECS, PILLORY_MIN_SECS};
pub use random_events::RandomEvents;
pub use share_link::ShareLink;
pub use tasks::Tasks;
pub use verification::VerificationPicture;
pub use wheel::{WheelOfFortune, WheelSegment};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionState {
    id: Option<String>,
    enabled: bool,
    modified: bool,
}

impl ExtensionState {
    fn from_party(party: Option<&ExtensionParty>) -> Self {
        Self {
            id: party.map(|p| p.id.clone()),
            enabled: party.is_some(),
            modified: false,
        }
    }

    /// Mark modified if enabled.
    pub(crate) fn touch(&mut self) {
        if self.enabled {
            self.modified = true;
        }
    }
}

pub trait Extension {
    const SLUG: ExtensionSlug;

    fn state(&self) -> &ExtensionState;

    fn state_mut(&mut self) -> &mut ExtensionState;

    fn to_config(&self) -> ExtensionConfigDto;

    /// Remote id of the attached extension, if the lock carries it.
    fn id(&self) -> Option<&str> {
        self.state().id.as_deref()
    }

    fn is_enabled(&self) -> bool {
        self.state().enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        let s = self.state_mut();
        if s.enabled != enabled {
            s.enabled = enabled;
            s.modified = true;
        }
    }

    fn is_modified(&self) -> bool {
        self.state().modified
    }
}

fn secs(v: i64) -> Duration {
    Duration::seconds(v)
}

fn dto<C: Serialize>(
    slug: ExtensionSlug,
    mode: ExtensionMode,
    regularity: i64,
    config: &C,
) -> ExtensionConfigDto {
    let config = match serde_json::to_value(config) {
        Ok(v) => v,
        Err(err) => {
            error!(slug = slug.as_str(), error = %err, "extensions/config-encode-failed");
            Value::Null
        }
    };
    ExtensionConfigDto {
        slug: slug.as_str().to_string(),
        config,
        mode,
        regularity,
    }
}

// ---------------------------------------------------------------------------
// All projections of one lock
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Extensions {
    pub dice: Dice,
    pub guess_timer: GuessTheTimer,
    pub hygiene_opening: HygieneOpening,
    pub pillory: Pillory,
    pub random_events: RandomEvents,
    pub share_link: ShareLink,
    pub wheel_of_fortune: WheelOfFortune,
    pub verification_picture: VerificationPicture,
    pub tasks: Tasks,
    pub penalties: Penalties,
}

impl Extensions {
    pub fn from_lock(lock: &Lock) -> Self {
        let party = move |slug: ExtensionSlug| lock.extension(slug.as_str());
        Self {
            dice: Dice::from_party(party(ExtensionSlug::Dice)),
            guess_timer: GuessTheTimer::from_party(party(ExtensionSlug::GuessTheTimer)),
            hygiene_opening: HygieneOpening::from_party(party(ExtensionSlug::HygieneOpening)),
            pillory: Pillory::from_party(party(ExtensionSlug::Pillory)),
            random_events: RandomEvents::from_party(party(ExtensionSlug::RandomEvents)),
            share_link: ShareLink::from_party(party(ExtensionSlug::ShareLink)),
            wheel_of_fortune: WheelOfFortune::from_party(party(ExtensionSlug::WheelOfFortune)),
            verification_picture: VerificationPicture::from_party(party(
                ExtensionSlug::VerificationPicture,
            )),
            tasks: Tasks::from_party(party(ExtensionSlug::Tasks)),
            penalties: Penalties::from_party(party(ExtensionSlug::Penalties)),
        }
    }

    /// `(enabled, modified, config)` for each projection, in slug order.
    fn each(&self) -> [(bool, bool, ExtensionConfigDto); 10] {
        fn row<E: Extension>(e: &E) -> (bool, bool, ExtensionConfigDto) {
            (e.is_enabled(), e.is_modified(), e.to_config())
        }
        [
            row(&self.dice),
            row(&self.guess_timer),
            row(&self.hygiene_opening),
            row(&self.pillory),
            row(&self.random_events),
            row(&self.share_link),
            row(&self.wheel_of_fortune),
            row(&self.verification_picture),
            row(&self.tasks),
            row(&self.penalties),
        ]
    }

    pub fn any_modified(&self) -> bool {
        self.each().iter().any(|(_, modified, _)| *modified)
    }

    /// Configs of the enabled projections only.
    pub fn enabled_configs(&self) -> Vec<ExtensionConfigDto> {
        self.each()
            .into_iter()
            .filter(|(enabled, _, _)| *enabled)
            .map(|(_, _, cfg)| cfg)
            .collect()
    }

    pub fn clear_modified(&mut self) {
        self.dice.state_mut().modified = false;
        self.guess_timer.state_mut().modified = false;
        self.hygiene_opening.state_mut().modified = false;
        self.pillory.state_mut().modified = false;
        self.random_events.state_mut().modified = false;
        self.share_link.state_mut().modified = false;
        self.wheel_of_fortune.state_mut().modified = false;
        self.verification_picture.state_mut().modified = false;
        self.tasks.state_mut().modified = false;
        self.tasks.clear_tasks_modified();
        self.penalties.state_mut().modified = false;
    }

    /// Remote id of an attached extension by slug.
    pub fn id_of(&self, slug: ExtensionSlug) -> Option<&str> {
        match slug {
            ExtensionSlug::Dice => self.dice.id(),
            ExtensionSlug::GuessTheTimer => self.guess_timer.id(),
            ExtensionSlug::HygieneOpening => self.hygiene_opening.id(),
            ExtensionSlug::Pillory => self.pillory.id(),
            ExtensionSlug::RandomEvents => self.random_events.id(),
            ExtensionSlug::ShareLink => self.share_link.id(),
            ExtensionSlug::WheelOfFortune => self.wheel_of_fortune.id(),
            ExtensionSlug::VerificationPicture => self.verification_picture.id(),
            ExtensionSlug::Tasks => self.tasks.id(),
            ExtensionSlug::Penalties => self.penalties.id(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lock_with(extensions: serde_json::Value) -> Lock {
        serde_json::from_value(json!({
            "_id": "l1",
            "status": "locked",
            "role": "keyholder",
            "startDate": "2024-01-01T00:00:00Z",
            "user": { "_id": "u1" },
            "extensions": extensions
        }))
        .unwrap()
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: serde::Serializer>(&self, _: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not encodable"))
        }
    }

    #[test]
    fn unencodable_config_becomes_null() {
        let cfg = dto(ExtensionSlug::Dice, ExtensionMode::Cumulative, 600, &Unencodable);
        assert_eq!(cfg.slug, "dice");
        assert_eq!(cfg.config, Value::Null);
        assert_eq!(cfg.regularity, 600);
    }

    #[test]
    fn absent_extensions_start_disabled_with_defaults() {
        let ext = Extensions::from_lock(&lock_with(json!([])));
        assert!(!ext.dice.is_enabled());
        assert_eq!(ext.dice.multiplier(), Duration::seconds(3600));
        assert_eq!(ext.hygiene_opening.regularity(), Duration::seconds(172800));
        assert!(ext.enabled_configs().is_empty());
        assert!(!ext.any_modified());
    }

    #[test]
    fn setters_on_disabled_projection_do_not_mark_modified() {
        let mut ext = Extensions::from_lock(&lock_with(json!([])));
        ext.dice.set_multiplier(Duration::seconds(60));
        assert!(!ext.any_modified());

        ext.dice.set_enabled(true);
        assert!(ext.dice.is_modified());
        ext.clear_modified();
        ext.dice.set_multiplier(Duration::seconds(120));
        assert!(ext.any_modified());
    }

    #[test]
    fn enabled_configs_carry_only_enabled_slugs() {
        let mut ext = Extensions::from_lock(&lock_with(json!([
            { "_id": "e1", "slug": "dice", "mode": "cumulative", "regularity": 600,
              "config": { "multiplier": 120 } },
            { "_id": "e2", "slug": "link", "config": {} }
        ])));
        assert_eq!(ext.id_of(ExtensionSlug::Dice), Some("e1"));
        assert_eq!(ext.dice.mode(), ExtensionMode::Cumulative);
        assert_eq!(ext.dice.multiplier(), Duration::seconds(120));

        ext.share_link.set_enabled(false);
        let slugs: Vec<String> = ext.enabled_configs().into_iter().map(|c| c.slug).collect();
        assert_eq!(slugs, vec!["dice".to_string()]);
    }
}
