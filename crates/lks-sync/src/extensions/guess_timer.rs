use chrono::Duration;

use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, GuessTheTimerConfig,
};

use super::{dto, secs, Extension, ExtensionState};

#[derive(Debug, Clone, PartialEq)]
pub struct GuessTheTimer {
    state: ExtensionState,
    min_random_time: i64,
    max_random_time: i64,
}

impl GuessTheTimer {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let cfg = party
            .map(|p| p.config_as::<GuessTheTimerConfig>().unwrap_or_default())
            .unwrap_or(GuessTheTimerConfig {
                min_random_time: 10800,
                max_random_time: 21600,
            });
        Self {
            state: ExtensionState::from_party(party),
            min_random_time: cfg.min_random_time,
            max_random_time: cfg.max_random_time,
        }
    }

    pub fn min_random_time(&self) -> Duration {
        secs(self.min_random_time)
    }

    pub fn set_min_random_time(&mut self, d: Duration) {
        self.min_random_time = d.num_seconds();
        self.state.touch();
    }

    pub fn max_random_time(&self) -> Duration {
        secs(self.max_random_time)
    }

    pub fn set_max_random_time(&mut self, d: Duration) {
        self.max_random_time = d.num_seconds();
        self.state.touch();
    }
}

impl Extension for GuessTheTimer {
    const SLUG: ExtensionSlug = ExtensionSlug::GuessTheTimer;

    fn state(&self) -> &ExtensionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExtensionState {
        &mut self.state
    }

    fn to_config(&self) -> ExtensionConfigDto {
        dto(
            Self::SLUG,
            ExtensionMode::Unlimited,
            3600,
            &GuessTheTimerConfig {
                min_random_time: self.min_random_time,
                max_random_time: self.max_random_time,
            },
        )
    }
}
