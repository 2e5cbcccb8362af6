use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, RandomEventsConfig,
    RandomEventsDifficulty,
};

use super::{dto, Extension, ExtensionState};

#[derive(Debug, Clone, PartialEq)]
pub struct RandomEvents {
    state: ExtensionState,
    difficulty: RandomEventsDifficulty,
}

impl RandomEvents {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let difficulty = party
            .and_then(|p| p.config_as::<RandomEventsConfig>())
            .map(|c| c.difficulty)
            .unwrap_or_default();
        Self {
            state: ExtensionState::from_party(party),
            difficulty,
        }
    }

    pub fn difficulty(&self) -> RandomEventsDifficulty {
        self.difficulty
    }

    pub fn set_difficulty(&mut self, d: RandomEventsDifficulty) {
        self.difficulty = d;
        self.state.touch();
    }
}

impl Extension for RandomEvents {
    const SLUG: ExtensionSlug = ExtensionSlug::RandomEvents;

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
            &RandomEventsConfig {
                difficulty: self.difficulty,
            },
        )
    }
}
