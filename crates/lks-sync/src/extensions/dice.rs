use chrono::Duration;

use lks_schemas::{DiceConfig, ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug};

use super::{dto, secs, Extension, ExtensionState};

#[derive(Debug, Clone, PartialEq)]
pub struct Dice {
    state: ExtensionState,
    mode: ExtensionMode,
    regularity: i64,
    multiplier: i64,
}

impl Dice {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let mut dice = Self {
            state: ExtensionState::from_party(party),
            mode: ExtensionMode::NonCumulative,
            regularity: 3600,
            multiplier: 3600,
        };
        if let Some(p) = party {
            let cfg: DiceConfig = p.config_as().unwrap_or_default();
            dice.mode = p.mode;
            dice.regularity = p.regularity;
            dice.multiplier = cfg.multiplier;
        }
        dice
    }

    pub fn mode(&self) -> ExtensionMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ExtensionMode) {
        self.mode = mode;
        self.state.touch();
    }

    pub fn regularity(&self) -> Duration {
        secs(self.regularity)
    }

    pub fn set_regularity(&mut self, d: Duration) {
        self.regularity = d.num_seconds();
        self.state.touch();
    }

    /// Time per pip of difference between the two dice.
    pub fn multiplier(&self) -> Duration {
        secs(self.multiplier)
    }

    pub fn set_multiplier(&mut self, d: Duration) {
        self.multiplier = d.num_seconds();
        self.state.touch();
    }
}

impl Extension for Dice {
    const SLUG: ExtensionSlug = ExtensionSlug::Dice;

    fn state(&self) -> &ExtensionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExtensionState {
        &mut self.state
    }

    fn to_config(&self) -> ExtensionConfigDto {
        dto(
            Self::SLUG,
            self.mode,
            self.regularity,
            &DiceConfig {
                multiplier: self.multiplier,
            },
        )
    }
}
