use chrono::Duration;

use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, HygieneOpeningConfig,
};

use super::{dto, secs, Extension, ExtensionState};

/// Temporary (hygiene) opening.
#[derive(Debug, Clone, PartialEq)]
pub struct HygieneOpening {
    state: ExtensionState,
    regularity: i64,
    opening_time: i64,
    penalty_time: i64,
    allow_only_keyholder_to_open: bool,
}

impl HygieneOpening {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let mut h = Self {
            state: ExtensionState::from_party(party),
            regularity: 172800,
            opening_time: 900,
            penalty_time: 43200,
            allow_only_keyholder_to_open: false,
        };
        if let Some(p) = party {
            let cfg: HygieneOpeningConfig = p.config_as().unwrap_or_default();
            h.regularity = p.regularity;
            h.opening_time = cfg.opening_time;
            h.penalty_time = cfg.penalty_time;
            h.allow_only_keyholder_to_open = cfg.allow_only_keyholder_to_open;
        }
        h
    }

    pub fn regularity(&self) -> Duration {
        secs(self.regularity)
    }

    pub fn set_regularity(&mut self, d: Duration) {
        self.regularity = d.num_seconds();
        self.state.touch();
    }

    pub fn opening_time(&self) -> Duration {
        secs(self.opening_time)
    }

    pub fn set_opening_time(&mut self, d: Duration) {
        self.opening_time = d.num_seconds();
        self.state.touch();
    }

    /// Added when the lock is relocked late.
    pub fn penalty_time(&self) -> Duration {
        secs(self.penalty_time)
    }

    pub fn set_penalty_time(&mut self, d: Duration) {
        self.penalty_time = d.num_seconds();
        self.state.touch();
    }

    pub fn allow_only_keyholder_to_open(&self) -> bool {
        self.allow_only_keyholder_to_open
    }

    pub fn set_allow_only_keyholder_to_open(&mut self, v: bool) {
        self.allow_only_keyholder_to_open = v;
        self.state.touch();
    }
}

impl Extension for HygieneOpening {
    const SLUG: ExtensionSlug = ExtensionSlug::HygieneOpening;

    fn state(&self) -> &ExtensionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExtensionState {
        &mut self.state
    }

    fn to_config(&self) -> ExtensionConfigDto {
        dto(
            Self::SLUG,
            ExtensionMode::NonCumulative,
            self.regularity,
            &HygieneOpeningConfig {
                opening_time: self.opening_time,
                penalty_time: self.penalty_time,
                allow_only_keyholder_to_open: self.allow_only_keyholder_to_open,
            },
        )
    }
}
