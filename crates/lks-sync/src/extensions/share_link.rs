use chrono::Duration;

use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, ShareLinkConfig,
};

use super::{dto, secs, Extension, ExtensionState};

#[derive(Debug, Clone, PartialEq)]
pub struct ShareLink {
    state: ExtensionState,
    config: ShareLinkConfig,
}

impl ShareLink {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let config = party
            .map(|p| p.config_as::<ShareLinkConfig>().unwrap_or_default())
            .unwrap_or(ShareLinkConfig {
                time_to_add: 3600,
                time_to_remove: 3600,
                enable_random: true,
                required_visits: 0,
                limit_to_logged_users: false,
            });
        Self {
            state: ExtensionState::from_party(party),
            config,
        }
    }

    pub fn time_to_add(&self) -> Duration {
        secs(self.config.time_to_add)
    }

    pub fn set_time_to_add(&mut self, d: Duration) {
        self.config.time_to_add = d.num_seconds();
        self.state.touch();
    }

    pub fn time_to_remove(&self) -> Duration {
        secs(self.config.time_to_remove)
    }

    pub fn set_time_to_remove(&mut self, d: Duration) {
        self.config.time_to_remove = d.num_seconds();
        self.state.touch();
    }

    /// Visitors may randomly add or remove time.
    pub fn enable_random(&self) -> bool {
        self.config.enable_random
    }

    pub fn set_enable_random(&mut self, v: bool) {
        self.config.enable_random = v;
        self.state.touch();
    }

    pub fn required_visits(&self) -> i32 {
        self.config.required_visits
    }

    pub fn set_required_visits(&mut self, n: i32) {
        self.config.required_visits = n;
        self.state.touch();
    }

    pub fn limit_to_logged_users(&self) -> bool {
        self.config.limit_to_logged_users
    }

    pub fn set_limit_to_logged_users(&mut self, v: bool) {
        self.config.limit_to_logged_users = v;
        self.state.touch();
    }
}

impl Extension for ShareLink {
    const SLUG: ExtensionSlug = ExtensionSlug::ShareLink;

    fn state(&self) -> &ExtensionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExtensionState {
        &mut self.state
    }

    fn to_config(&self) -> ExtensionConfigDto {
        dto(Self::SLUG, ExtensionMode::Unlimited, 3600, &self.config)
    }
}
