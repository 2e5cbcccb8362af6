use chrono::Duration;

use lks_schemas::{ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, PilloryConfig};

use super::{dto, secs, Extension, ExtensionState};

/// Shortest pillory the remote accepts, in seconds.
pub const PILLORY_MIN_SECS: i64 = 15 * 60;
/// Longest pillory the remote accepts, in seconds.
pub const PILLORY_MAX_SECS: i64 = 24 * 3600;

#[derive(Debug, Clone, PartialEq)]
pub struct Pillory {
    state: ExtensionState,
    time_to_add: i64,
}

impl Pillory {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let time_to_add = party
            .map(|p| p.config_as::<PilloryConfig>().unwrap_or_default().time_to_add)
            .unwrap_or(3600);
        Self {
            state: ExtensionState::from_party(party),
            time_to_add,
        }
    }

    /// Added per community vote.
    pub fn time_to_add(&self) -> Duration {
        secs(self.time_to_add)
    }

    pub fn set_time_to_add(&mut self, d: Duration) {
        self.time_to_add = d.num_seconds();
        self.state.touch();
    }

    pub fn clamp_duration(d: Duration) -> Duration {
        secs(d.num_seconds().clamp(PILLORY_MIN_SECS, PILLORY_MAX_SECS))
    }
}

impl Extension for Pillory {
    const SLUG: ExtensionSlug = ExtensionSlug::Pillory;

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
            &PilloryConfig {
                time_to_add: self.time_to_add,
                limit_to_logged_users: true,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_clamped_to_the_accepted_window() {
        assert_eq!(Pillory::clamp_duration(Duration::minutes(1)), Duration::minutes(15));
        assert_eq!(Pillory::clamp_duration(Duration::hours(30)), Duration::hours(24));
        assert_eq!(Pillory::clamp_duration(Duration::hours(2)), Duration::hours(2));
    }
}
