//! Penalties extension and the punishment transcoding shared with tasks and
//! verification pictures.

use chrono::Duration;

use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, FrequencyParams,
    PenaltiesConfig, Penalty, PilloryPunishmentParams, Punishment, TimeLimitParams,
};

use super::{dto, Extension, ExtensionState};

/// Windows the remote accepts for frequency penalties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PenaltyTimeLimit {
    #[default]
    Unknown,
    OneDay,
    TwoDays,
    OneWeek,
    OneMonth,
}

impl PenaltyTimeLimit {
    pub fn from_secs(secs: i64) -> Self {
        match secs {
            86400 => PenaltyTimeLimit::OneDay,
            172800 => PenaltyTimeLimit::TwoDays,
            604800 => PenaltyTimeLimit::OneWeek,
            2592000 => PenaltyTimeLimit::OneMonth,
            _ => PenaltyTimeLimit::Unknown,
        }
    }

    pub fn as_secs(&self) -> Option<i64> {
        match self {
            PenaltyTimeLimit::OneDay => Some(86400),
            PenaltyTimeLimit::TwoDays => Some(172800),
            PenaltyTimeLimit::OneWeek => Some(604800),
            PenaltyTimeLimit::OneMonth => Some(2592000),
            PenaltyTimeLimit::Unknown => None,
        }
    }
}

/// What happens when a penalty triggers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PenaltyActions {
    pub freeze: bool,
    pub time_added: Duration,
    pub pillory_duration: Duration,
}

impl Default for PenaltyActions {
    fn default() -> Self {
        Self {
            freeze: false,
            time_added: Duration::zero(),
            pillory_duration: Duration::zero(),
        }
    }
}

impl PenaltyActions {
    pub fn from_punishments(punishments: &[Punishment]) -> Self {
        let mut actions = Self::default();
        for p in punishments {
            match p {
                Punishment::Freeze => actions.freeze = true,
                Punishment::AddTime { duration } => actions.time_added = Duration::seconds(*duration),
                Punishment::Pillory { params } => {
                    actions.pillory_duration = Duration::seconds(params.duration)
                }
                Punishment::Other => {}
            }
        }
        actions
    }

    /// Freeze, then pillory, then added time; zero durations are omitted.
    pub fn to_punishments(&self) -> Vec<Punishment> {
        let mut out = Vec::new();
        if self.freeze {
            out.push(Punishment::Freeze);
        }
        if self.pillory_duration.num_seconds() > 0 {
            out.push(Punishment::Pillory {
                params: PilloryPunishmentParams {
                    duration: self.pillory_duration.num_seconds(),
                },
            });
        }
        if self.time_added.num_seconds() > 0 {
            out.push(Punishment::AddTime {
                duration: self.time_added.num_seconds(),
            });
        }
        out
    }
}

/// "Do `actions_required` actions every `time_limit`".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrequencyPenalty {
    pub actions_required: i32,
    pub time_limit: PenaltyTimeLimit,
    pub penalty: PenaltyActions,
}

impl FrequencyPenalty {
    fn decode(params: &FrequencyParams, punishments: &[Punishment]) -> Self {
        Self {
            actions_required: params.actions,
            time_limit: PenaltyTimeLimit::from_secs(params.frequency),
            penalty: PenaltyActions::from_punishments(punishments),
        }
    }

    /// `None` unless both the count and the window are configured.
    fn encode(&self) -> Option<(FrequencyParams, Vec<Punishment>)> {
        if self.actions_required <= 0 {
            return None;
        }
        let frequency = self.time_limit.as_secs()?;
        Some((
            FrequencyParams {
                actions: self.actions_required,
                frequency,
            },
            self.penalty.to_punishments(),
        ))
    }
}

/// "Finish within `max_time`".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeLimitPenalty {
    pub max_time: Duration,
    pub penalty: PenaltyActions,
}

impl Default for TimeLimitPenalty {
    fn default() -> Self {
        Self {
            max_time: Duration::zero(),
            penalty: PenaltyActions::default(),
        }
    }
}

impl TimeLimitPenalty {
    fn decode(params: &TimeLimitParams, punishments: &[Punishment]) -> Self {
        Self {
            max_time: Duration::seconds(params.time_limit),
            penalty: PenaltyActions::from_punishments(punishments),
        }
    }

    fn encode(&self) -> Option<(TimeLimitParams, Vec<Punishment>)> {
        let time_limit = self.max_time.num_seconds();
        (time_limit > 0).then(|| (TimeLimitParams { time_limit }, self.penalty.to_punishments()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Penalties {
    state: ExtensionState,
    dice: FrequencyPenalty,
    hygiene_frequency: FrequencyPenalty,
    hygiene_time_limit: TimeLimitPenalty,
    tasks_frequency: FrequencyPenalty,
    tasks_time_limit: TimeLimitPenalty,
    verification_frequency: FrequencyPenalty,
    wheel_frequency: FrequencyPenalty,
}

impl Penalties {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let mut out = Self {
            state: ExtensionState::from_party(party),
            dice: FrequencyPenalty::default(),
            hygiene_frequency: FrequencyPenalty::default(),
            hygiene_time_limit: TimeLimitPenalty::default(),
            tasks_frequency: FrequencyPenalty::default(),
            tasks_time_limit: TimeLimitPenalty::default(),
            verification_frequency: FrequencyPenalty::default(),
            wheel_frequency: FrequencyPenalty::default(),
        };
        let Some(cfg) = party.and_then(|p| p.config_as::<PenaltiesConfig>()) else {
            return out;
        };
        // first entry of each kind wins
        let mut seen = std::collections::HashSet::new();
        for penalty in &cfg.penalties {
            if !seen.insert(std::mem::discriminant(penalty)) {
                continue;
            }
            match penalty {
                Penalty::DiceFrequency { params, punishments } => {
                    out.dice = FrequencyPenalty::decode(params, punishments)
                }
                Penalty::TemporaryOpeningFrequency { params, punishments } => {
                    out.hygiene_frequency = FrequencyPenalty::decode(params, punishments)
                }
                Penalty::TemporaryOpeningTimeLimit { params, punishments } => {
                    out.hygiene_time_limit = TimeLimitPenalty::decode(params, punishments)
                }
                Penalty::TasksFrequency { params, punishments } => {
                    out.tasks_frequency = FrequencyPenalty::decode(params, punishments)
                }
                Penalty::TasksTimeLimit { params, punishments } => {
                    out.tasks_time_limit = TimeLimitPenalty::decode(params, punishments)
                }
                Penalty::VerificationPictureFrequency { params, punishments } => {
                    out.verification_frequency = FrequencyPenalty::decode(params, punishments)
                }
                Penalty::WheelOfFortuneFrequency { params, punishments } => {
                    out.wheel_frequency = FrequencyPenalty::decode(params, punishments)
                }
                Penalty::Other => {}
            }
        }
        out
    }

    pub fn dice(&self) -> &FrequencyPenalty {
        &self.dice
    }

    pub fn dice_mut(&mut self) -> &mut FrequencyPenalty {
        self.state.touch();
        &mut self.dice
    }

    pub fn hygiene_frequency(&self) -> &FrequencyPenalty {
        &self.hygiene_frequency
    }

    pub fn hygiene_frequency_mut(&mut self) -> &mut FrequencyPenalty {
        self.state.touch();
        &mut self.hygiene_frequency
    }

    pub fn hygiene_time_limit(&self) -> &TimeLimitPenalty {
        &self.hygiene_time_limit
    }

    pub fn hygiene_time_limit_mut(&mut self) -> &mut TimeLimitPenalty {
        self.state.touch();
        &mut self.hygiene_time_limit
    }

    pub fn tasks_frequency(&self) -> &FrequencyPenalty {
        &self.tasks_frequency
    }

    pub fn tasks_frequency_mut(&mut self) -> &mut FrequencyPenalty {
        self.state.touch();
        &mut self.tasks_frequency
    }

    pub fn tasks_time_limit(&self) -> &TimeLimitPenalty {
        &self.tasks_time_limit
    }

    pub fn tasks_time_limit_mut(&mut self) -> &mut TimeLimitPenalty {
        self.state.touch();
        &mut self.tasks_time_limit
    }

    pub fn verification_frequency(&self) -> &FrequencyPenalty {
        &self.verification_frequency
    }

    pub fn verification_frequency_mut(&mut self) -> &mut FrequencyPenalty {
        self.state.touch();
        &mut self.verification_frequency
    }

    pub fn wheel_frequency(&self) -> &FrequencyPenalty {
        &self.wheel_frequency
    }

    pub fn wheel_frequency_mut(&mut self) -> &mut FrequencyPenalty {
        self.state.touch();
        &mut self.wheel_frequency
    }

    fn penalties(&self) -> Vec<Penalty> {
        let mut out = Vec::new();
        if let Some((params, punishments)) = self.dice.encode() {
            out.push(Penalty::DiceFrequency { params, punishments });
        }
        if let Some((params, punishments)) = self.hygiene_frequency.encode() {
            out.push(Penalty::TemporaryOpeningFrequency { params, punishments });
        }
        if let Some((params, punishments)) = self.hygiene_time_limit.encode() {
            out.push(Penalty::TemporaryOpeningTimeLimit { params, punishments });
        }
        if let Some((params, punishments)) = self.tasks_frequency.encode() {
            out.push(Penalty::TasksFrequency { params, punishments });
        }
        if let Some((params, punishments)) = self.tasks_time_limit.encode() {
            out.push(Penalty::TasksTimeLimit { params, punishments });
        }
        if let Some((params, punishments)) = self.verification_frequency.encode() {
            out.push(Penalty::VerificationPictureFrequency { params, punishments });
        }
        if let Some((params, punishments)) = self.wheel_frequency.encode() {
            out.push(Penalty::WheelOfFortuneFrequency { params, punishments });
        }
        out
    }
}

impl Extension for Penalties {
    const SLUG: ExtensionSlug = ExtensionSlug::Penalties;

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
            &PenaltiesConfig {
                penalties: self.penalties(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn party(config: serde_json::Value) -> ExtensionParty {
        serde_json::from_value(json!({ "_id": "p1", "slug": "penalty", "config": config })).unwrap()
    }

    #[test]
    fn punishments_transcode_in_fixed_order() {
        let actions = PenaltyActions {
            freeze: true,
            time_added: Duration::hours(1),
            pillory_duration: Duration::minutes(30),
        };
        let p = actions.to_punishments();
        assert_eq!(
            p,
            vec![
                Punishment::Freeze,
                Punishment::Pillory {
                    params: PilloryPunishmentParams { duration: 1800 }
                },
                Punishment::AddTime { duration: 3600 },
            ]
        );
        assert_eq!(PenaltyActions::from_punishments(&p), actions);
    }

    #[test]
    fn unknown_window_is_not_emitted() {
        let mut pen = Penalties::from_party(Some(&party(json!({ "penalties": [] }))));
        pen.dice_mut().actions_required = 3;
        assert!(pen.penalties().is_empty());

        pen.dice_mut().time_limit = PenaltyTimeLimit::OneWeek;
        assert_eq!(pen.penalties().len(), 1);
        assert!(pen.is_modified());
    }

    #[test]
    fn decodes_configured_entries() {
        let pen = Penalties::from_party(Some(&party(json!({
            "penalties": [
                { "name": "tasks_time_limit", "params": { "timeLimit": 7200 },
                  "punishments": [ { "name": "add_time", "duration": 600 } ] },
                { "name": "wheel_of_fortune_frequency",
                  "params": { "actions": 2, "frequency": 172800 } }
            ]
        }))));
        assert_eq!(pen.tasks_time_limit().max_time, Duration::hours(2));
        assert_eq!(pen.tasks_time_limit().penalty.time_added, Duration::minutes(10));
        assert_eq!(pen.wheel_frequency().time_limit, PenaltyTimeLimit::TwoDays);
        assert_eq!(pen.penalties().len(), 2);
    }
}
