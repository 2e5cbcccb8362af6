//! Extension wire model: the party record attached to a lock, the config
//! DTO sent back on edit, and the per-extension config bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Slugs and modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExtensionSlug {
    Dice,
    GuessTheTimer,
    HygieneOpening,
    Pillory,
    RandomEvents,
    ShareLink,
    WheelOfFortune,
    VerificationPicture,
    Tasks,
    Penalties,
}

impl ExtensionSlug {
    pub const ALL: [ExtensionSlug; 10] = [
        ExtensionSlug::Dice,
        ExtensionSlug::GuessTheTimer,
        ExtensionSlug::HygieneOpening,
        ExtensionSlug::Pillory,
        ExtensionSlug::RandomEvents,
        ExtensionSlug::ShareLink,
        ExtensionSlug::WheelOfFortune,
        ExtensionSlug::VerificationPicture,
        ExtensionSlug::Tasks,
        ExtensionSlug::Penalties,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionSlug::Dice => "dice",
            ExtensionSlug::GuessTheTimer => "guess-timer",
            ExtensionSlug::HygieneOpening => "temporary-opening",
            ExtensionSlug::Pillory => "pillory",
            ExtensionSlug::RandomEvents => "random-events",
            ExtensionSlug::ShareLink => "link",
            ExtensionSlug::WheelOfFortune => "wheel-of-fortune",
            ExtensionSlug::VerificationPicture => "verification-picture",
            ExtensionSlug::Tasks => "tasks",
            ExtensionSlug::Penalties => "penalty",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|slug| slug.as_str() == s)
    }
}

impl std::fmt::Display for ExtensionSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionMode {
    Cumulative,
    #[default]
    NonCumulative,
    Turn,
    Unlimited,
}

// ---------------------------------------------------------------------------
// Party record (read) and config DTO (write)
// ---------------------------------------------------------------------------

/// An extension as attached to a lock: identity, scheduling, config and the
/// per-user data the remote tracks for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionParty {
    #[serde(rename = "_id")]
    pub id: String,
    pub slug: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub mode: ExtensionMode,
    /// Seconds.
    #[serde(default)]
    pub regularity: i64,
    #[serde(default)]
    pub config: Value,
    #[serde(default)]
    pub user_data: Value,
}

impl ExtensionParty {
    /// Typed view of `config`; `None` when the body does not match.
    pub fn config_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.config.clone()).ok()
    }

    pub fn user_data_as<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        serde_json::from_value(self.user_data.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionConfigDto {
    pub slug: String,
    pub config: Value,
    pub mode: ExtensionMode,
    pub regularity: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EditExtensionsRequest {
    pub extensions: Vec<ExtensionConfigDto>,
}

impl EditExtensionsRequest {
    pub fn contains(&self, slug: ExtensionSlug) -> bool {
        self.extensions.iter().any(|e| e.slug == slug.as_str())
    }
}

// ---------------------------------------------------------------------------
// Config bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiceConfig {
    pub multiplier: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuessTheTimerConfig {
    pub min_random_time: i64,
    pub max_random_time: i64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HygieneOpeningConfig {
    pub opening_time: i64,
    pub penalty_time: i64,
    pub allow_only_keyholder_to_open: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PilloryConfig {
    pub time_to_add: i64,
    pub limit_to_logged_users: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RandomEventsDifficulty {
    Easy,
    #[default]
    Normal,
    Hard,
    Expert,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RandomEventsConfig {
    pub difficulty: RandomEventsDifficulty,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShareLinkConfig {
    pub time_to_add: i64,
    pub time_to_remove: i64,
    pub enable_random: bool,
    #[serde(rename = "nbVisits")]
    pub required_visits: i32,
    pub limit_to_logged_users: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WheelOfFortuneConfig {
    pub segments: Vec<WheelSegmentModel>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PictureVisibility {
    #[default]
    All,
    Keyholder,
    Community,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeerVerification {
    pub enabled: bool,
    pub punishments: Vec<Punishment>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerificationPictureConfig {
    pub visibility: PictureVisibility,
    pub peer_verification: PeerVerification,
}

/// A task as the remote stores it, both in config and in task actions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskAction {
    pub task: String,
    #[serde(default)]
    pub points: i32,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TasksConfig {
    pub tasks: Vec<TaskAction>,
    pub enable_points: bool,
    pub points_required: i32,
    pub allow_wearer_to_edit_tasks: bool,
    pub prevent_wearer_from_assigning_tasks: bool,
    pub allow_wearer_to_choose_tasks: bool,
    pub allow_wearer_to_configure_tasks: bool,
    pub start_vote_after_last_vote: bool,
    pub vote_enabled: bool,
    pub vote_duration: i64,
    pub punishments_on_abandoned_task: Vec<Punishment>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TasksUserData {
    pub user_tasks: Vec<TaskAction>,
    pub points: i32,
    pub current_task: Option<TaskAction>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PenaltiesConfig {
    pub penalties: Vec<Penalty>,
}

// ---------------------------------------------------------------------------
// Wheel segments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WheelSegmentKind {
    Freeze,
    Unfreeze,
    ToggleFreeze,
    AddTime,
    RemoveTime,
    AddRemoveTime,
    Text,
    Pillory,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WheelSegmentModel {
    #[serde(rename = "type")]
    pub kind: WheelSegmentKind,
    #[serde(default)]
    pub text: String,
    /// Seconds; meaningful for the time and pillory kinds.
    #[serde(default)]
    pub duration: i64,
}

// ---------------------------------------------------------------------------
// Penalties and punishments
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PilloryPunishmentParams {
    pub duration: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Punishment {
    Freeze,
    AddTime {
        duration: i64,
    },
    Pillory {
        params: PilloryPunishmentParams,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrequencyParams {
    /// Number of actions required within the window.
    pub actions: i32,
    /// Window in seconds.
    pub frequency: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLimitParams {
    pub time_limit: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum Penalty {
    DiceFrequency {
        params: FrequencyParams,
        #[serde(default)]
        punishments: Vec<Punishment>,
    },
    TemporaryOpeningFrequency {
        params: FrequencyParams,
        #[serde(default)]
        punishments: Vec<Punishment>,
    },
    TemporaryOpeningTimeLimit {
        params: TimeLimitParams,
        #[serde(default)]
        punishments: Vec<Punishment>,
    },
    TasksFrequency {
        params: FrequencyParams,
        #[serde(default)]
        punishments: Vec<Punishment>,
    },
    TasksTimeLimit {
        params: TimeLimitParams,
        #[serde(default)]
        punishments: Vec<Punishment>,
    },
    VerificationPictureFrequency {
        params: FrequencyParams,
        #[serde(default)]
        punishments: Vec<Punishment>,
    },
    WheelOfFortuneFrequency {
        params: FrequencyParams,
        #[serde(default)]
        punishments: Vec<Punishment>,
    },
    #[serde(other)]
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn slug_parse_matches_as_str() {
        for slug in ExtensionSlug::ALL {
            assert_eq!(ExtensionSlug::parse(slug.as_str()), Some(slug));
        }
        assert_eq!(ExtensionSlug::parse("unknown-thing"), None);
    }

    #[test]
    fn unknown_penalty_and_punishment_names_decode_as_other() {
        let cfg: PenaltiesConfig = serde_json::from_value(json!({
            "penalties": [
                { "name": "brand_new_penalty", "params": {} },
                {
                    "name": "dice_frequency",
                    "params": { "actions": 2, "frequency": 86400 },
                    "punishments": [ { "name": "freeze" }, { "name": "spank" } ]
                }
            ]
        }))
        .unwrap();

        assert_eq!(cfg.penalties[0], Penalty::Other);
        match &cfg.penalties[1] {
            Penalty::DiceFrequency { params, punishments } => {
                assert_eq!(params.actions, 2);
                assert_eq!(punishments, &vec![Punishment::Freeze, Punishment::Other]);
            }
            other => panic!("unexpected penalty: {other:?}"),
        }
    }

    #[test]
    fn unknown_segment_kind_is_tolerated() {
        let seg: WheelSegmentModel =
            serde_json::from_value(json!({ "type": "set-shoes", "text": "x" })).unwrap();
        assert_eq!(seg.kind, WheelSegmentKind::Unknown);
        assert_eq!(seg.duration, 0);
    }
}
