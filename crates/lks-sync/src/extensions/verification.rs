use chrono::Duration;

use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, PeerVerification,
    PictureVisibility, VerificationPictureConfig,
};

use super::{dto, secs, Extension, ExtensionState, PenaltyActions};

#[derive(Debug, Clone, PartialEq)]
pub struct VerificationPicture {
    state: ExtensionState,
    mode: ExtensionMode,
    regularity: i64,
    visibility: PictureVisibility,
    peer_verification: bool,
    rejected_penalty: PenaltyActions,
}

impl VerificationPicture {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let mut v = Self {
            state: ExtensionState::from_party(party),
            mode: ExtensionMode::NonCumulative,
            regularity: 86400,
            visibility: PictureVisibility::All,
            peer_verification: false,
            rejected_penalty: PenaltyActions::default(),
        };
        if let Some(p) = party {
            let cfg: VerificationPictureConfig = p.config_as().unwrap_or_default();
            v.mode = p.mode;
            v.regularity = p.regularity;
            v.visibility = cfg.visibility;
            v.peer_verification = cfg.peer_verification.enabled;
            v.rejected_penalty = PenaltyActions::from_punishments(&cfg.peer_verification.punishments);
        }
        v
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

    pub fn visibility(&self) -> PictureVisibility {
        self.visibility
    }

    pub fn set_visibility(&mut self, v: PictureVisibility) {
        self.visibility = v;
        self.state.touch();
    }

    /// Community votes on submitted pictures.
    pub fn peer_verification(&self) -> bool {
        self.peer_verification
    }

    pub fn set_peer_verification(&mut self, v: bool) {
        self.peer_verification = v;
        self.state.touch();
    }

    /// Applied when peers reject a picture.
    pub fn rejected_penalty(&self) -> &PenaltyActions {
        &self.rejected_penalty
    }

    pub fn rejected_penalty_mut(&mut self) -> &mut PenaltyActions {
        self.state.touch();
        &mut self.rejected_penalty
    }
}

impl Extension for VerificationPicture {
    const SLUG: ExtensionSlug = ExtensionSlug::VerificationPicture;

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
            &VerificationPictureConfig {
                visibility: self.visibility,
                peer_verification: PeerVerification {
                    enabled: self.peer_verification,
                    punishments: self.rejected_penalty.to_punishments(),
                },
            },
        )
    }
}
