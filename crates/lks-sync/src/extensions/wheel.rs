use chrono::Duration;

use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, WheelOfFortuneConfig,
    WheelSegmentKind, WheelSegmentModel,
};

use super::{dto, secs, Extension, ExtensionState};

const DEFAULT_SEGMENT_SECS: i64 = 3600;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WheelSegment {
    Freeze,
    Unfreeze,
    ToggleFreeze,
    AddTime(Duration),
    RemoveTime(Duration),
    AddRemoveTime(Duration),
    Text(String),
    Pillory(Duration),
}

impl WheelSegment {
    /// `None` for segment kinds this client does not know.
    pub fn from_model(m: &WheelSegmentModel) -> Option<Self> {
        let d = || secs(if m.duration > 0 { m.duration } else { DEFAULT_SEGMENT_SECS });
        Some(match m.kind {
            WheelSegmentKind::Freeze => WheelSegment::Freeze,
            WheelSegmentKind::Unfreeze => WheelSegment::Unfreeze,
            WheelSegmentKind::ToggleFreeze => WheelSegment::ToggleFreeze,
            WheelSegmentKind::AddTime => WheelSegment::AddTime(d()),
            WheelSegmentKind::RemoveTime => WheelSegment::RemoveTime(d()),
            WheelSegmentKind::AddRemoveTime => WheelSegment::AddRemoveTime(d()),
            WheelSegmentKind::Text => WheelSegment::Text(m.text.clone()),
            WheelSegmentKind::Pillory => WheelSegment::Pillory(d()),
            WheelSegmentKind::Unknown => return None,
        })
    }

    pub fn to_model(&self) -> WheelSegmentModel {
        let (kind, text, duration) = match self {
            WheelSegment::Freeze => (WheelSegmentKind::Freeze, String::new(), 0),
            WheelSegment::Unfreeze => (WheelSegmentKind::Unfreeze, String::new(), 0),
            WheelSegment::ToggleFreeze => (WheelSegmentKind::ToggleFreeze, String::new(), 0),
            WheelSegment::AddTime(d) => (WheelSegmentKind::AddTime, String::new(), d.num_seconds()),
            WheelSegment::RemoveTime(d) => {
                (WheelSegmentKind::RemoveTime, String::new(), d.num_seconds())
            }
            WheelSegment::AddRemoveTime(d) => {
                (WheelSegmentKind::AddRemoveTime, String::new(), d.num_seconds())
            }
            WheelSegment::Text(t) => (WheelSegmentKind::Text, t.clone(), 0),
            WheelSegment::Pillory(d) => (WheelSegmentKind::Pillory, String::new(), d.num_seconds()),
        };
        WheelSegmentModel {
            kind,
            text,
            duration,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WheelOfFortune {
    state: ExtensionState,
    mode: ExtensionMode,
    regularity: i64,
    segments: Vec<WheelSegment>,
}

impl WheelOfFortune {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let mut w = Self {
            state: ExtensionState::from_party(party),
            mode: ExtensionMode::NonCumulative,
            regularity: 0,
            segments: Vec::new(),
        };
        if let Some(p) = party {
            let cfg: WheelOfFortuneConfig = p.config_as().unwrap_or_default();
            w.mode = p.mode;
            w.regularity = p.regularity;
            w.segments = cfg.segments.iter().filter_map(WheelSegment::from_model).collect();
        }
        w
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

    pub fn segments(&self) -> &[WheelSegment] {
        &self.segments
    }

    pub fn segments_mut(&mut self) -> &mut Vec<WheelSegment> {
        self.state.touch();
        &mut self.segments
    }
}

impl Extension for WheelOfFortune {
    const SLUG: ExtensionSlug = ExtensionSlug::WheelOfFortune;

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
            &WheelOfFortuneConfig {
                segments: self.segments.iter().map(WheelSegment::to_model).collect(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_segments_are_dropped_and_durations_defaulted() {
        let party: ExtensionParty = serde_json::from_value(json!({
            "_id": "w1",
            "slug": "wheel-of-fortune",
            "mode": "cumulative",
            "regularity": 7200,
            "config": { "segments": [
                { "type": "add-time", "duration": 1800 },
                { "type": "remove-time" },
                { "type": "set-shoes" },
                { "type": "text", "text": "do ten pushups" }
            ]}
        }))
        .unwrap();

        let w = WheelOfFortune::from_party(Some(&party));
        assert_eq!(
            w.segments(),
            &[
                WheelSegment::AddTime(Duration::minutes(30)),
                WheelSegment::RemoveTime(Duration::hours(1)),
                WheelSegment::Text("do ten pushups".to_string()),
            ]
        );
        assert_eq!(w.to_config().regularity, 7200);
        assert!(!w.is_modified());
    }

    #[test]
    fn editing_segments_marks_modified() {
        let mut w = WheelOfFortune::from_party(None);
        w.set_enabled(true);
        w.state_mut().modified = false;
        w.segments_mut().push(WheelSegment::Freeze);
        assert!(w.is_modified());
        let cfg = w.to_config();
        assert_eq!(cfg.config["segments"][0]["type"], "freeze");
    }
}
