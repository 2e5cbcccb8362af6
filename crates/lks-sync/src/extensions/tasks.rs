use chrono::Duration;

use lks_schemas::{
    ExtensionConfigDto, ExtensionMode, ExtensionParty, ExtensionSlug, TaskAction, TasksConfig,
    TasksUserData,
};

use super::{dto, secs, Extension, ExtensionState, PenaltyActions};

/// Seconds a task vote stays open when the keyholder does not say.
const DEFAULT_VOTE_SECS: i64 = 12 * 3600;

/// Tasks extension.
///
/// The wearer's task list travels separately from the extension config: it
/// is pushed through the tasks update, so it has its own modified flag that
/// is set regardless of whether the extension is enabled.
#[derive(Debug, Clone, PartialEq)]
pub struct Tasks {
    state: ExtensionState,
    mode: ExtensionMode,
    regularity: i64,
    enable_points: bool,
    points_required: i32,
    allow_edit: bool,
    allow_assign: bool,
    allow_choose: bool,
    allow_configure: bool,
    abandoned_penalty: PenaltyActions,
    user_tasks: Vec<TaskAction>,
    tasks_modified: bool,
    points: i32,
    current_task: Option<TaskAction>,
}

impl Tasks {
    pub(crate) fn from_party(party: Option<&ExtensionParty>) -> Self {
        let mut t = Self {
            state: ExtensionState::from_party(party),
            mode: ExtensionMode::NonCumulative,
            regularity: 3600,
            enable_points: false,
            points_required: 0,
            allow_edit: false,
            allow_assign: true,
            allow_choose: false,
            allow_configure: false,
            abandoned_penalty: PenaltyActions::default(),
            user_tasks: Vec::new(),
            tasks_modified: false,
            points: 0,
            current_task: None,
        };
        if let Some(p) = party {
            let cfg: TasksConfig = p.config_as().unwrap_or_default();
            let data: TasksUserData = p.user_data_as().unwrap_or_default();
            t.mode = p.mode;
            t.regularity = p.regularity;
            t.enable_points = cfg.enable_points;
            t.points_required = cfg.points_required;
            t.allow_edit = cfg.allow_wearer_to_edit_tasks;
            t.allow_assign = !cfg.prevent_wearer_from_assigning_tasks;
            t.allow_choose = cfg.allow_wearer_to_choose_tasks;
            t.allow_configure = cfg.allow_wearer_to_configure_tasks;
            t.abandoned_penalty = PenaltyActions::from_punishments(&cfg.punishments_on_abandoned_task);
            t.user_tasks = data.user_tasks;
            t.points = data.points;
            t.current_task = data.current_task;
        }
        t
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

    pub fn enable_points(&self) -> bool {
        self.enable_points
    }

    pub fn set_enable_points(&mut self, v: bool) {
        self.enable_points = v;
        self.state.touch();
    }

    pub fn points_required(&self) -> i32 {
        self.points_required
    }

    pub fn set_points_required(&mut self, n: i32) {
        self.points_required = n;
        self.state.touch();
    }

    pub fn allow_edit(&self) -> bool {
        self.allow_edit
    }

    pub fn set_allow_edit(&mut self, v: bool) {
        self.allow_edit = v;
        self.state.touch();
    }

    pub fn allow_assign(&self) -> bool {
        self.allow_assign
    }

    pub fn set_allow_assign(&mut self, v: bool) {
        self.allow_assign = v;
        self.state.touch();
    }

    pub fn allow_choose(&self) -> bool {
        self.allow_choose
    }

    pub fn set_allow_choose(&mut self, v: bool) {
        self.allow_choose = v;
        self.state.touch();
    }

    pub fn allow_configure(&self) -> bool {
        self.allow_configure
    }

    pub fn set_allow_configure(&mut self, v: bool) {
        self.allow_configure = v;
        self.state.touch();
    }

    pub fn abandoned_penalty(&self) -> &PenaltyActions {
        &self.abandoned_penalty
    }

    pub fn abandoned_penalty_mut(&mut self) -> &mut PenaltyActions {
        self.state.touch();
        &mut self.abandoned_penalty
    }

    /// Points the wearer has collected so far.
    pub fn points(&self) -> i32 {
        self.points
    }

    pub fn current_task(&self) -> Option<&TaskAction> {
        self.current_task.as_ref()
    }

    pub fn user_tasks(&self) -> &[TaskAction] {
        &self.user_tasks
    }

    pub fn tasks_mut(&mut self) -> &mut Vec<TaskAction> {
        self.tasks_modified = true;
        &mut self.user_tasks
    }

    pub fn tasks_modified(&self) -> bool {
        self.tasks_modified
    }

    pub(crate) fn clear_tasks_modified(&mut self) {
        self.tasks_modified = false;
    }
}

impl Extension for Tasks {
    const SLUG: ExtensionSlug = ExtensionSlug::Tasks;

    fn state(&self) -> &ExtensionState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ExtensionState {
        &mut self.state
    }

    fn to_config(&self) -> ExtensionConfigDto {
        // the remote rejects an empty task list here; the real list goes
        // through the tasks update
        let placeholder = vec![TaskAction {
            task: String::new(),
            points: 0,
        }];
        dto(
            Self::SLUG,
            self.mode,
            self.regularity,
            &TasksConfig {
                tasks: placeholder,
                enable_points: self.enable_points,
                points_required: self.points_required,
                allow_wearer_to_edit_tasks: self.allow_edit,
                prevent_wearer_from_assigning_tasks: !self.allow_assign,
                allow_wearer_to_choose_tasks: self.allow_choose,
                allow_wearer_to_configure_tasks: self.allow_configure,
                start_vote_after_last_vote: false,
                vote_enabled: false,
                vote_duration: DEFAULT_VOTE_SECS,
                punishments_on_abandoned_task: self.abandoned_penalty.to_punishments(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn party() -> ExtensionParty {
        serde_json::from_value(json!({
            "_id": "t1",
            "slug": "tasks",
            "mode": "non_cumulative",
            "regularity": 3600,
            "config": {
                "enablePoints": true,
                "pointsRequired": 10,
                "preventWearerFromAssigningTasks": true,
                "punishmentsOnAbandonedTask": [ { "name": "freeze" } ]
            },
            "userData": {
                "userTasks": [ { "task": "clean", "points": 2 } ],
                "points": 4
            }
        }))
        .unwrap()
    }

    #[test]
    fn reads_config_and_user_data() {
        let t = Tasks::from_party(Some(&party()));
        assert!(t.enable_points());
        assert_eq!(t.points_required(), 10);
        assert!(!t.allow_assign());
        assert!(t.abandoned_penalty().freeze);
        assert_eq!(t.user_tasks().len(), 1);
        assert_eq!(t.points(), 4);
    }

    #[test]
    fn task_list_edits_are_tracked_even_when_disabled() {
        let mut t = Tasks::from_party(None);
        assert!(!t.is_enabled());
        t.tasks_mut().push(TaskAction {
            task: "read".into(),
            points: 1,
        });
        assert!(t.tasks_modified());
        assert!(!t.is_modified());
        t.clear_tasks_modified();
        assert!(!t.tasks_modified());
    }

    #[test]
    fn config_carries_placeholder_task_and_inverted_assign_flag() {
        let t = Tasks::from_party(Some(&party()));
        let cfg = t.to_config();
        assert_eq!(cfg.config["tasks"], json!([{ "task": "", "points": 0 }]));
        assert_eq!(cfg.config["preventWearerFromAssigningTasks"], true);
        assert_eq!(cfg.config["voteDuration"], 43200);
        assert_eq!(cfg.config["punishmentsOnAbandonedTask"], json!([{ "name": "freeze" }]));
    }
}
