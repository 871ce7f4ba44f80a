use {
    crate::{history::RecentStates, progress_bar::ProgressBarState},
    serde::{Deserialize, Serialize},
    strum::{Display, EnumString, IntoStaticStr},
};

/// Why a monitoring session ended.
///
/// The string forms are a persisted contract: `max_attempts_reached`, `upgraded` and
/// `connection_error`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize,
)]
pub enum StopReason {
    #[strum(serialize = "max_attempts_reached")]
    #[serde(rename = "max_attempts_reached")]
    MaxAttemptsReached,
    #[strum(serialize = "upgraded")]
    #[serde(rename = "upgraded")]
    Success,
    #[strum(serialize = "connection_error")]
    #[serde(rename = "connection_error")]
    ConnectionError,
}

impl StopReason {
    pub fn as_str(self) -> &'static str {
        self.into()
    }
}

/// Read-only view of monitor state that stop conditions are evaluated against.
#[derive(Debug, Clone, Copy)]
pub struct MonitorView<'a> {
    pub fail_count: u32,
    pub max_attempts: u32,
    pub recent_states: &'a RecentStates,
}

pub trait StopCondition: Send + Sync {
    fn evaluate(&self, view: &MonitorView<'_>) -> Option<StopReason>;
}

/// Fires once the fail counter reaches the attempt budget.
pub struct MaxAttempts;

impl StopCondition for MaxAttempts {
    fn evaluate(&self, view: &MonitorView<'_>) -> Option<StopReason> {
        (view.fail_count >= view.max_attempts).then_some(StopReason::MaxAttemptsReached)
    }
}

/// Fires when the whole history holds the same state.
///
/// Any other state in the window, `Unknown` included, breaks the run.
pub struct SustainedState {
    pub state: ProgressBarState,
    pub reason: StopReason,
}

impl StopCondition for SustainedState {
    fn evaluate(&self, view: &MonitorView<'_>) -> Option<StopReason> {
        view.recent_states
            .all_equal(self.state)
            .then_some(self.reason)
    }
}

/// Ordered chain of stop conditions. The first one that fires wins.
pub struct StopConditions(Vec<Box<dyn StopCondition>>);

impl StopConditions {
    pub fn new(conditions: Vec<Box<dyn StopCondition>>) -> Self {
        Self(conditions)
    }

    pub fn evaluate(&self, view: &MonitorView<'_>) -> Option<StopReason> {
        self.0.iter().find_map(|condition| condition.evaluate(view))
    }
}

impl Default for StopConditions {
    /// Budget exhaustion takes precedence over a same-frame success or error.
    fn default() -> Self {
        Self::new(vec![
            Box::new(MaxAttempts),
            Box::new(SustainedState {
                state: ProgressBarState::Standby,
                reason: StopReason::Success,
            }),
            Box::new(SustainedState {
                state: ProgressBarState::ConnectionError,
                reason: StopReason::ConnectionError,
            }),
        ])
    }
}
