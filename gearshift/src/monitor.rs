use {
    crate::{
        error::{Error, Result},
        history::RecentStates,
        progress_bar::{ProgressBarState, StateClassifier},
        stop::{MonitorView, StopConditions, StopReason},
    },
    image::RgbaImage,
    tracing::{debug, info},
};

/// Counts failed upgrade attempts frame by frame.
///
/// Counting is edge-triggered: a run of consecutive `Fail` frames is one failure.
/// Frames must be fed in capture order. Callers must stop feeding frames as soon as
/// [`AttemptMonitor::stop_reason`] returns a value.
pub struct AttemptMonitor<'a> {
    classifier: &'a dyn StateClassifier,
    conditions: StopConditions,
    max_attempts: u32,
    fail_count: u32,
    recent_states: RecentStates,
}

impl<'a> AttemptMonitor<'a> {
    pub fn new(classifier: &'a dyn StateClassifier, max_attempts: i64) -> Result<Self> {
        Self::with_conditions(classifier, max_attempts, StopConditions::default())
    }

    pub fn with_conditions(
        classifier: &'a dyn StateClassifier,
        max_attempts: i64,
        conditions: StopConditions,
    ) -> Result<Self> {
        Ok(Self {
            classifier,
            conditions,
            max_attempts: validate_max_attempts(max_attempts)?,
            fail_count: 0,
            recent_states: RecentStates::new(),
        })
    }

    /// Classifies a cropped progress bar frame and records the result.
    pub fn process_frame(&mut self, frame: &RgbaImage) -> Result<ProgressBarState> {
        let state = self.classifier.classify(frame)?;
        self.record_state(state);
        Ok(state)
    }

    /// Records an already classified state.
    pub fn record_state(&mut self, state: ProgressBarState) {
        if state == ProgressBarState::Fail && self.current_state() != Some(ProgressBarState::Fail)
        {
            self.fail_count += 1;
            info!(
                "attempt failed ({}/{})",
                self.fail_count, self.max_attempts
            );
        } else if state == ProgressBarState::Unknown {
            debug!("progress bar state not recognized");
        }
        self.recent_states.push(state);
    }

    pub fn fail_count(&self) -> u32 {
        self.fail_count
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Last recorded state, or `None` before the first frame.
    pub fn current_state(&self) -> Option<ProgressBarState> {
        self.recent_states.last()
    }

    pub fn recent_states(&self) -> &RecentStates {
        &self.recent_states
    }

    pub fn stop_reason(&self) -> Option<StopReason> {
        self.conditions.evaluate(&MonitorView {
            fail_count: self.fail_count,
            max_attempts: self.max_attempts,
            recent_states: &self.recent_states,
        })
    }
}

/// Checks that an attempt budget is positive and fits the counter.
pub fn validate_max_attempts(max_attempts: i64) -> Result<u32> {
    if max_attempts <= 0 {
        return Err(Error::InvalidConfiguration(format!(
            "max_attempts must be positive, got {max_attempts}"
        )));
    }
    u32::try_from(max_attempts).map_err(|_| {
        Error::InvalidConfiguration(format!("max_attempts is too large: {max_attempts}"))
    })
}
