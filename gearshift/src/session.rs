use {
    crate::{
        config::SessionConfig,
        error::{Error, Result},
        level::{LevelInspector, CONTINUE_UPGRADE_MIN_LEVEL},
        monitor::{validate_max_attempts, AttemptMonitor},
        network::NetworkManager,
        progress_bar::{ProgressBarState, StateClassifier},
        recorder::FrameRecorder,
        region::{
            required_region, Region, RegionMapping, RegionStore, WindowSize, LEVEL, PROGRESS_BAR,
            UPGRADE_BUTTON,
        },
        stop::StopReason,
        window::WindowProvider,
    },
    image::RgbaImage,
    serde::{Deserialize, Serialize},
    std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        thread::sleep,
        time::Instant,
    },
    tracing::{info, warn},
};

/// Cooperative cancellation flag, checked once per monitoring loop iteration.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountResult {
    pub fail_count: u32,
    pub stop_reason: StopReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendResult {
    pub upgrade_count: u32,
    pub attempt_count: u32,
    pub remaining_attempts: u32,
    pub stop_reason: StopReason,
}

/// Resets the orchestrator's "session in progress" flag when a session ends.
struct ActiveSession<'a>(&'a AtomicBool);

impl Drop for ActiveSession<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Runs count and spend sessions against the target window, one at a time.
pub struct Orchestrator {
    window: Box<dyn WindowProvider>,
    regions: Box<dyn RegionStore>,
    classifier: Box<dyn StateClassifier>,
    network: NetworkManager,
    level_inspector: Option<Box<dyn LevelInspector>>,
    config: SessionConfig,
    active: AtomicBool,
}

impl Orchestrator {
    pub fn new(
        window: Box<dyn WindowProvider>,
        regions: Box<dyn RegionStore>,
        classifier: Box<dyn StateClassifier>,
        network: NetworkManager,
    ) -> Self {
        Self {
            window,
            regions,
            classifier,
            network,
            level_inspector: None,
            config: SessionConfig::default(),
            active: AtomicBool::new(false),
        }
    }

    pub fn with_level_inspector(mut self, inspector: Box<dyn LevelInspector>) -> Self {
        self.level_inspector = Some(inspector);
        self
    }

    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    pub fn network(&self) -> &NetworkManager {
        &self.network
    }

    pub fn is_session_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn begin(&self) -> Result<ActiveSession<'_>> {
        self.active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| Error::SessionInProgress)?;
        Ok(ActiveSession(&self.active))
    }

    fn ensure_window(&self) -> Result<()> {
        if !self.window.window_exists()? {
            return Err(Error::WindowNotFound);
        }
        Ok(())
    }

    fn region_mapping(&self) -> Result<(WindowSize, RegionMapping)> {
        let size = self.window.window_size()?;
        let mapping = self
            .regions
            .get_region_mapping(size)?
            .ok_or(Error::RegionsUnavailable(size))?;
        Ok((size, mapping))
    }

    fn capture_region(&self, region: &Region) -> Result<RgbaImage> {
        let image = self.window.capture()?;
        Ok(region.crop(&image))
    }

    fn wait_next_frame(&self, cancel: &CancelToken) -> Result<()> {
        sleep(self.config.poll_interval());
        if cancel.is_cancelled() {
            info!("session cancelled");
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Clicks upgrade once with the adapters disabled and counts failures until the
    /// upgrade succeeds, the bar shows a connection error or `max_attempts` failures
    /// were seen.
    ///
    /// The adapters are re-enabled on every exit path, including errors and
    /// cancellation. An item that upgrades on the very first attempt is reported as a
    /// success with zero failures.
    pub fn run_count_session(
        &self,
        adapter_ids: &[String],
        max_attempts: i64,
        cancel: &CancelToken,
    ) -> Result<CountResult> {
        let _session = self.begin()?;
        let mut monitor = AttemptMonitor::new(&*self.classifier, max_attempts)?;
        self.ensure_window()?;
        let (size, mapping) = self.region_mapping()?;
        let progress_bar = required_region(&mapping, PROGRESS_BAR, size)?;
        let upgrade_button = required_region(&mapping, UPGRADE_BUTTON, size)?;

        info!(
            "count session started (max attempts: {})",
            monitor.max_attempts()
        );
        let guard = self.network.disable_scoped(adapter_ids)?;
        let result = self.count_failures(&mut monitor, &progress_bar, &upgrade_button, cancel);
        match guard.release() {
            Ok(true) => {}
            Ok(false) => warn!("some network adapters could not be re-enabled"),
            Err(err) => warn!("failed to restore network adapters: {err}"),
        }

        let stop_reason = result?;
        info!(
            "count session finished: {} failures, {}",
            monitor.fail_count(),
            stop_reason
        );
        Ok(CountResult {
            fail_count: monitor.fail_count(),
            stop_reason,
        })
    }

    fn count_failures(
        &self,
        monitor: &mut AttemptMonitor<'_>,
        progress_bar: &Region,
        upgrade_button: &Region,
        cancel: &CancelToken,
    ) -> Result<StopReason> {
        self.window.activate()?;
        self.window.click(upgrade_button)?;
        let mut recorder = FrameRecorder::new(self.config.debug_frames_dir.clone());
        loop {
            let frame = self.capture_region(progress_bar)?;
            let state = monitor.process_frame(&frame)?;
            recorder.record(&frame, state);
            if let Some(reason) = monitor.stop_reason() {
                return Ok(reason);
            }
            self.wait_next_frame(cancel)?;
        }
    }

    /// Spends up to `max_attempts` online upgrade attempts, stopping at the first success.
    ///
    /// With `continue_upgrade`, a success on an item at level 10 or above doesn't stop
    /// the session; attempts continue until the budget runs out or a success leaves the
    /// item below that level.
    pub fn run_spend_session(
        &self,
        max_attempts: i64,
        continue_upgrade: bool,
        cancel: &CancelToken,
    ) -> Result<SpendResult> {
        let _session = self.begin()?;
        let max_attempts = validate_max_attempts(max_attempts)?;
        let inspector = if continue_upgrade {
            Some(self.level_inspector.as_deref().ok_or_else(|| {
                Error::InvalidConfiguration(
                    "continuing upgrades requires a level inspector".into(),
                )
            })?)
        } else {
            None
        };
        self.ensure_window()?;
        if !self.network.is_online() {
            return Err(Error::NoConnectivity);
        }
        let (size, mapping) = self.region_mapping()?;
        let progress_bar = required_region(&mapping, PROGRESS_BAR, size)?;
        let upgrade_button = required_region(&mapping, UPGRADE_BUTTON, size)?;
        let level_check = match inspector {
            Some(inspector) => Some((inspector, required_region(&mapping, LEVEL, size)?)),
            None => None,
        };

        info!("spend session started (max attempts: {})", max_attempts);
        self.window.activate()?;
        let mut recorder = FrameRecorder::new(self.config.debug_frames_dir.clone());
        let mut upgrade_count = 0;
        let mut attempt_count = 0;
        let mut carryover = None;
        let stop_reason = loop {
            if attempt_count >= max_attempts {
                break StopReason::MaxAttemptsReached;
            }
            if cancel.is_cancelled() {
                info!("session cancelled");
                return Err(Error::Cancelled);
            }
            self.window.click(&upgrade_button)?;
            match self.resolve_attempt(&progress_bar, carryover, &mut recorder, cancel)? {
                StopReason::ConnectionError => break StopReason::ConnectionError,
                StopReason::MaxAttemptsReached => {
                    attempt_count += 1;
                    carryover = Some(ProgressBarState::Fail);
                    info!("attempt {}/{} failed", attempt_count, max_attempts);
                }
                StopReason::Success => {
                    attempt_count += 1;
                    upgrade_count += 1;
                    carryover = None;
                    info!("upgraded on attempt {}/{}", attempt_count, max_attempts);
                    let Some((inspector, level_region)) = &level_check else {
                        break StopReason::Success;
                    };
                    let level = inspector.get_item_level(&self.capture_region(level_region)?)?;
                    if level < CONTINUE_UPGRADE_MIN_LEVEL {
                        info!("item level is {}, stopping", level);
                        break StopReason::Success;
                    }
                    info!("item level is {}, continuing", level);
                }
            }
        };

        info!(
            "spend session finished: {} upgrades in {} attempts, {}",
            upgrade_count, attempt_count, stop_reason
        );
        Ok(SpendResult {
            upgrade_count,
            attempt_count,
            remaining_attempts: max_attempts - attempt_count,
            stop_reason,
        })
    }

    /// Monitors a single clicked attempt until it fails, succeeds or hits a connection
    /// error. A failed attempt resolves as [`StopReason::MaxAttemptsReached`].
    ///
    /// Frames are ignored until the bar leaves standby. `carryover` is the previous
    /// attempt's final visual, which is also ignored until the bar moves on. A standby or
    /// unknown frame after it counts as moving on, so a new failure seen next is this
    /// attempt's. A failure that replaces the previous one with no frame in between can't be
    /// told apart from it and ends in [`Error::AttemptNotStarted`].
    fn resolve_attempt(
        &self,
        progress_bar: &Region,
        mut carryover: Option<ProgressBarState>,
        recorder: &mut FrameRecorder,
        cancel: &CancelToken,
    ) -> Result<StopReason> {
        let mut monitor = AttemptMonitor::new(&*self.classifier, 1)?;
        let timeout = self.config.attempt_start_timeout();
        let started = Instant::now();
        let mut in_flight = false;
        loop {
            let frame = self.capture_region(progress_bar)?;
            let state = self.classifier.classify(&frame)?;
            recorder.record(&frame, state);
            if !in_flight {
                let idle = if matches!(state, ProgressBarState::Standby | ProgressBarState::Unknown)
                {
                    carryover = None;
                    true
                } else {
                    Some(state) == carryover
                };
                if !idle {
                    in_flight = true;
                } else if started.elapsed() >= timeout {
                    return Err(Error::AttemptNotStarted(timeout));
                }
            }
            if in_flight {
                monitor.record_state(state);
                if let Some(reason) = monitor.stop_reason() {
                    return Ok(reason);
                }
            }
            self.wait_next_frame(cancel)?;
        }
    }
}
