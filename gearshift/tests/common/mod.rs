#![allow(dead_code)]

use {
    anyhow::bail,
    gearshift::{
        config::{NetworkConfig, SessionConfig},
        level::LevelInspector,
        network::{AdapterControl, AdapterInfo, ConnectivityProber},
        region::{LEVEL, PROGRESS_BAR, UPGRADE_BUTTON},
        ColorClassifier, NetworkManager, Orchestrator, ProgressBarState, Region, RegionMapping,
        RegionStore, WindowProvider, WindowSize,
    },
    image::{Rgba, RgbaImage},
    std::{
        collections::{BTreeSet, VecDeque},
        fmt,
        sync::{
            atomic::{AtomicBool, AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration,
    },
    tracing::{
        field::{Field, Visit},
        Event, Level, Subscriber,
    },
    tracing_subscriber::{layer::Context, prelude::*, Layer},
};

pub const WINDOW_SIZE: WindowSize = WindowSize {
    width: 320,
    height: 200,
};

pub fn regions() -> RegionMapping {
    RegionMapping::from([
        (PROGRESS_BAR.to_string(), Region::new(20, 150, 200, 10)),
        (UPGRADE_BUTTON.to_string(), Region::new(250, 160, 50, 30)),
        (LEVEL.to_string(), Region::new(10, 10, 16, 16)),
    ])
}

pub fn state_color(state: ProgressBarState) -> Rgba<u8> {
    match state {
        ProgressBarState::Fail => Rgba([210, 30, 30, 255]),
        ProgressBarState::Progress => Rgba([240, 200, 30, 255]),
        ProgressBarState::Standby => Rgba([15, 15, 20, 255]),
        ProgressBarState::ConnectionError => Rgba([30, 90, 220, 255]),
        ProgressBarState::Unknown => Rgba([128, 128, 128, 255]),
    }
}

/// Renders a window whose progress bar shows `state`.
pub fn render(state: ProgressBarState) -> RgbaImage {
    let mut image = RgbaImage::from_pixel(
        WINDOW_SIZE.width,
        WINDOW_SIZE.height,
        Rgba([90, 110, 100, 255]),
    );
    let bar = regions()[PROGRESS_BAR];
    for y in bar.top..bar.top + bar.height {
        for x in bar.left..bar.left + bar.width {
            image.put_pixel(x, y, state_color(state));
        }
    }
    image
}

#[derive(Default)]
struct WindowData {
    missing: AtomicBool,
    hold_last: AtomicBool,
    frames: Mutex<VecDeque<ProgressBarState>>,
    last: Mutex<Option<ProgressBarState>>,
    captures: AtomicUsize,
    activations: AtomicUsize,
    clicks: Mutex<Vec<Region>>,
}

/// A window that plays back a scripted sequence of progress bar states, one per capture.
#[derive(Clone, Default)]
pub struct ScriptedWindow(Arc<WindowData>);

impl ScriptedWindow {
    pub fn new(states: &[ProgressBarState]) -> Self {
        let this = Self::default();
        this.0.frames.lock().unwrap().extend(states);
        this
    }

    /// Keeps returning the last frame once the script runs out.
    pub fn holding_last(self) -> Self {
        self.0.hold_last.store(true, Ordering::SeqCst);
        self
    }

    pub fn set_missing(&self) {
        self.0.missing.store(true, Ordering::SeqCst);
    }

    pub fn captures(&self) -> usize {
        self.0.captures.load(Ordering::SeqCst)
    }

    pub fn remaining_frames(&self) -> usize {
        self.0.frames.lock().unwrap().len()
    }

    pub fn activations(&self) -> usize {
        self.0.activations.load(Ordering::SeqCst)
    }

    pub fn clicks(&self) -> Vec<Region> {
        self.0.clicks.lock().unwrap().clone()
    }
}

impl WindowProvider for ScriptedWindow {
    fn window_exists(&self) -> anyhow::Result<bool> {
        Ok(!self.0.missing.load(Ordering::SeqCst))
    }

    fn window_size(&self) -> anyhow::Result<WindowSize> {
        Ok(WINDOW_SIZE)
    }

    fn activate(&self) -> anyhow::Result<()> {
        self.0.activations.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn capture(&self) -> anyhow::Result<RgbaImage> {
        self.0.captures.fetch_add(1, Ordering::SeqCst);
        let next = self.0.frames.lock().unwrap().pop_front();
        let mut last = self.0.last.lock().unwrap();
        let state = match (next, *last) {
            (Some(state), _) => state,
            (None, Some(state)) if self.0.hold_last.load(Ordering::SeqCst) => state,
            _ => bail!("frame script exhausted"),
        };
        *last = Some(state);
        Ok(render(state))
    }

    fn click(&self, region: &Region) -> anyhow::Result<()> {
        self.0.clicks.lock().unwrap().push(*region);
        Ok(())
    }
}

pub struct FixedRegions(pub Option<RegionMapping>);

impl RegionStore for FixedRegions {
    fn get_region_mapping(&self, size: WindowSize) -> anyhow::Result<Option<RegionMapping>> {
        assert_eq!(size, WINDOW_SIZE);
        Ok(self.0.clone())
    }
}

#[derive(Default)]
struct NetworkData {
    adapters: Vec<String>,
    broken: BTreeSet<String>,
    disabled: Mutex<BTreeSet<String>>,
    other_path_online: AtomicBool,
    list_calls: AtomicUsize,
    probes: AtomicUsize,
    toggles: Mutex<Vec<(String, bool)>>,
}

/// Simulated adapters. The machine is online while any adapter is enabled or another
/// network path is up.
#[derive(Clone, Default)]
pub struct FakeNetwork(Arc<NetworkData>);

impl FakeNetwork {
    pub fn new(adapters: &[&str]) -> Self {
        Self(Arc::new(NetworkData {
            adapters: adapters.iter().map(|s| s.to_string()).collect(),
            ..NetworkData::default()
        }))
    }

    /// Adapters whose toggles fail.
    pub fn with_broken(adapters: &[&str], broken: &[&str]) -> Self {
        Self(Arc::new(NetworkData {
            adapters: adapters.iter().map(|s| s.to_string()).collect(),
            broken: broken.iter().map(|s| s.to_string()).collect(),
            ..NetworkData::default()
        }))
    }

    pub fn set_other_path_online(&self, value: bool) {
        self.0.other_path_online.store(value, Ordering::SeqCst);
    }

    pub fn toggles(&self) -> Vec<(String, bool)> {
        self.0.toggles.lock().unwrap().clone()
    }

    pub fn list_calls(&self) -> usize {
        self.0.list_calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.0.probes.load(Ordering::SeqCst)
    }

    pub fn is_disabled(&self, id: &str) -> bool {
        self.0.disabled.lock().unwrap().contains(id)
    }

    pub fn manager(&self) -> NetworkManager {
        NetworkManager::new(
            Arc::new(self.clone()),
            Arc::new(self.clone()),
            network_config(),
        )
    }
}

impl AdapterControl for FakeNetwork {
    fn list_adapters(&self) -> anyhow::Result<Vec<AdapterInfo>> {
        self.0.list_calls.fetch_add(1, Ordering::SeqCst);
        let disabled = self.0.disabled.lock().unwrap();
        Ok(self
            .0
            .adapters
            .iter()
            .map(|id| AdapterInfo {
                device_id: id.clone(),
                name: format!("Adapter {id}"),
                enabled: Some(!disabled.contains(id)),
            })
            .collect())
    }

    fn set_enabled(&self, adapter_id: &str, enable: bool) -> anyhow::Result<()> {
        self.0
            .toggles
            .lock()
            .unwrap()
            .push((adapter_id.to_string(), enable));
        if self.0.broken.contains(adapter_id) {
            bail!("access denied");
        }
        let mut disabled = self.0.disabled.lock().unwrap();
        if enable {
            disabled.remove(adapter_id);
        } else {
            disabled.insert(adapter_id.to_string());
        }
        Ok(())
    }
}

impl ConnectivityProber for FakeNetwork {
    fn is_online(&self, _timeout: Duration) -> bool {
        self.0.probes.fetch_add(1, Ordering::SeqCst);
        let disabled = self.0.disabled.lock().unwrap();
        self.0.other_path_online.load(Ordering::SeqCst)
            || self.0.adapters.iter().any(|id| !disabled.contains(id))
    }
}

/// Returns the scripted levels in order.
pub struct ScriptedLevels(pub Mutex<VecDeque<u32>>);

impl ScriptedLevels {
    pub fn new(levels: &[u32]) -> Self {
        Self(Mutex::new(levels.iter().copied().collect()))
    }
}

impl LevelInspector for ScriptedLevels {
    fn get_item_level(&self, frame: &RgbaImage) -> anyhow::Result<u32> {
        assert_eq!(frame.dimensions(), (16, 16));
        match self.0.lock().unwrap().pop_front() {
            Some(level) => Ok(level),
            None => bail!("level script exhausted"),
        }
    }
}

pub fn network_config() -> NetworkConfig {
    NetworkConfig {
        poll_interval_ms: 1,
        disable_timeout_ms: 50,
        enable_timeout_ms: 50,
        ..NetworkConfig::default()
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        poll_interval_ms: 0,
        attempt_start_timeout_ms: 30,
        debug_frames_dir: None,
    }
}

pub fn orchestrator(window: &ScriptedWindow, net: &FakeNetwork) -> Orchestrator {
    orchestrator_with_regions(window, net, Some(regions()))
}

pub fn orchestrator_with_regions(
    window: &ScriptedWindow,
    net: &FakeNetwork,
    regions: Option<RegionMapping>,
) -> Orchestrator {
    Orchestrator::new(
        Box::new(window.clone()),
        Box::new(FixedRegions(regions)),
        Box::new(ColorClassifier::default()),
        net.manager(),
    )
    .with_config(session_config())
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            *self.0 = format!("{value:?}");
        }
    }
}

/// Collects the messages of `WARN` events.
#[derive(Clone, Default)]
pub struct Warnings(Arc<Mutex<Vec<String>>>);

impl Warnings {
    pub fn messages(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl<S: Subscriber> Layer<S> for Warnings {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut message = String::new();
            event.record(&mut MessageVisitor(&mut message));
            self.0.lock().unwrap().push(message);
        }
    }
}

/// Runs `f` and returns its result with the warnings it logged on this thread.
pub fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
    let warnings = Warnings::default();
    let subscriber = tracing_subscriber::registry().with(warnings.clone());
    let value = tracing::subscriber::with_default(subscriber, f);
    (value, warnings.messages())
}
