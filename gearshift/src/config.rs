use {
    crate::{network::NetworkState, progress_bar::ColorClassifier},
    anyhow::Context as _,
    serde::{Deserialize, Serialize},
    std::{
        net::SocketAddr,
        path::{Path, PathBuf},
        time::Duration,
    },
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Substring of the target window title.
    pub window_title: String,
    pub regions_path: PathBuf,
    /// Directory with `<level>.png` captures of the level region.
    pub level_templates_dir: Option<PathBuf>,
    pub classifier: ColorClassifier,
    pub session: SessionConfig,
    pub network: NetworkConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            window_title: String::new(),
            regions_path: PathBuf::from("regions.json"),
            level_templates_dir: None,
            classifier: ColorClassifier::default(),
            session: SessionConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}

impl Config {
    /// Loads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs_err::read_to_string(path)?;
        serde_json::from_str(&text).with_context(|| format!("failed to parse config {:?}", path))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub poll_interval_ms: u64,
    /// How long a spend attempt may stay in standby after the click.
    pub attempt_start_timeout_ms: u64,
    /// Saves progress bar crops on every state change when set.
    pub debug_frames_dir: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            attempt_start_timeout_ms: 3000,
            debug_frames_dir: None,
        }
    }
}

impl SessionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn attempt_start_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_start_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub poll_interval_ms: u64,
    /// Consecutive matching probes needed to confirm a state change.
    pub required_consecutive: u32,
    pub disable_timeout_ms: u64,
    pub enable_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub dns_probe_addrs: Vec<SocketAddr>,
    pub http_probe_url: Option<String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
            required_consecutive: 2,
            disable_timeout_ms: 5000,
            enable_timeout_ms: 10000,
            probe_timeout_ms: 1000,
            dns_probe_addrs: vec![
                SocketAddr::from(([1, 1, 1, 1], 53)),
                SocketAddr::from(([8, 8, 8, 8], 53)),
            ],
            http_probe_url: Some("http://www.msftconnecttest.com/connecttest.txt".into()),
        }
    }
}

impl NetworkConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// Enabling takes longer because the link has to come back up.
    pub fn default_timeout(&self, expected: NetworkState) -> Duration {
        match expected {
            NetworkState::Online => Duration::from_millis(self.enable_timeout_ms),
            NetworkState::Offline => Duration::from_millis(self.disable_timeout_ms),
        }
    }
}
