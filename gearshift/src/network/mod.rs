mod adapter;
mod probe;

pub use self::{
    adapter::{AdapterControl, AdapterInfo, WmiAdapterControl},
    probe::{ConnectivityProber, DnsHttpProber},
};

use {
    crate::{
        config::NetworkConfig,
        error::{Error, Result},
    },
    itertools::Itertools,
    std::{
        collections::BTreeSet,
        sync::Arc,
        thread::sleep,
        time::{Duration, Instant},
    },
    strum::Display,
    tracing::{info, warn},
};

/// Aggregate reachability of the internet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum NetworkState {
    Online,
    Offline,
}

impl NetworkState {
    pub fn from_online(online: bool) -> Self {
        if online {
            Self::Online
        } else {
            Self::Offline
        }
    }
}

/// Toggles network adapters and waits for the resulting connectivity change.
pub struct NetworkManager {
    control: Arc<dyn AdapterControl>,
    prober: Arc<dyn ConnectivityProber>,
    config: NetworkConfig,
}

impl NetworkManager {
    pub fn new(
        control: Arc<dyn AdapterControl>,
        prober: Arc<dyn ConnectivityProber>,
        config: NetworkConfig,
    ) -> Self {
        Self {
            control,
            prober,
            config,
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn is_online(&self) -> bool {
        self.prober.is_online(self.config.probe_timeout())
    }

    /// Splits `adapter_ids` into known and unknown ids, warning about each unknown one.
    pub fn partition_adapter_ids<'a>(
        &self,
        adapter_ids: &'a [String],
    ) -> Result<(Vec<&'a str>, Vec<&'a str>)> {
        let known: BTreeSet<String> = self
            .control
            .list_adapters()?
            .into_iter()
            .map(|adapter| adapter.device_id)
            .collect();
        let (valid, invalid): (Vec<&str>, Vec<&str>) = adapter_ids
            .iter()
            .map(|id| id.as_str())
            .partition(|id| known.contains(*id));
        for id in &invalid {
            warn!("ignoring unknown network adapter {:?}", id);
        }
        Ok((valid, invalid))
    }

    /// Enables or disables the given adapters one by one.
    ///
    /// An empty id list is a no-op that succeeds. Returns `false` if none of the ids is
    /// a known adapter or if any toggle failed. With `wait`, blocks until connectivity
    /// matches the requested state or fails with [`Error::NetworkStateTimeout`]; the
    /// toggle is not rolled back in that case.
    pub fn toggle_adapters(
        &self,
        adapter_ids: &[String],
        enable: bool,
        wait: bool,
        timeout: Option<Duration>,
    ) -> Result<bool> {
        if adapter_ids.is_empty() {
            return Ok(true);
        }
        let (valid, _invalid) = self.partition_adapter_ids(adapter_ids)?;
        if valid.is_empty() {
            warn!("no valid network adapters in {:?}", adapter_ids);
            return Ok(false);
        }

        let verb = if enable { "enabling" } else { "disabling" };
        info!("{} network adapters: {}", verb, valid.iter().join(", "));
        let mut all_toggled = true;
        for id in &valid {
            if let Err(err) = self.control.set_enabled(id, enable) {
                warn!("failed {} adapter {}: {:?}", verb, id, err);
                all_toggled = false;
            }
        }

        let expected = NetworkState::from_online(enable);
        if wait {
            let timeout = timeout.unwrap_or_else(|| self.config.default_timeout(expected));
            self.wait_for_network_state(expected, timeout)?;
        } else if !enable && self.is_online() {
            warn!("still online after disabling adapters, another network path may be active");
        }
        Ok(all_toggled)
    }

    /// Polls connectivity until the required number of consecutive probes agree with
    /// `expected`.
    pub fn wait_for_network_state(&self, expected: NetworkState, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        let mut consecutive = 0;
        loop {
            let state = NetworkState::from_online(self.is_online());
            if state == expected {
                consecutive += 1;
                if consecutive >= self.config.required_consecutive {
                    info!("network is {}", expected);
                    return Ok(());
                }
            } else {
                consecutive = 0;
            }
            if started.elapsed() >= timeout {
                return Err(Error::NetworkStateTimeout { expected, timeout });
            }
            sleep(self.config.poll_interval());
        }
    }

    /// Disables the adapters and returns a guard that re-enables them.
    ///
    /// Fails with [`Error::InvalidConfiguration`] if none of the ids is a known adapter or
    /// an adapter refused to be disabled. On any failure the guard is dropped before
    /// returning the error, so adapters disabled so far are re-enabled.
    pub fn disable_scoped(&self, adapter_ids: &[String]) -> Result<NetworkGuard<'_>> {
        let guard = NetworkGuard {
            manager: self,
            adapter_ids: adapter_ids.to_vec(),
            released: adapter_ids.is_empty(),
        };
        if !self.toggle_adapters(adapter_ids, false, true, None)? {
            return Err(Error::InvalidConfiguration(format!(
                "could not disable network adapters {:?}",
                adapter_ids
            )));
        }
        Ok(guard)
    }
}

/// Keeps adapters disabled until released or dropped.
#[must_use = "dropping the guard re-enables the adapters immediately"]
pub struct NetworkGuard<'a> {
    manager: &'a NetworkManager,
    adapter_ids: Vec<String>,
    released: bool,
}

impl std::fmt::Debug for NetworkGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkGuard")
            .field("adapter_ids", &self.adapter_ids)
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}

impl NetworkGuard<'_> {
    pub fn adapter_ids(&self) -> &[String] {
        &self.adapter_ids
    }

    /// Re-enables the adapters and waits for connectivity to return.
    pub fn release(mut self) -> Result<bool> {
        self.released = true;
        self.manager
            .toggle_adapters(&self.adapter_ids, true, true, None)
    }
}

impl Drop for NetworkGuard<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self
            .manager
            .toggle_adapters(&self.adapter_ids, true, true, None)
        {
            warn!("failed to re-enable network adapters: {err:?}");
        }
    }
}
