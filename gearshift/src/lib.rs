//! Upgrade-attempt monitoring for the offline upgrade trick.
//!
//! A count session disables the network, clicks upgrade once and counts how many
//! attempts fail before one succeeds. A spend session, run online on a different item,
//! burns that many attempts. [`Orchestrator`] runs both against a [`WindowProvider`],
//! classifying the progress bar with a [`StateClassifier`] and feeding the states to
//! an [`AttemptMonitor`].

pub mod config;
mod error;
pub mod history;
pub mod level;
pub mod monitor;
pub mod network;
pub mod progress_bar;
mod recorder;
pub mod region;
pub mod session;
pub mod stop;
pub mod window;

pub use crate::{
    config::Config,
    error::{Error, Result},
    level::{LevelInspector, TemplateLevelInspector},
    monitor::AttemptMonitor,
    network::{NetworkGuard, NetworkManager},
    progress_bar::{ColorClassifier, ProgressBarState, StateClassifier},
    region::{JsonRegionStore, Region, RegionMapping, RegionStore, WindowSize},
    session::{CancelToken, CountResult, Orchestrator, SpendResult},
    stop::StopReason,
    window::WindowProvider,
};
