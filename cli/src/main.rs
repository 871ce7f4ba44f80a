mod desktop;

use {
    crate::desktop::DesktopWindow,
    anyhow::{bail, Context as _},
    clap::{Parser, Subcommand},
    gearshift::{
        network::{AdapterControl, DnsHttpProber, WmiAdapterControl},
        CancelToken, Config, Error, JsonRegionStore, NetworkManager, Orchestrator, Region,
        RegionStore, TemplateLevelInspector, WindowProvider, WindowSize,
    },
    itertools::Itertools,
    serde::Serialize,
    std::{path::PathBuf, process, sync::Arc},
    tracing::{error, info, warn},
    tracing_subscriber::{filter::LevelFilter, EnvFilter},
};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Args {
    /// JSON config file. Defaults are used when it doesn't exist.
    #[clap(long, global = true, default_value = "gearshift.json")]
    config: PathBuf,
    /// Overrides the window title from the config.
    #[clap(long, global = true)]
    window_title: Option<String>,
    /// Saves progress bar crops on every state change.
    #[clap(long, global = true)]
    debug_frames: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Disables the adapters, clicks upgrade once and counts failed attempts.
    Count {
        #[clap(long, default_value_t = 10)]
        max_attempts: i64,
        /// Adapter device ids to disable. See `gearshift adapters`.
        #[clap(long = "adapter", required = true)]
        adapters: Vec<String>,
    },
    /// Spends attempts online until the first success.
    Spend {
        #[clap(long)]
        max_attempts: i64,
        /// Keeps going after a success while the item level stays at 10 or above.
        #[clap(long)]
        continue_upgrade: bool,
    },
    /// Lists physical network adapters.
    Adapters,
    /// Shows or edits the region calibration for the current window size.
    Regions {
        #[command(subcommand)]
        action: Option<RegionsAction>,
    },
    /// Saves a capture of the target window for calibrating regions.
    Capture { output: PathBuf },
    /// Reports whether the internet is reachable.
    Probe,
}

#[derive(Debug, Subcommand)]
enum RegionsAction {
    Set {
        name: String,
        left: u32,
        top: u32,
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Serialize)]
struct RegionsResponse {
    window_size: WindowSize,
    regions: Option<gearshift::RegionMapping>,
}

#[derive(Debug, Serialize)]
struct ProbeResponse {
    online: bool,
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if args.config.try_exists()? {
        Config::load(&args.config)?
    } else {
        info!("config {:?} not found, using defaults", args.config);
        Config::default()
    };
    if let Some(title) = &args.window_title {
        config.window_title = title.clone();
    }
    if let Some(dir) = &args.debug_frames {
        config.session.debug_frames_dir = Some(dir.clone());
    }
    Ok(config)
}

fn network_manager(config: &Config) -> NetworkManager {
    NetworkManager::new(
        Arc::new(WmiAdapterControl::new()),
        Arc::new(DnsHttpProber::new(
            config.network.dns_probe_addrs.clone(),
            config.network.http_probe_url.clone(),
        )),
        config.network.clone(),
    )
}

fn window_title(config: &Config) -> anyhow::Result<&str> {
    if config.window_title.is_empty() {
        bail!("window title is not configured, pass --window-title");
    }
    Ok(&config.window_title)
}

fn desktop_window(config: &Config) -> anyhow::Result<DesktopWindow> {
    Ok(DesktopWindow::new(
        winctl::Context::new()?,
        window_title(config)?,
    ))
}

fn orchestrator(config: &Config) -> anyhow::Result<Orchestrator> {
    let mut orchestrator = Orchestrator::new(
        Box::new(desktop_window(config)?),
        Box::new(JsonRegionStore::new(&config.regions_path)),
        Box::new(config.classifier.clone()),
        network_manager(config),
    )
    .with_config(config.session.clone());
    if let Some(dir) = &config.level_templates_dir {
        let inspector = TemplateLevelInspector::load(dir)
            .with_context(|| format!("failed to load level templates from {:?}", dir))?;
        orchestrator = orchestrator.with_level_inspector(Box::new(inspector));
    }
    Ok(orchestrator)
}

/// What the user can do about a failed session.
fn remediation(error: &Error) -> Option<&'static str> {
    match error {
        Error::WindowNotFound => Some("start the game and check the configured window title"),
        Error::RegionsUnavailable(_) | Error::MissingRegion { .. } => {
            Some("calibrate regions for this window size with `gearshift regions set`")
        }
        Error::NoConnectivity => Some("connect to the internet before spending attempts"),
        Error::NetworkStateTimeout { .. } => Some(
            "another network path may still be active; disable it or pass every adapter",
        ),
        Error::InvalidConfiguration(_) => Some("check the command line and the config file"),
        Error::AttemptNotStarted(_) => Some("make sure the upgrade button region is correct"),
        Error::SessionInProgress
        | Error::Cancelled
        | Error::InvalidFrame(_)
        | Error::Collaborator(_) => None,
    }
}

/// Handler for interrupt and termination signals. Cancels the session so the network
/// gets restored before exiting.
fn interrupt_handler(cancel: CancelToken) -> impl Fn() + Send + 'static {
    move || {
        if cancel.is_cancelled() {
            warn!("already cancelling, waiting for the network to be restored");
        } else {
            info!("cancelling session");
            cancel.cancel();
        }
    }
}

fn cancel_on_interrupt() -> anyhow::Result<CancelToken> {
    let cancel = CancelToken::new();
    ctrlc::set_handler(interrupt_handler(cancel.clone()))
        .context("failed to set Ctrl+C handler")?;
    Ok(cancel)
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_session<T: Serialize>(result: gearshift::Result<T>) -> anyhow::Result<()> {
    match result {
        Ok(result) => print_json(&result),
        Err(err) => {
            error!("{err}");
            if let Some(hint) = remediation(&err) {
                eprintln!("hint: {hint}");
            }
            process::exit(1);
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?,
        )
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    match args.command {
        Command::Count {
            max_attempts,
            adapters,
        } => {
            let orchestrator = orchestrator(&config)?;
            let cancel = cancel_on_interrupt()?;
            run_session(orchestrator.run_count_session(&adapters, max_attempts, &cancel))?;
        }
        Command::Spend {
            max_attempts,
            continue_upgrade,
        } => {
            let orchestrator = orchestrator(&config)?;
            let cancel = cancel_on_interrupt()?;
            run_session(orchestrator.run_spend_session(max_attempts, continue_upgrade, &cancel))?;
        }
        Command::Adapters => {
            let adapters = WmiAdapterControl::new().list_adapters()?;
            info!(
                "found adapters: {}",
                adapters.iter().map(|a| &a.device_id).join(", ")
            );
            print_json(&adapters)?;
        }
        Command::Regions { action } => {
            let window = desktop_window(&config)?;
            let window_size = window.window_size()?;
            let store = JsonRegionStore::new(&config.regions_path);
            if let Some(RegionsAction::Set {
                name,
                left,
                top,
                width,
                height,
            }) = action
            {
                store.set_region(window_size, &name, Region::new(left, top, width, height))?;
            }
            print_json(&RegionsResponse {
                window_size,
                regions: store.get_region_mapping(window_size)?,
            })?;
        }
        Command::Capture { output } => {
            let window = winctl::Context::new()?.wait_for_window(window_title(&config)?)?;
            window.capture_image()?.save(&output)?;
            info!("saved window capture to {:?}", output);
        }
        Command::Probe => {
            let online = network_manager(&config).is_online();
            print_json(&ProbeResponse { online })?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use {super::*, gearshift::network::NetworkState, std::time::Duration};

    #[test]
    fn parses_count_command() {
        let args = Args::try_parse_from([
            "gearshift",
            "count",
            "--adapter",
            "7",
            "--adapter",
            "12",
            "--window-title",
            "Gear",
        ])
        .unwrap();
        assert_eq!(args.window_title.as_deref(), Some("Gear"));
        let Command::Count {
            max_attempts,
            adapters,
        } = args.command
        else {
            panic!("unexpected command: {:?}", args.command);
        };
        assert_eq!(max_attempts, 10);
        assert_eq!(adapters, ["7", "12"]);
    }

    #[test]
    fn count_requires_adapters() {
        assert!(Args::try_parse_from(["gearshift", "count"]).is_err());
    }

    #[test]
    fn overrides_config_from_flags() {
        let args = Args::try_parse_from([
            "gearshift",
            "--config",
            "does-not-exist.json",
            "--debug-frames",
            "frames",
            "probe",
        ])
        .unwrap();
        let config = load_config(&args).unwrap();
        assert_eq!(config.session.debug_frames_dir, Some(PathBuf::from("frames")));
        assert_eq!(config.window_title, "");
    }

    #[test]
    fn interrupt_cancels_session() {
        let cancel = CancelToken::new();
        let handler = interrupt_handler(cancel.clone());
        assert!(!cancel.is_cancelled());
        handler();
        assert!(cancel.is_cancelled());
        handler();
        assert!(cancel.is_cancelled());
    }

    #[test]
    fn hints_for_network_timeout() {
        let err = Error::NetworkStateTimeout {
            expected: NetworkState::Offline,
            timeout: Duration::from_secs(5),
        };
        assert!(remediation(&err).is_some());
        assert!(remediation(&Error::Cancelled).is_none());
    }
}
