#[cfg(not(target_os = "windows"))]
mod linux;
#[cfg(not(target_os = "windows"))]
use crate::linux as imp;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use crate::windows as imp;

mod window;

pub use crate::window::Window;

use {
    anyhow::bail,
    enigo::{Button, Coordinate, Direction, Enigo, Mouse},
    std::{
        sync::{Arc, Mutex},
        thread::sleep,
        time::{Duration, Instant},
    },
    tracing::debug,
};

const SINGLE_WAIT_DURATION: Duration = Duration::from_millis(200);
const DEFAULT_WAIT_DURATION: Duration = Duration::from_secs(5);
/// Pause after each synthetic input event so the target app can react.
const INPUT_DELAY: Duration = Duration::from_millis(100);

struct ContextData {
    imp: imp::Context,
    enigo: Mutex<Enigo>,
    wait_duration: Duration,
}

#[derive(Clone)]
pub struct Context(Arc<ContextData>);

impl Context {
    #[allow(clippy::new_without_default)]
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self(Arc::new(ContextData {
            imp: imp::Context::new()?,
            enigo: Mutex::new(Enigo::new(&enigo::Settings::default())?),
            wait_duration: DEFAULT_WAIT_DURATION,
        })))
    }

    pub fn all_windows(&self) -> anyhow::Result<Vec<Window>> {
        let mut windows = Vec::new();
        for inner in xcap::Window::all()? {
            // Some system windows refuse to report their attributes.
            match Window::new(self.clone(), inner) {
                Ok(window) => windows.push(window),
                Err(err) => debug!("skipping window: {err:?}"),
            }
        }
        Ok(windows)
    }

    /// Returns visible windows whose title contains `title`.
    pub fn windows_by_title(&self, title: &str) -> anyhow::Result<Vec<Window>> {
        let windows = self.all_windows()?;
        Ok(windows
            .into_iter()
            .filter(|w| w.title().contains(title))
            .collect())
    }

    pub fn find_window(&self, title: &str) -> anyhow::Result<Option<Window>> {
        Ok(self.windows_by_title(title)?.into_iter().next())
    }

    pub fn wait_for_window(&self, title: &str) -> anyhow::Result<Window> {
        let started = Instant::now();
        let mut windows = Vec::new();
        while started.elapsed() < self.0.wait_duration {
            windows = self.windows_by_title(title)?;
            if !windows.is_empty() {
                break;
            }
            sleep(SINGLE_WAIT_DURATION);
        }
        if windows.len() > 1 {
            debug!(
                "found {} windows with title {:?}, using the first one",
                windows.len(),
                title
            );
        }
        if windows.is_empty() {
            bail!(
                "couldn't find a window with title {:?} after {:?}",
                title,
                self.0.wait_duration
            );
        }
        Ok(windows.remove(0))
    }

    pub fn mouse_move_global(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.0
            .enigo
            .lock()
            .unwrap()
            .move_mouse(x, y, Coordinate::Abs)?;
        sleep(INPUT_DELAY);
        Ok(())
    }

    pub fn mouse_left_click(&self) -> anyhow::Result<()> {
        self.0
            .enigo
            .lock()
            .unwrap()
            .button(Button::Left, Direction::Click)?;
        sleep(INPUT_DELAY);
        Ok(())
    }
}
