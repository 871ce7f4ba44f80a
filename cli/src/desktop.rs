use {
    anyhow::Context as _,
    gearshift::{Region, WindowProvider, WindowSize},
    image::RgbaImage,
    tracing::debug,
    winctl::Window,
};

/// The target window, looked up by title on every call so a restarted game is picked up.
pub struct DesktopWindow {
    context: winctl::Context,
    title: String,
}

impl DesktopWindow {
    pub fn new(context: winctl::Context, title: impl Into<String>) -> Self {
        Self {
            context,
            title: title.into(),
        }
    }

    fn window(&self) -> anyhow::Result<Window> {
        self.context
            .find_window(&self.title)?
            .with_context(|| format!("window {:?} is gone", self.title))
    }
}

impl WindowProvider for DesktopWindow {
    fn window_exists(&self) -> anyhow::Result<bool> {
        match self.context.find_window(&self.title)? {
            Some(window) => {
                if window.is_minimized()? {
                    debug!("window {:?} is minimized", window.title());
                }
                window.exists()
            }
            None => Ok(false),
        }
    }

    fn window_size(&self) -> anyhow::Result<WindowSize> {
        let window = self.window()?;
        Ok(WindowSize::new(window.width()?, window.height()?))
    }

    fn activate(&self) -> anyhow::Result<()> {
        self.window()?.activate()
    }

    fn capture(&self) -> anyhow::Result<RgbaImage> {
        self.window()?.capture_image()
    }

    fn click(&self, region: &Region) -> anyhow::Result<()> {
        let (x, y) = region.center()?;
        self.window()?.click_at(x, y)
    }
}
