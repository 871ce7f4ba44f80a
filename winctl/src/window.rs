use {
    crate::Context,
    anyhow::Context as _,
    image::RgbaImage,
    xcap::XCapResult,
};

#[derive(Clone)]
pub struct Window {
    id: u32,
    title: String,
    inner: xcap::Window,
    context: Context,
}

impl Window {
    pub(crate) fn new(context: Context, inner: xcap::Window) -> anyhow::Result<Self> {
        Ok(Self {
            id: inner.id()?,
            title: inner.title()?,
            inner,
            context,
        })
    }

    /// The window id. On Windows this is the HWND value.
    pub fn id(&self) -> u32 {
        self.id
    }
    /// The window title at the time the window was found.
    pub fn title(&self) -> &str {
        &self.title
    }
    /// The window x coordinate.
    pub fn x(&self) -> XCapResult<i32> {
        self.inner.x()
    }
    /// The window y coordinate.
    pub fn y(&self) -> XCapResult<i32> {
        self.inner.y()
    }
    /// The window pixel width.
    pub fn width(&self) -> XCapResult<u32> {
        self.inner.width()
    }
    /// The window pixel height.
    pub fn height(&self) -> XCapResult<u32> {
        self.inner.height()
    }
    /// The window is minimized.
    pub fn is_minimized(&self) -> XCapResult<bool> {
        self.inner.is_minimized()
    }

    /// Returns `false` if the window has been closed since it was found.
    pub fn exists(&self) -> anyhow::Result<bool> {
        let id = self.id;
        Ok(xcap::Window::all()?
            .iter()
            .any(|w| w.id().is_ok_and(|other| other == id)))
    }

    pub fn capture_image(&self) -> anyhow::Result<RgbaImage> {
        self.inner
            .capture_image()
            .with_context(|| format!("failed to capture window {:?}", self.title))
    }

    pub fn activate(&self) -> anyhow::Result<()> {
        self.context.0.imp.activate_window(self)
    }

    /// Moves the mouse to a point relative to the window's top left corner.
    pub fn mouse_move(&self, x: i32, y: i32) -> anyhow::Result<()> {
        let global_x = self.x()? + x;
        let global_y = self.y()? + y;
        self.context.mouse_move_global(global_x, global_y)
    }

    pub fn click_at(&self, x: i32, y: i32) -> anyhow::Result<()> {
        self.mouse_move(x, y)?;
        self.context.mouse_left_click()
    }
}
