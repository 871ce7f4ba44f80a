use {
    crate::region::{Region, WindowSize},
    image::RgbaImage,
};

/// The target application window.
///
/// All calls block. Errors are transport-level failures and are passed through to the
/// caller unchanged.
pub trait WindowProvider: Send + Sync {
    fn window_exists(&self) -> anyhow::Result<bool>;
    fn window_size(&self) -> anyhow::Result<WindowSize>;
    fn activate(&self) -> anyhow::Result<()>;
    /// Captures the whole window.
    fn capture(&self) -> anyhow::Result<RgbaImage>;
    /// Clicks the center of a window-relative region.
    fn click(&self, region: &Region) -> anyhow::Result<()>;
}
