use {
    crate::error::{Error, Result},
    anyhow::Context as _,
    derive_more::Display,
    image::{imageops, RgbaImage},
    serde::{Deserialize, Serialize},
    std::{
        collections::BTreeMap,
        path::{Path, PathBuf},
    },
};

pub const PROGRESS_BAR: &str = "progress_bar";
pub const UPGRADE_BUTTON: &str = "upgrade_button";
pub const LEVEL: &str = "level";

/// A rectangle in window-relative pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Center point in window coordinates. Fails if it doesn't fit in screen coordinates.
    pub fn center(&self) -> Result<(i32, i32)> {
        let axis = |start: u32, len: u32| {
            i32::try_from(i64::from(start) + i64::from(len / 2)).map_err(|_| {
                Error::InvalidConfiguration(format!("region {self:?} is out of screen bounds"))
            })
        };
        Ok((axis(self.left, self.width)?, axis(self.top, self.height)?))
    }

    /// Crops `frame` to this region, clamped to the frame bounds.
    pub fn crop(&self, frame: &RgbaImage) -> RgbaImage {
        imageops::crop_imm(frame, self.left, self.top, self.width, self.height).to_image()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, Serialize, Deserialize)]
#[display("{width}x{height}")]
pub struct WindowSize {
    pub width: u32,
    pub height: u32,
}

impl WindowSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

pub type RegionMapping = BTreeMap<String, Region>;

/// Looks up a named region, failing with [`Error::MissingRegion`].
pub fn required_region(mapping: &RegionMapping, name: &str, size: WindowSize) -> Result<Region> {
    mapping.get(name).copied().ok_or_else(|| Error::MissingRegion {
        name: name.into(),
        size,
    })
}

/// Source of region layouts, keyed by window size.
pub trait RegionStore: Send + Sync {
    fn get_region_mapping(&self, size: WindowSize) -> anyhow::Result<Option<RegionMapping>>;
}

/// Region layouts stored in a JSON file as `{"<width>x<height>": {"<name>": region}}`.
pub struct JsonRegionStore {
    path: PathBuf,
}

impl JsonRegionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<BTreeMap<String, RegionMapping>> {
        if !self.path.try_exists()? {
            return Ok(BTreeMap::new());
        }
        let text = fs_err::read_to_string(&self.path)?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse region file {:?}", self.path))
    }

    pub fn set_region(&self, size: WindowSize, name: &str, region: Region) -> anyhow::Result<()> {
        let mut all = self.load()?;
        all.entry(size.to_string())
            .or_default()
            .insert(name.into(), region);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.try_exists()? {
                fs_err::create_dir_all(parent)?;
            }
        }
        fs_err::write(&self.path, serde_json::to_string_pretty(&all)?)?;
        Ok(())
    }
}

impl RegionStore for JsonRegionStore {
    fn get_region_mapping(&self, size: WindowSize) -> anyhow::Result<Option<RegionMapping>> {
        Ok(self.load()?.remove(&size.to_string()))
    }
}
