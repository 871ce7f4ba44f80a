use {
    crate::error::{Error, Result},
    image::RgbaImage,
    serde::{Deserialize, Serialize},
    strum::{Display, EnumIter, EnumString, IntoStaticStr},
};

/// Visual state of the upgrade progress bar in one captured frame.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    EnumString,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ProgressBarState {
    /// An upgrade attempt just failed.
    Fail,
    /// An attempt is in flight.
    Progress,
    /// Idle. Sustained standby after an attempt means the upgrade succeeded.
    Standby,
    /// The UI is stuck showing a network error.
    ConnectionError,
    /// No known pattern matched.
    Unknown,
}

pub trait StateClassifier: Send + Sync {
    fn classify(&self, frame: &RgbaImage) -> Result<ProgressBarState>;
}

/// Classifies a progress bar crop by its average color.
///
/// Standby is dark, fail is red, progress is yellow and a connection error is blue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorClassifier {
    /// All channels at or below this value count as dark.
    pub dark_max: u8,
    /// A channel at or above this value counts as saturated.
    pub bright_min: u8,
    /// A channel at or below this value counts as absent.
    pub dim_max: u8,
}

impl Default for ColorClassifier {
    fn default() -> Self {
        Self {
            dark_max: 60,
            bright_min: 150,
            dim_max: 100,
        }
    }
}

impl ColorClassifier {
    pub fn classify_color(&self, [r, g, b]: [u8; 3]) -> ProgressBarState {
        let dark = |c: u8| c <= self.dark_max;
        let bright = |c: u8| c >= self.bright_min;
        let dim = |c: u8| c <= self.dim_max;

        if dark(r) && dark(g) && dark(b) {
            ProgressBarState::Standby
        } else if bright(r) && bright(g) && dim(b) {
            ProgressBarState::Progress
        } else if bright(r) && dim(g) && dim(b) {
            ProgressBarState::Fail
        } else if bright(b) && dim(r) {
            ProgressBarState::ConnectionError
        } else {
            ProgressBarState::Unknown
        }
    }
}

impl StateClassifier for ColorClassifier {
    fn classify(&self, frame: &RgbaImage) -> Result<ProgressBarState> {
        Ok(self.classify_color(average_color(frame)?))
    }
}

/// Mean RGB value of a frame. Alpha is ignored.
pub fn average_color(frame: &RgbaImage) -> Result<[u8; 3]> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(Error::InvalidFrame(format!(
            "empty frame ({}x{})",
            frame.width(),
            frame.height()
        )));
    }
    let mut sums = [0u64; 3];
    for pixel in frame.pixels() {
        for (sum, channel) in sums.iter_mut().zip(pixel.0) {
            *sum += u64::from(channel);
        }
    }
    let count = u64::from(frame.width()) * u64::from(frame.height());
    Ok(sums.map(|sum| (sum / count) as u8))
}
