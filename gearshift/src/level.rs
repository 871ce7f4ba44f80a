use {
    anyhow::{bail, Context as _},
    image::RgbaImage,
    std::path::Path,
    tracing::debug,
};

/// Level at which a successful spend session keeps upgrading when asked to.
pub const CONTINUE_UPGRADE_MIN_LEVEL: u32 = 10;

/// Reads the current item level from the cropped level region.
pub trait LevelInspector: Send + Sync {
    fn get_item_level(&self, frame: &RgbaImage) -> anyhow::Result<u32>;
}

/// Matches the level region against reference captures named `<level>.png`.
pub struct TemplateLevelInspector {
    templates: Vec<(u32, RgbaImage)>,
}

impl TemplateLevelInspector {
    pub fn new(templates: Vec<(u32, RgbaImage)>) -> Self {
        Self { templates }
    }

    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let mut templates = Vec::new();
        for entry in fs_err::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().is_none_or(|ext| ext != "png") {
                continue;
            }
            let Some(level) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<u32>().ok())
            else {
                debug!("ignoring non-level template {:?}", path);
                continue;
            };
            let image = image::open(&path)
                .with_context(|| format!("failed to decode image {:?}", path))?
                .into_rgba8();
            templates.push((level, image));
        }
        if templates.is_empty() {
            bail!("no level templates found in {:?}", dir);
        }
        templates.sort_by_key(|(level, _)| *level);
        Ok(Self::new(templates))
    }
}

impl LevelInspector for TemplateLevelInspector {
    fn get_item_level(&self, frame: &RgbaImage) -> anyhow::Result<u32> {
        let best = self
            .templates
            .iter()
            .filter(|(_, template)| template.dimensions() == frame.dimensions())
            .map(|(level, template)| (*level, mean_abs_diff(template, frame)))
            .min_by(|a, b| a.1.total_cmp(&b.1));
        let Some((level, diff)) = best else {
            bail!(
                "no level template matches a {}x{} region",
                frame.width(),
                frame.height()
            );
        };
        debug!("level {} matched with mean difference {:.2}", level, diff);
        Ok(level)
    }
}

fn mean_abs_diff(a: &RgbaImage, b: &RgbaImage) -> f64 {
    let total: u64 = a
        .pixels()
        .zip(b.pixels())
        .flat_map(|(a, b)| a.0.into_iter().zip(b.0).take(3))
        .map(|(a, b)| u64::from(a.abs_diff(b)))
        .sum();
    let samples = u64::from(a.width()) * u64::from(a.height()) * 3;
    if samples == 0 {
        return 0.0;
    }
    total as f64 / samples as f64
}
