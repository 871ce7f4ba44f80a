use {
    crate::progress_bar::ProgressBarState,
    chrono::Local,
    image::RgbaImage,
    std::path::PathBuf,
    tracing::{debug, warn},
};

/// Saves progress bar crops whenever the classified state changes.
///
/// Failures are logged and never interrupt a session.
pub(crate) struct FrameRecorder {
    dir: Option<PathBuf>,
    index: u32,
    last_state: Option<ProgressBarState>,
}

impl FrameRecorder {
    pub(crate) fn new(dir: Option<PathBuf>) -> Self {
        Self {
            dir,
            index: 0,
            last_state: None,
        }
    }

    pub(crate) fn record(&mut self, frame: &RgbaImage, state: ProgressBarState) {
        self.index += 1;
        if self.last_state == Some(state) {
            return;
        }
        self.last_state = Some(state);
        let Some(dir) = &self.dir else {
            return;
        };
        if let Err(err) = fs_err::create_dir_all(dir) {
            warn!("failed to create debug frame dir: {err}");
            return;
        }
        let path = dir.join(format!(
            "{}-{:05}-{}.png",
            Local::now().format("%Y%m%d%H%M%S"),
            self.index,
            state
        ));
        match frame.save(&path) {
            Ok(()) => debug!("saved debug frame {:?}", path),
            Err(err) => warn!("failed to save debug frame {:?}: {err}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, image::Rgba, itertools::Itertools};

    #[test]
    fn saves_state_changes_only() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = FrameRecorder::new(Some(dir.path().join("frames")));
        let frame = RgbaImage::from_pixel(4, 2, Rgba([9, 9, 9, 255]));
        for state in [
            ProgressBarState::Progress,
            ProgressBarState::Progress,
            ProgressBarState::Fail,
            ProgressBarState::Progress,
        ] {
            recorder.record(&frame, state);
        }
        let names = fs_err::read_dir(dir.path().join("frames"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().into_string().unwrap())
            .sorted_by_key(|name| name.split('-').nth(1).unwrap_or_default().to_string())
            .collect_vec();
        assert_eq!(names.len(), 3);
        assert!(names[0].ends_with("-00001-progress.png"));
        assert!(names[1].ends_with("-00003-fail.png"));
        assert!(names[2].ends_with("-00004-progress.png"));
    }

    #[test]
    fn disabled_recorder_writes_nothing() {
        let mut recorder = FrameRecorder::new(None);
        recorder.record(&RgbaImage::new(1, 1), ProgressBarState::Standby);
        assert_eq!(recorder.index, 1);
    }
}
