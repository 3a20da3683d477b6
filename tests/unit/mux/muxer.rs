use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::*;
use crate::foundation::error::ReelError;
use crate::mux::probe::{MediaInfo, MediaKind, StreamInfo};

struct TableProbe(HashMap<PathBuf, MediaInfo>);

impl AssetProbe for TableProbe {
    fn probe(&self, path: &Path) -> ReelResult<MediaInfo> {
        self.0
            .get(path)
            .cloned()
            .ok_or_else(|| ReelError::asset_load_failed(format!("{} not found", path.display())))
    }
}

#[derive(Default)]
struct CountingExporter {
    calls: AtomicUsize,
    last_trim: parking_lot::Mutex<Option<Option<f64>>>,
}

impl ExportBackend for CountingExporter {
    fn export(
        &self,
        composition: &Composition,
        _out: &Path,
        _preset: ExportPreset,
        _cancel: &CancelToken,
    ) -> ReelResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_trim.lock() = Some(composition.trim_secs());
        Ok(())
    }
}

fn single(kind: MediaKind, secs: f64) -> MediaInfo {
    MediaInfo {
        duration_secs: secs,
        streams: vec![StreamInfo {
            kind,
            duration_secs: Some(secs),
        }],
    }
}

fn probe_table(video: MediaInfo, audio: MediaInfo) -> Arc<TableProbe> {
    let mut t = HashMap::new();
    t.insert(PathBuf::from("v.mp4"), video);
    t.insert(PathBuf::from("a.wav"), audio);
    Arc::new(TableProbe(t))
}

#[test]
fn mux_submits_composition_with_trim_policy() {
    let exporter = Arc::new(CountingExporter::default());
    let muxer = Muxer::new(
        probe_table(single(MediaKind::Video, 3.0), single(MediaKind::Audio, 4.0)),
        exporter.clone(),
        ExportPreset::Medium,
        TrimPolicy::Shortest,
    );
    let job = muxer
        .mux(Path::new("v.mp4"), Path::new("a.wav"), Path::new("out.mp4"))
        .unwrap();
    let out = job.wait(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(out, PathBuf::from("out.mp4"));
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 1);
    assert_eq!(*exporter.last_trim.lock(), Some(Some(3.0)));
}

#[test]
fn missing_audio_track_fails_before_submission() {
    let exporter = Arc::new(CountingExporter::default());
    let muxer = Muxer::new(
        probe_table(single(MediaKind::Video, 3.0), single(MediaKind::Video, 4.0)),
        exporter.clone(),
        ExportPreset::Medium,
        TrimPolicy::Shortest,
    );
    let err = muxer
        .mux(Path::new("v.mp4"), Path::new("a.wav"), Path::new("out.mp4"))
        .unwrap_err();
    assert!(matches!(err, ReelError::MissingTrack(_)));
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn unreadable_asset_is_asset_load_failed() {
    let exporter = Arc::new(CountingExporter::default());
    let muxer = Muxer::new(
        probe_table(single(MediaKind::Video, 3.0), single(MediaKind::Audio, 4.0)),
        exporter.clone(),
        ExportPreset::Medium,
        TrimPolicy::Shortest,
    );
    let err = muxer
        .mux(Path::new("v.mp4"), Path::new("missing.wav"), Path::new("out.mp4"))
        .unwrap_err();
    assert!(matches!(err, ReelError::AssetLoadFailed(_)));
    assert_eq!(exporter.calls.load(Ordering::SeqCst), 0);
}
