use super::*;
use crate::mux::composition::{TrackRange, TrimPolicy};
use crate::mux::probe::MediaKind;

fn composition(policy: TrimPolicy) -> Composition {
    Composition::new(
        TrackRange {
            source: PathBuf::from("v.mp4"),
            kind: MediaKind::Video,
            start_secs: 0.0,
            duration_secs: 3.0,
        },
        TrackRange {
            source: PathBuf::from("a.wav"),
            kind: MediaKind::Audio,
            start_secs: 0.0,
            duration_secs: 5.0,
        },
        policy,
    )
    .unwrap()
}

struct Succeeds;

impl ExportBackend for Succeeds {
    fn export(&self, _: &Composition, _: &Path, _: ExportPreset, _: &CancelToken) -> ReelResult<()> {
        Ok(())
    }
}

struct Broken;

impl ExportBackend for Broken {
    fn export(&self, _: &Composition, _: &Path, _: ExportPreset, _: &CancelToken) -> ReelResult<()> {
        Err(ReelError::export_failed("codec exploded"))
    }
}

struct UntilCancelled;

impl ExportBackend for UntilCancelled {
    fn export(
        &self,
        _: &Composition,
        _: &Path,
        _: ExportPreset,
        cancel: &CancelToken,
    ) -> ReelResult<()> {
        while !cancel.wait_timeout(Duration::from_millis(5)) {}
        Err(ReelError::export_cancelled("stopped"))
    }
}

struct Panics;

impl ExportBackend for Panics {
    fn export(&self, _: &Composition, _: &Path, _: ExportPreset, _: &CancelToken) -> ReelResult<()> {
        panic!("backend bug");
    }
}

fn submit(backend: Arc<dyn ExportBackend>, cancel: CancelToken) -> ExportJob {
    ExportJob::submit(
        backend,
        composition(TrimPolicy::Shortest),
        PathBuf::from("out.mp4"),
        ExportPreset::Medium,
        cancel,
    )
    .unwrap()
}

#[test]
fn completed_job_yields_output_path() {
    let job = submit(Arc::new(Succeeds), CancelToken::new());
    assert_eq!(job.out_path(), Path::new("out.mp4"));
    let out = job.wait(Some(Duration::from_secs(5))).unwrap();
    assert_eq!(out, PathBuf::from("out.mp4"));
}

#[test]
fn failed_job_yields_backend_error() {
    let err = submit(Arc::new(Broken), CancelToken::new())
        .wait(None)
        .unwrap_err();
    assert!(matches!(err, ReelError::ExportFailed(ref m) if m.contains("codec exploded")));
}

#[test]
fn cancel_moves_job_to_cancelled() {
    let job = submit(Arc::new(UntilCancelled), CancelToken::new());
    job.cancel();
    let err = job.wait(Some(Duration::from_secs(5))).unwrap_err();
    assert!(matches!(err, ReelError::ExportCancelled(_)));
}

#[test]
fn pre_cancelled_token_never_reaches_backend() {
    let cancel = CancelToken::new();
    cancel.cancel();
    let err = submit(Arc::new(Broken), cancel).wait(None).unwrap_err();
    assert!(matches!(err, ReelError::ExportCancelled(_)));
}

#[test]
fn timeout_cancels_and_settles_the_job() {
    let cancel = CancelToken::new();
    let job = submit(Arc::new(UntilCancelled), cancel.clone());
    let err = job.wait(Some(Duration::from_millis(30))).unwrap_err();
    assert!(matches!(err, ReelError::Timeout(_)));
    assert!(cancel.is_cancelled());
}

#[test]
fn panicking_backend_still_settles_once() {
    let err = submit(Arc::new(Panics), CancelToken::new())
        .wait(Some(Duration::from_secs(5)))
        .unwrap_err();
    assert!(matches!(err, ReelError::Internal(_)));
}

#[test]
fn non_terminal_status_at_completion_is_a_protocol_violation() {
    for status in [ExportStatus::Waiting, ExportStatus::Exporting] {
        let err = export_outcome(status, None, Path::new("x.mp4")).unwrap_err();
        assert!(matches!(err, ReelError::UnexpectedExportState(_)));
    }
    let err = export_outcome(ExportStatus::Failed, None, Path::new("x.mp4")).unwrap_err();
    assert!(matches!(err, ReelError::ExportFailed(_)));
    let err = export_outcome(ExportStatus::Cancelled, None, Path::new("x.mp4")).unwrap_err();
    assert!(matches!(err, ReelError::ExportCancelled(_)));
}

#[test]
fn status_transitions_are_monotone_and_terminal() {
    let mut st = JobState {
        status: ExportStatus::Waiting,
        error: None,
    };
    assert!(st.advance(ExportStatus::Exporting));
    assert!(!st.advance(ExportStatus::Waiting));
    assert!(st.advance(ExportStatus::Completed));
    assert!(!st.advance(ExportStatus::Failed));
    assert_eq!(st.status, ExportStatus::Completed);
}

#[test]
fn ffmpeg_command_maps_both_tracks_and_trims() {
    let cmd = FfmpegExporter::command(
        &composition(TrimPolicy::Shortest),
        Path::new("out.mp4"),
        ExportPreset::Medium,
    );
    let args: Vec<String> = cmd
        .get_args()
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    let joined = args.join(" ");
    assert!(joined.contains("-map 0:v:0 -map 1:a:0"), "{joined}");
    assert!(joined.contains("-preset medium -crf 23"), "{joined}");
    assert!(joined.contains("-c:a aac -b:a 128k"), "{joined}");
    assert!(joined.contains("-t 3.000000"), "{joined}");
    assert_eq!(args.last().map(String::as_str), Some("out.mp4"));

    let cmd = FfmpegExporter::command(
        &composition(TrimPolicy::Independent),
        Path::new("out.mp4"),
        ExportPreset::Medium,
    );
    assert!(!cmd.get_args().any(|a| a == "-t"));
}
