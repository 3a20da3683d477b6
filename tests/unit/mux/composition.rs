use super::*;
use crate::mux::probe::StreamInfo;

fn info(kinds: &[(MediaKind, f64)]) -> MediaInfo {
    MediaInfo {
        duration_secs: kinds.iter().map(|(_, d)| *d).fold(0.0, f64::max),
        streams: kinds
            .iter()
            .map(|(kind, d)| StreamInfo {
                kind: *kind,
                duration_secs: Some(*d),
            })
            .collect(),
    }
}

fn build(policy: TrimPolicy) -> Composition {
    Composition::from_probes(
        Path::new("v.mp4"),
        &info(&[(MediaKind::Video, 3.0)]),
        Path::new("a.wav"),
        &info(&[(MediaKind::Audio, 5.0)]),
        policy,
    )
    .unwrap()
}

#[test]
fn both_tracks_start_at_zero_with_native_lengths() {
    let c = build(TrimPolicy::Independent);
    assert_eq!(c.video().start_secs, 0.0);
    assert_eq!(c.audio().start_secs, 0.0);
    assert_eq!(c.video().duration_secs, 3.0);
    assert_eq!(c.audio().duration_secs, 5.0);
    assert_eq!(c.trim_secs(), None);
    assert_eq!(c.output_duration(), 5.0);
}

#[test]
fn shortest_is_default_and_truncates_to_min() {
    assert_eq!(TrimPolicy::default(), TrimPolicy::Shortest);
    let c = build(TrimPolicy::Shortest);
    assert_eq!(c.trim_secs(), Some(3.0));
    assert_eq!(c.output_duration(), 3.0);
}

#[test]
fn video_policy_keeps_video_length() {
    let c = build(TrimPolicy::Video);
    assert_eq!(c.trim_secs(), Some(3.0));
}

#[test]
fn missing_tracks_are_reported_per_source() {
    let err = Composition::from_probes(
        Path::new("v.mp4"),
        &info(&[(MediaKind::Audio, 3.0)]),
        Path::new("a.wav"),
        &info(&[(MediaKind::Audio, 5.0)]),
        TrimPolicy::Shortest,
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::MissingTrack(ref m) if m.contains("v.mp4")));

    let err = Composition::from_probes(
        Path::new("v.mp4"),
        &info(&[(MediaKind::Video, 3.0)]),
        Path::new("a.wav"),
        &info(&[(MediaKind::Video, 5.0)]),
        TrimPolicy::Shortest,
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::MissingTrack(ref m) if m.contains("a.wav")));
}

#[test]
fn zero_length_track_is_rejected() {
    let err = Composition::from_probes(
        Path::new("v.mp4"),
        &info(&[(MediaKind::Video, 0.0)]),
        Path::new("a.wav"),
        &info(&[(MediaKind::Audio, 5.0)]),
        TrimPolicy::Shortest,
    )
    .unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
}
