use super::*;

const AV_JSON: &str = r#"{
  "streams": [
    { "index": 0, "codec_type": "video", "codec_name": "h264", "duration": "3.000000" },
    { "index": 1, "codec_type": "audio", "codec_name": "aac", "duration": "5.015011" }
  ],
  "format": { "duration": "5.015011", "format_name": "mov,mp4,m4a,3gp,3g2,mj2" }
}"#;

#[test]
fn parses_streams_and_durations() {
    let info = parse_ffprobe_json(AV_JSON.as_bytes()).unwrap();
    assert_eq!(info.streams.len(), 2);
    assert!(info.has(MediaKind::Video));
    assert!(info.has(MediaKind::Audio));
    assert_eq!(info.track_duration(MediaKind::Video), Some(3.0));
    assert!((info.duration_secs - 5.015011).abs() < 1e-9);
}

#[test]
fn stream_without_duration_falls_back_to_container() {
    let json = r#"{
      "streams": [ { "codec_type": "audio" } ],
      "format": { "duration": "2.5" }
    }"#;
    let info = parse_ffprobe_json(json.as_bytes()).unwrap();
    assert!(!info.has(MediaKind::Video));
    assert_eq!(info.track_duration(MediaKind::Audio), Some(2.5));
    assert_eq!(info.track_duration(MediaKind::Video), None);
}

#[test]
fn unknown_stream_kinds_are_other() {
    let json = r#"{
      "streams": [ { "codec_type": "data", "duration": "1.0" } ],
      "format": {}
    }"#;
    let info = parse_ffprobe_json(json.as_bytes()).unwrap();
    assert_eq!(info.streams[0].kind, MediaKind::Other);
    assert_eq!(info.duration_secs, 1.0);
}

#[test]
fn garbage_and_durationless_output_is_asset_load_failed() {
    let err = parse_ffprobe_json(b"not json").unwrap_err();
    assert!(matches!(err, ReelError::AssetLoadFailed(_)));

    let err = parse_ffprobe_json(br#"{"streams": [], "format": {}}"#).unwrap_err();
    assert!(matches!(err, ReelError::AssetLoadFailed(_)));
}

#[test]
fn missing_file_is_asset_load_failed_without_spawning() {
    let err = FfprobeProbe
        .probe(Path::new("/definitely/not/here.wav"))
        .unwrap_err();
    assert!(matches!(err, ReelError::AssetLoadFailed(_)));
}
