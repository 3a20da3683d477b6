use super::*;

#[test]
fn defaults_match_documented_values() {
    let o = PipelineOpts::default();
    assert_eq!(o.frame_rate, 30);
    assert_eq!(o.pool_capacity, 8);
    assert_eq!(o.audio_asset, PathBuf::from(DEFAULT_AUDIO_ASSET));
    assert!(o.audio_asset.is_absolute());
    assert_eq!(o.trim_policy, TrimPolicy::Shortest);
    assert_eq!(o.export_preset, ExportPreset::Medium);
    assert_eq!(o.max_not_ready_retries, 1000);
    assert!(!o.keep_intermediate);
    assert_eq!(o.stage_timeout(), None);
    o.validate().unwrap();
}

#[test]
fn partial_json_keeps_defaults() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("opts.json");
    std::fs::write(
        &path,
        r#"{ "pool_capacity": 2, "trim_policy": "independent", "renderer": { "font_size_px": 64.0 } }"#,
    )
    .unwrap();

    let o = PipelineOpts::from_json_file(&path).unwrap();
    assert_eq!(o.pool_capacity, 2);
    assert_eq!(o.trim_policy, TrimPolicy::Independent);
    assert_eq!(o.renderer.font_size_px, 64.0);
    assert_eq!(o.renderer.band_height_px, 100.0);
    assert_eq!(o.frame_rate, 30);
}

#[test]
fn invalid_values_are_rejected() {
    let o = PipelineOpts {
        pool_capacity: 0,
        ..PipelineOpts::default()
    };
    assert!(matches!(o.validate(), Err(ReelError::Validation(_))));

    let o = PipelineOpts {
        stage_timeout_secs: Some(-1.0),
        ..PipelineOpts::default()
    };
    assert!(matches!(o.validate(), Err(ReelError::Validation(_))));
}

#[test]
fn unreadable_or_malformed_files_error() {
    let tmp = tempfile::tempdir().unwrap();
    assert!(PipelineOpts::from_json_file(&tmp.path().join("missing.json")).is_err());

    let bad = tmp.path().join("bad.json");
    std::fs::write(&bad, b"{ \"pool_capacity\": \"many\" }").unwrap();
    assert!(matches!(
        PipelineOpts::from_json_file(&bad),
        Err(ReelError::Validation(_))
    ));
}

#[test]
fn bundled_audio_asset_ships_with_the_crate() {
    let bytes = std::fs::read(DEFAULT_AUDIO_ASSET).unwrap();
    assert_eq!(&bytes[0..4], b"RIFF");
    assert_eq!(&bytes[8..12], b"WAVE");
}
