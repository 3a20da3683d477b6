use super::*;

#[test]
fn resolution_table_matches_aspect_ratios() {
    assert_eq!(
        Resolution::Sd.canvas(),
        Canvas {
            width: 640,
            height: 480
        }
    );
    assert_eq!(
        Resolution::Hd.canvas(),
        Canvas {
            width: 1280,
            height: 720
        }
    );
    assert_eq!(
        Resolution::FullHd.canvas(),
        Canvas {
            width: 1920,
            height: 1080
        }
    );
    assert_eq!(Resolution::default(), Resolution::Hd);
}

#[test]
fn zero_duration_is_rejected_at_construction() {
    let err = RenderRequest::new("X", 0.0, Resolution::Sd).unwrap_err();
    assert!(matches!(err, ReelError::Validation(_)));
    assert!(RenderRequest::new("X", -1.0, Resolution::Sd).is_err());
    assert!(RenderRequest::new("X", f64::NAN, Resolution::Sd).is_err());
    assert!(RenderRequest::new("X", f64::INFINITY, Resolution::Sd).is_err());
}

#[test]
fn zero_frame_rate_is_rejected() {
    assert!(RenderRequest::with_frame_rate("X", 1.0, Resolution::Hd, 0).is_err());
}

#[test]
fn default_frame_rate_is_thirty() {
    let r = RenderRequest::new("Hello", 3.0, Resolution::Hd).unwrap();
    assert_eq!(r.frame_rate(), 30);
    assert_eq!(r.fps().unwrap().num, 30);
    assert_eq!(r.text(), "Hello");
}

#[test]
fn json_deserialization_validates() {
    let ok: RenderRequest =
        serde_json::from_str(r#"{"text":"hi","duration_secs":1.5,"resolution":"full-hd"}"#)
            .unwrap();
    assert_eq!(ok.resolution(), Resolution::FullHd);
    assert_eq!(ok.frame_rate(), DEFAULT_FRAME_RATE);

    let bad = serde_json::from_str::<RenderRequest>(r#"{"text":"hi","duration_secs":0}"#);
    assert!(bad.is_err());
}
