use super::*;

#[test]
fn fps_rejects_zero_parts() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(30, 0).is_err());
    assert_eq!(Fps::integer(30).unwrap(), Fps { num: 30, den: 1 });
}

#[test]
fn fps_frame_times_are_exact_for_integer_rates() {
    let fps = Fps::integer(30).unwrap();
    assert_eq!(fps.frames_to_secs(0), 0.0);
    assert_eq!(fps.frames_to_secs(90), 3.0);
    assert_eq!(fps.frame_duration_secs(), 1.0 / 30.0);
}

#[test]
fn canvas_reports_rgba_len_and_display() {
    let c = Canvas {
        width: 4,
        height: 2,
    };
    assert_eq!(c.rgba8_len(), 32);
    assert_eq!(c.to_string(), "4x2");
}

#[test]
fn rgba_premul_of_opaque_is_identity() {
    let c = Rgba8::opaque(10, 20, 30);
    assert_eq!(c.to_premul_array(), c.to_array());

    let half = Rgba8 {
        r: 255,
        g: 0,
        b: 0,
        a: 128,
    };
    assert_eq!(half.to_premul_array(), [128, 0, 0, 128]);
}
