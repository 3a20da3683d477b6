use super::*;

#[test]
fn center_offset_is_symmetric_and_clamped() {
    assert_eq!(center_offset(100.0, 40.0), 30.0);
    assert_eq!(center_offset(100.0, 100.0), 0.0);
    assert_eq!(center_offset(100.0, 140.0), 0.0);
}

#[test]
fn band_block_is_centered_on_canvas() {
    // 720p canvas, 100px band, 60px block => block spans 330..390, centered on 360.
    let top = band_block_top(720.0, 100.0, 60.0);
    assert_eq!(top, 330.0);
    assert_eq!(top + 30.0, 360.0);
}

#[test]
fn tall_block_starts_at_band_top() {
    assert_eq!(band_block_top(480.0, 100.0, 250.0), 190.0);
}

#[test]
fn bold_layout_centers_lines_when_font_available() {
    let Some(path) = find_bold_font() else {
        eprintln!("skipping: no bold font found");
        return;
    };
    let bytes = read_font(&path).unwrap();
    let mut engine = TextLayoutEngine::new();
    let layout = engine
        .layout_bold("Hello", &bytes, 50.0, TextBrushRgba8::default(), 1280.0)
        .unwrap();
    assert!(engine.family_name.as_deref().is_some_and(|f| !f.trim().is_empty()));
    assert!(layout.width() > 0.0);

    let offsets = centered_line_offsets(&layout, 1280.0);
    assert_eq!(offsets.len(), 1);
    assert!(offsets[0] > 0.0 && offsets[0] < 640.0);
}

#[test]
fn invalid_sizes_are_rejected() {
    let mut engine = TextLayoutEngine::new();
    let brush = TextBrushRgba8::default();
    assert!(engine.layout_bold("x", b"", 0.0, brush, 10.0).is_err());
    assert!(engine.layout_bold("x", b"", 10.0, brush, f32::NAN).is_err());
}

#[test]
fn read_font_reports_missing_file() {
    assert!(read_font(Path::new("/definitely/not/a/font.ttf")).is_err());
}
