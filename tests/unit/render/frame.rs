use super::*;

fn renderer() -> Option<FrameRenderer> {
    if find_bold_font().is_none() {
        eprintln!("skipping: no bold font found");
        return None;
    }
    Some(FrameRenderer::new(RendererOpts::default()).unwrap())
}

fn px(buf: &PixelBuffer, x: u32, y: u32) -> [u8; 4] {
    let i = ((y * buf.width() + x) * 4) as usize;
    let d = buf.data();
    [d[i], d[i + 1], d[i + 2], d[i + 3]]
}

#[test]
fn render_is_deterministic() {
    let Some(mut r) = renderer() else { return };
    let canvas = Canvas {
        width: 320,
        height: 240,
    };
    let a = r.render("Hello", canvas).unwrap();
    let b = r.render("Hello", canvas).unwrap();
    assert_eq!(a.data(), b.data());

    let Some(mut fresh) = renderer() else { return };
    let c = fresh.render("Hello", canvas).unwrap();
    assert_eq!(a.fingerprint(), c.fingerprint());
}

#[test]
fn background_fills_corners_and_text_lands_in_band() {
    let Some(mut r) = renderer() else { return };
    let canvas = Canvas {
        width: 640,
        height: 480,
    };
    let buf = r.render("HELLO", canvas).unwrap();
    assert_eq!(px(&buf, 0, 0), [255, 255, 255, 255]);
    assert_eq!(px(&buf, 639, 479), [255, 255, 255, 255]);

    let mut dark_rows = Vec::new();
    for y in 0..canvas.height {
        if (0..canvas.width).any(|x| px(&buf, x, y)[0] < 128) {
            dark_rows.push(y);
        }
    }
    assert!(!dark_rows.is_empty(), "text should draw dark pixels");
    let band_top = 240 - 50;
    let band_bottom = 240 + 50;
    assert!(dark_rows.iter().all(|&y| y >= band_top && y < band_bottom));
}

#[test]
fn text_is_horizontally_centered() {
    let Some(mut r) = renderer() else { return };
    let canvas = Canvas {
        width: 640,
        height: 480,
    };
    let buf = r.render("MMMM", canvas).unwrap();
    let dark_cols: Vec<u32> = (0..canvas.width)
        .filter(|&x| (0..canvas.height).any(|y| px(&buf, x, y)[0] < 128))
        .collect();
    let left = *dark_cols.first().unwrap() as i64;
    let right = *dark_cols.last().unwrap() as i64;
    let margin_l = left;
    let margin_r = 639 - right;
    assert!((margin_l - margin_r).abs() <= 8, "{margin_l} vs {margin_r}");
}

#[test]
fn empty_text_renders_only_background() {
    let Some(mut r) = renderer() else { return };
    let buf = r
        .render(
            "",
            Canvas {
                width: 16,
                height: 16,
            },
        )
        .unwrap();
    assert!(buf.data().chunks_exact(4).all(|p| p == [255, 255, 255, 255]));
}

#[test]
fn oversized_canvas_is_allocation_error() {
    let err = canvas_u16(Canvas {
        width: 70_000,
        height: 10,
    })
    .unwrap_err();
    assert!(matches!(err, ReelError::AllocationFailed(_)));
}

#[test]
fn invalid_opts_are_rejected() {
    let opts = RendererOpts {
        font_size_px: 0.0,
        ..RendererOpts::default()
    };
    assert!(opts.validate().is_err());
    assert!(FrameRenderer::with_font_bytes(opts, Vec::new()).is_err());
}

#[test]
fn glyphs_spread_across_the_laid_out_width() {
    let Some(mut r) = renderer() else { return };
    let canvas = Canvas {
        width: 1280,
        height: 720,
    };
    let buf = r.render("Hello World", canvas).unwrap();
    let laid_out = r.cached.as_ref().unwrap().layout.width();

    let dark_cols: Vec<u32> = (0..canvas.width)
        .filter(|&x| (0..canvas.height).any(|y| px(&buf, x, y)[0] < 128))
        .collect();
    let drawn = (dark_cols.last().unwrap() - dark_cols.first().unwrap()) as f32;
    assert!(
        drawn >= laid_out * 0.8 && drawn <= laid_out + 4.0,
        "drawn {drawn} vs laid out {laid_out}"
    );
}
