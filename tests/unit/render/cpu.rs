use std::io::Cursor;
use std::sync::Arc;

use super::*;
use crate::foundation::core::Resolution;
use crate::render::backend::load_font;

fn settings(width: u32, height: u32) -> RenderSettings {
    RenderSettings {
        resolution: Resolution { width, height },
        background_rgba: [255, 255, 255, 255],
        text_rgba: [0, 0, 0, 255],
        default_font_px: 16.0,
        font: None,
    }
}

fn gradient(width: u32, height: u32) -> image::RgbImage {
    image::RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x * 37 % 256) as u8, (y * 53 % 256) as u8, ((x + y) * 11 % 256) as u8])
    })
}

fn png_bytes(img: &image::RgbImage) -> Arc<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    Arc::new(out.into_inner())
}

fn picture(x: i32, y: i32, width: i32, height: i32, payload: Arc<Vec<u8>>) -> NormalizedElement {
    NormalizedElement::Picture {
        rect: PxRect {
            x,
            y,
            width,
            height,
        },
        payload,
    }
}

#[test]
fn empty_slide_is_background_only() {
    let mut r = CpuSlideRenderer::new(RenderSettings {
        background_rgba: [10, 20, 30, 255],
        ..settings(8, 6)
    });
    let frame = r.render(&[]).unwrap();
    assert_eq!((frame.width, frame.height), (8, 6));
    assert!(frame.data.chunks_exact(4).all(|px| px == [10, 20, 30, 255]));
}

#[test]
fn picture_at_origin_matches_resampled_source() {
    let src = gradient(7, 5);
    let payload = png_bytes(&src);
    let mut r = CpuSlideRenderer::new(settings(32, 24));
    let frame = r.render(&[picture(0, 0, 20, 12, payload)]).unwrap();

    let expected = image::imageops::resize(
        &image::DynamicImage::ImageRgb8(src).to_rgba8(),
        20,
        12,
        FilterType::Lanczos3,
    );
    for y in 0..12 {
        for x in 0..20 {
            let [r, g, b, _] = expected.get_pixel(x, y).0;
            assert_eq!(frame.pixel(x, y), Some([r, g, b, 255]), "pixel ({x},{y})");
        }
    }
    assert_eq!(frame.pixel(20, 0), Some([255, 255, 255, 255]));
    assert_eq!(frame.pixel(0, 12), Some([255, 255, 255, 255]));
}

#[test]
fn later_pictures_cover_earlier_ones() {
    let red = png_bytes(&image::RgbImage::from_pixel(4, 4, image::Rgb([255, 0, 0])));
    let blue = png_bytes(&image::RgbImage::from_pixel(4, 4, image::Rgb([0, 0, 255])));
    let mut r = CpuSlideRenderer::new(settings(10, 10));
    let frame = r
        .render(&[picture(0, 0, 6, 6, red), picture(3, 3, 6, 6, blue)])
        .unwrap();
    assert_eq!(frame.pixel(1, 1), Some([255, 0, 0, 255]));
    assert_eq!(frame.pixel(4, 4), Some([0, 0, 255, 255]));
    assert_eq!(frame.pixel(8, 8), Some([0, 0, 255, 255]));
    assert_eq!(frame.pixel(9, 9), Some([255, 255, 255, 255]));
}

#[test]
fn pictures_are_clipped_to_the_canvas() {
    let green = png_bytes(&image::RgbImage::from_pixel(2, 2, image::Rgb([0, 255, 0])));
    let mut r = CpuSlideRenderer::new(settings(4, 4));
    let frame = r
        .render(&[picture(-2, -2, 4, 4, green.clone()), picture(3, 3, 100, 100, green)])
        .unwrap();
    assert_eq!(frame.pixel(0, 0), Some([0, 255, 0, 255]));
    assert_eq!(frame.pixel(1, 1), Some([0, 255, 0, 255]));
    assert_eq!(frame.pixel(2, 2), Some([255, 255, 255, 255]));
    assert_eq!(frame.pixel(3, 3), Some([0, 255, 0, 255]));
}

#[test]
fn transparent_pictures_blend_over_the_canvas() {
    let mut img = image::RgbaImage::from_pixel(2, 2, image::Rgba([0, 0, 0, 0]));
    img.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    let mut r = CpuSlideRenderer::new(settings(2, 2));
    let frame = r
        .render(&[picture(0, 0, 2, 2, Arc::new(out.into_inner()))])
        .unwrap();
    assert_eq!(frame.pixel(0, 0), Some([0, 0, 0, 255]));
    assert_eq!(frame.pixel(1, 1), Some([255, 255, 255, 255]));
}

#[test]
fn degenerate_elements_are_skipped() {
    let mut r = CpuSlideRenderer::new(settings(4, 4));
    let frame = r
        .render(&[
            picture(0, 0, 0, 4, Arc::new(b"not an image".to_vec())),
            NormalizedElement::Text {
                rect: PxRect {
                    x: 0,
                    y: 0,
                    width: 4,
                    height: 0,
                },
                runs: vec![TextRun {
                    text: "x".into(),
                    paragraph: 0,
                    size_pt: None,
                }],
            },
        ])
        .unwrap();
    assert!(frame.data.chunks_exact(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn corrupt_payload_is_a_rasterization_error() {
    let mut r = CpuSlideRenderer::new(settings(4, 4));
    let err = r
        .render(&[picture(0, 0, 2, 2, Arc::new(b"not an image".to_vec()))])
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Rasterization(_)));
}

#[test]
fn empty_text_needs_no_font() {
    let mut r = CpuSlideRenderer::new(settings(4, 4));
    let el = NormalizedElement::Text {
        rect: PxRect {
            x: 0,
            y: 0,
            width: 4,
            height: 4,
        },
        runs: vec![],
    };
    assert!(r.render(&[el]).is_ok());
}

#[test]
fn text_paints_inside_its_box_when_a_font_is_available() {
    let Some(font) = load_font(None).unwrap() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut r = CpuSlideRenderer::new(RenderSettings {
        font: Some(font),
        default_font_px: 24.0,
        ..settings(200, 100)
    });
    let el = NormalizedElement::Text {
        rect: PxRect {
            x: 100,
            y: 50,
            width: 90,
            height: 40,
        },
        runs: vec![TextRun {
            text: "Thanks".into(),
            paragraph: 0,
            size_pt: None,
        }],
    };
    let frame = r.render(&[el]).unwrap();
    let mut inked_inside = 0;
    for y in 0..100 {
        for x in 0..200 {
            let px = frame.pixel(x, y).unwrap();
            if px != [255, 255, 255, 255] {
                assert!(x >= 100 && y >= 50, "ink outside text box at ({x},{y})");
                inked_inside += 1;
            }
        }
    }
    assert!(inked_inside > 0);
}

fn ink_bounds(frame: &FrameRGBA) -> Option<(u32, u32, u32, u32)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..frame.height {
        for x in 0..frame.width {
            if frame.pixel(x, y) != Some([255, 255, 255, 255]) {
                let (x0, y0, x1, y1) = bounds.unwrap_or((x, y, x, y));
                bounds = Some((x0.min(x), y0.min(y), x1.max(x), y1.max(y)));
            }
        }
    }
    bounds
}

#[test]
fn glyphs_of_a_run_advance_along_the_line() {
    let Some(font) = load_font(None).unwrap() else {
        eprintln!("skipping: no system font found");
        return;
    };
    let mut r = CpuSlideRenderer::new(RenderSettings {
        font: Some(font),
        default_font_px: 24.0,
        ..settings(400, 120)
    });
    let mut render = |text: &str| {
        let el = NormalizedElement::Text {
            rect: PxRect {
                x: 10,
                y: 50,
                width: 380,
                height: 60,
            },
            runs: vec![TextRun {
                text: text.into(),
                paragraph: 0,
                size_pt: None,
            }],
        };
        ink_bounds(&r.render(&[el]).unwrap()).expect("text leaves ink")
    };

    let one = render("W");
    let eight = render("WWWWWWWW");
    let (one_w, eight_w) = (one.2 - one.0, eight.2 - eight.0);
    assert!(eight_w > one_w * 4, "one glyph {one:?}, eight glyphs {eight:?}");
    assert!(one.1 >= 50, "glyph top {} sits above its box", one.1);
    assert!(eight.1 >= 50);
}
