use super::*;

#[test]
fn frame_range_contains_is_half_open() {
    let r = FrameRange {
        start: FrameIndex(2),
        end: FrameIndex(5),
    };
    assert_eq!(r.len_frames(), 3);
    assert!(r.contains(FrameIndex(2)));
    assert!(r.contains(FrameIndex(4)));
    assert!(!r.contains(FrameIndex(5)));
}

#[test]
fn fps_validation_and_rounding() {
    assert!(Fps::new(0, 1).is_err());
    assert!(Fps::new(24, 0).is_err());
    let fps = Fps::new(24, 1).unwrap();
    assert_eq!(fps.secs_to_frames_round(2.0), 48);
    assert_eq!(fps.secs_to_frames_round(1.02), 24);
    assert_eq!(fps.secs_to_frames_round(-1.0), 0);
}

#[test]
fn frames_to_samples_uses_rational_fps() {
    let ntsc = Fps::new(30_000, 1001).unwrap();
    assert_eq!(ntsc.frames_to_samples(0, 48_000), 0);
    assert_eq!(ntsc.frames_to_samples(30_000, 48_000), 48_048_000);
    assert_eq!(Fps::new(24, 1).unwrap().frames_to_samples(24, 48_000), 48_000);
}

#[test]
fn encodable_resolution_is_even_and_non_zero() {
    let ok = Resolution {
        width: 1280,
        height: 720,
    };
    assert!(ok.check_encodable().is_ok());
    for (w, h) in [(0, 720), (1281, 720), (1280, 719)] {
        let r = Resolution {
            width: w,
            height: h,
        };
        assert!(matches!(
            r.check_encodable().unwrap_err(),
            SlidecastError::Validation(_)
        ));
    }
}

#[test]
fn premul_conversion_scales_color_by_alpha() {
    let c = Rgba8Premul::from_straight_rgba(255, 128, 0, 128);
    assert_eq!(c.to_array(), [128, 64, 0, 128]);
    let opaque = Rgba8Premul::from_straight_rgba(10, 20, 30, 255);
    assert_eq!(opaque.to_array(), [10, 20, 30, 255]);
}
