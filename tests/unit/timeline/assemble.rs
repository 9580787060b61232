use super::*;
use crate::encode::sink::InMemorySink;
use crate::foundation::core::Rgba8Premul;
use std::path::{Path, PathBuf};

fn seg(index: usize, secs: f64, image: &Path) -> Segment {
    Segment {
        index,
        image: image.to_path_buf(),
        narration: None,
        duration_secs: secs,
    }
}

fn write_slide(dir: &Path, name: &str, rgb: [u8; 3]) -> PathBuf {
    let p = dir.join(name);
    FrameRGBA::solid(4, 2, Rgba8Premul::from_straight_rgba(rgb[0], rgb[1], rgb[2], 255))
        .save_png(&p)
        .unwrap();
    p
}

struct BrokenSink;

impl FrameSink for BrokenSink {
    fn begin(&mut self, _: SinkConfig) -> SlidecastResult<()> {
        Ok(())
    }
    fn push_still(&mut self, _: FrameRange, _: &FrameRGBA) -> SlidecastResult<()> {
        Err(SlidecastError::validation("disk full"))
    }
    fn end(&mut self) -> SlidecastResult<()> {
        Ok(())
    }
}

#[test]
fn assemble_orders_by_index_regardless_of_completion_order() {
    let p = Path::new("x.png");
    let tl = Timeline::assemble(vec![seg(2, 1.0, p), seg(0, 2.0, p), seg(1, 3.0, p)]).unwrap();
    let order: Vec<_> = tl.segments().iter().map(|s| s.index).collect();
    assert_eq!(order, vec![0, 1, 2]);
    assert_eq!(tl.total_duration_secs(), 6.0);
    assert_eq!(tl.segment_starts_secs(), vec![0.0, 2.0, 5.0]);
}

#[test]
fn assemble_rejects_gaps_duplicates_and_empty() {
    let p = Path::new("x.png");
    assert!(Timeline::assemble(vec![]).is_err());
    assert!(Timeline::assemble(vec![seg(0, 1.0, p), seg(2, 1.0, p)]).is_err());
    assert!(Timeline::assemble(vec![seg(0, 1.0, p), seg(0, 1.0, p)]).is_err());
    assert!(Timeline::assemble(vec![seg(0, 0.0, p)]).is_err());
}

#[test]
fn frame_spans_are_contiguous_and_use_cumulative_rounding() {
    let p = Path::new("x.png");
    let fps = Fps::new(10, 1).unwrap();
    let tl = Timeline::assemble(vec![seg(0, 0.34, p), seg(1, 0.34, p), seg(2, 0.34, p)]).unwrap();
    let spans = tl.frame_spans(fps);
    let bounds: Vec<_> = spans.iter().map(|r| (r.start.0, r.end.0)).collect();
    // 0.34, 0.68, 1.02 seconds -> 3, 7, 10 frames.
    assert_eq!(bounds, vec![(0, 3), (3, 7), (7, 10)]);
    assert_eq!(tl.total_frames(fps), 10);
}

#[test]
fn very_short_segments_still_get_a_frame() {
    let p = Path::new("x.png");
    let fps = Fps::new(24, 1).unwrap();
    let tl = Timeline::assemble(vec![seg(0, 0.001, p), seg(1, 0.001, p), seg(2, 1.0, p)]).unwrap();
    let spans = tl.frame_spans(fps);
    for w in spans.windows(2) {
        assert_eq!(w[0].end, w[1].start);
    }
    assert!(spans.iter().all(|r| r.len_frames() >= 1));
    assert_eq!(spans[0].start, FrameIndex(0));
    assert_eq!(spans[2].end, FrameIndex(24));
}

#[test]
fn materialize_pushes_each_image_over_its_span() {
    let dir = tempfile::tempdir().unwrap();
    let red = write_slide(dir.path(), "a.png", [255, 0, 0]);
    let blue = write_slide(dir.path(), "b.png", [0, 0, 255]);
    let tl = Timeline::assemble(vec![seg(1, 0.2, &blue), seg(0, 0.3, &red)]).unwrap();

    let mut sink = InMemorySink::new();
    let res = Resolution {
        width: 4,
        height: 2,
    };
    let fps = Fps::new(10, 1).unwrap();
    let stats = tl
        .materialize(&mut sink, res, fps, None, &CancelToken::new())
        .unwrap();

    assert_eq!(
        stats,
        MaterializeStats {
            segments: 2,
            frames_total: 5
        }
    );
    assert!(sink.is_ended());
    assert_eq!(sink.frame_count(), 5);
    let px = |i: u64| sink.frame(FrameIndex(i)).unwrap().pixel(0, 0);
    assert_eq!(px(0), Some([255, 0, 0, 255]));
    assert_eq!(px(2), Some([255, 0, 0, 255]));
    assert_eq!(px(3), Some([0, 0, 255, 255]));
    assert_eq!(px(4), Some([0, 0, 255, 255]));
    let spans: Vec<_> = sink.stills().iter().map(|(r, _)| (r.start.0, r.end.0)).collect();
    assert_eq!(spans, vec![(0, 3), (3, 5)]);
}

#[test]
fn sink_failure_becomes_encoding_error() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_slide(dir.path(), "a.png", [1, 2, 3]);
    let tl = Timeline::assemble(vec![seg(0, 1.0, &img)]).unwrap();
    let err = tl
        .materialize(
            &mut BrokenSink,
            Resolution {
                width: 4,
                height: 2,
            },
            Fps::default(),
            None,
            &CancelToken::new(),
        )
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Encoding(m) if m.contains("disk full")));
}

#[test]
fn cancelled_token_stops_materialization() {
    let dir = tempfile::tempdir().unwrap();
    let img = write_slide(dir.path(), "a.png", [1, 2, 3]);
    let tl = Timeline::assemble(vec![seg(0, 1.0, &img)]).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut sink = InMemorySink::new();
    let err = tl
        .materialize(
            &mut sink,
            Resolution {
                width: 4,
                height: 2,
            },
            Fps::default(),
            None,
            &cancel,
        )
        .unwrap_err();
    assert!(matches!(err, SlidecastError::Cancelled));
    assert!(!sink.is_ended());
}
