use super::*;
use crate::encode::sink::AudioInputConfig;
use crate::foundation::core::{Fps, FrameIndex, Resolution};

fn cfg(audio: Option<AudioInputConfig>) -> SinkConfig {
    SinkConfig {
        resolution: Resolution {
            width: 4,
            height: 2,
        },
        fps: Fps::new(30_000, 1001).unwrap(),
        audio,
    }
}

fn args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> Vec<String> {
    encoder_args(opts, cfg)
        .unwrap()
        .into_iter()
        .map(|a| a.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn silent_encode_disables_audio_and_forces_container() {
    let args = args(&FfmpegSinkOpts::new("/tmp/out.mp4.partial"), &cfg(None));
    assert!(args.contains(&"-an".to_owned()));
    assert!(args.contains(&"30000/1001".to_owned()));
    assert!(args.contains(&"4x2".to_owned()));
    assert_eq!(args[0], "-y");
    let tail: Vec<_> = args.iter().rev().take(3).rev().cloned().collect();
    assert_eq!(tail, vec!["-f", "mp4", "/tmp/out.mp4.partial"]);
}

#[test]
fn narrated_encode_reads_the_pcm_bed() {
    let audio = AudioInputConfig {
        path: PathBuf::from("/w/bed.f32le"),
        sample_rate: 48_000,
        channels: 2,
    };
    let args = args(&FfmpegSinkOpts::new("out.mp4"), &cfg(Some(audio)));
    let bed = args.iter().position(|a| a == "/w/bed.f32le").unwrap();
    assert_eq!(args[bed - 1], "-i");
    assert!(args.contains(&"f32le".to_owned()));
    assert!(args.contains(&"aac".to_owned()));
    assert!(!args.contains(&"-an".to_owned()));
}

#[test]
fn keep_existing_output_uses_no_overwrite_flag() {
    let mut opts = FfmpegSinkOpts::new("out.mp4");
    opts.overwrite = false;
    assert_eq!(args(&opts, &cfg(None))[0], "-n");
}

#[test]
fn bed_without_sample_rate_is_rejected() {
    let audio = AudioInputConfig {
        path: PathBuf::from("bed.f32le"),
        sample_rate: 0,
        channels: 2,
    };
    assert!(encoder_args(&FfmpegSinkOpts::new("out.mp4"), &cfg(Some(audio))).is_err());
}

#[test]
fn begin_rejects_odd_dimensions() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mp4"));
    let mut c = cfg(None);
    c.resolution.width = 5;
    assert!(matches!(
        sink.begin(c).unwrap_err(),
        SlidecastError::Validation(_)
    ));
}

#[test]
fn push_before_begin_is_an_encoding_error() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mp4"));
    let frame = FrameRGBA {
        width: 4,
        height: 2,
        data: vec![0; 32],
    };
    let span = FrameRange {
        start: FrameIndex(0),
        end: FrameIndex(3),
    };
    assert!(matches!(
        sink.push_still(span, &frame).unwrap_err(),
        SlidecastError::Encoding(_)
    ));
}

#[test]
fn end_before_begin_is_an_encoding_error() {
    let mut sink = FfmpegSink::new(FfmpegSinkOpts::new("out.mp4"));
    assert!(matches!(sink.end().unwrap_err(), SlidecastError::Encoding(_)));
}
