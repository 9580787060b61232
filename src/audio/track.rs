use std::path::Path;

use crate::audio::media::{AudioPcm, MIX_SAMPLE_RATE, decode_audio_f32_stereo};
use crate::encode::sink::AudioInputConfig;
use crate::foundation::core::{Fps, FrameRange};
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::timeline::Timeline;
use crate::workarea::WorkArea;

const BED_CHANNELS: u16 = 2;

/// One narration clip placed on the bed.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BedClip<'a> {
    /// First sample of the owning segment.
    pub start_sample: u64,
    /// One past the last sample of the owning segment.
    pub end_sample: u64,
    /// Decoded narration (stereo, bed sample rate).
    pub pcm: &'a AudioPcm,
}

/// Build the narration bed for `timeline` and write it into the work area.
///
/// Each narration starts at its segment's first frame and is cut at the segment's last; the rest
/// of the bed is silence. Returns `None` when no segment is narrated.
#[tracing::instrument(skip_all, fields(segments = timeline.len()))]
pub fn build_audio_bed(
    timeline: &Timeline,
    fps: Fps,
    work_area: &WorkArea,
) -> SlidecastResult<Option<AudioInputConfig>> {
    if !timeline.segments().iter().any(|s| s.is_narrated()) {
        return Ok(None);
    }

    let spans = timeline.frame_spans(fps);
    let total_frames = spans.last().map_or(0, |r| r.end.0);
    let total_samples = fps.frames_to_samples(total_frames, MIX_SAMPLE_RATE);

    let mut decoded = Vec::new();
    for (seg, span) in timeline.segments().iter().zip(&spans) {
        let Some(track) = seg.narration.as_ref() else {
            continue;
        };
        let pcm = decode_audio_f32_stereo(&track.path, MIX_SAMPLE_RATE)?;
        decoded.push((*span, pcm));
    }

    let clips: Vec<BedClip<'_>> = decoded
        .iter()
        .map(|(span, pcm)| clip_for_span(*span, fps, pcm))
        .collect();
    let bed = lay_out_bed(total_samples, BED_CHANNELS, &clips)?;

    let path = work_area.audio_bed_path()?;
    write_f32le_file(&bed, &path)?;
    tracing::debug!(samples = total_samples, clips = clips.len(), "narration bed written");
    Ok(Some(AudioInputConfig {
        path,
        sample_rate: MIX_SAMPLE_RATE,
        channels: BED_CHANNELS,
    }))
}

fn clip_for_span(span: FrameRange, fps: Fps, pcm: &AudioPcm) -> BedClip<'_> {
    BedClip {
        start_sample: fps.frames_to_samples(span.start.0, MIX_SAMPLE_RATE),
        end_sample: fps.frames_to_samples(span.end.0, MIX_SAMPLE_RATE),
        pcm,
    }
}

/// Interleaved silence of `total_samples` frames with every clip copied in at its start.
///
/// A clip whose channel layout differs from the bed is an encoding error.
pub(crate) fn lay_out_bed(
    total_samples: u64,
    channels: u16,
    clips: &[BedClip<'_>],
) -> SlidecastResult<Vec<f32>> {
    let ch = usize::from(channels);
    let total = total_samples as usize;
    let mut out = vec![0.0f32; total * ch];

    for clip in clips {
        if clip.pcm.channels != channels {
            return Err(SlidecastError::encoding(format!(
                "narration at sample {} has {} channels, bed expects {channels}",
                clip.start_sample, clip.pcm.channels
            )));
        }
        let start = (clip.start_sample as usize).min(total);
        let end = (clip.end_sample as usize).min(total);
        let n = end.saturating_sub(start).min(clip.pcm.frames());
        out[start * ch..(start + n) * ch].copy_from_slice(&clip.pcm.interleaved_f32[..n * ch]);
    }

    for s in &mut out {
        *s = s.clamp(-1.0, 1.0);
    }
    Ok(out)
}

/// Write interleaved `f32` PCM samples to a raw little-endian `.f32le` file.
pub(crate) fn write_f32le_file(samples_interleaved: &[f32], out_path: &Path) -> SlidecastResult<()> {
    let mut bytes = Vec::<u8>::with_capacity(samples_interleaved.len() * 4);
    for &sample in samples_interleaved {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    std::fs::write(out_path, bytes).map_err(|e| {
        SlidecastError::encoding(format!(
            "failed to write narration bed '{}': {e}",
            out_path.display()
        ))
    })
}

#[cfg(test)]
#[path = "../../tests/unit/audio/track.rs"]
mod tests;
