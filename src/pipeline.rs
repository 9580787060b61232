//! End-to-end conversion: uploaded deck in, narrated video out.
//!
//! [`Converter`] owns the configuration and the two external collaborators (document parser and
//! speech synthesizer). Each [`Converter::convert`] call runs in its own [`WorkArea`], so
//! concurrent requests never share intermediates.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use crate::audio::track::build_audio_bed;
use crate::config::PipelineConfig;
use crate::deck::{Deck, DocumentParser, PptxParser, Slide, extract_deck};
use crate::encode::ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir};
use crate::encode::sink::FrameSink;
use crate::foundation::cancel::CancelToken;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::narration::text::narration_for;
use crate::narration::tts::{CommandSynthesizer, SpeechSynthesizer};
use crate::render::backend::{
    FrameRGBA, RenderSettings, RendererKind, SlideRenderer, create_renderer,
};
use crate::render::units::UnitConverter;
use crate::timeline::{MaterializeStats, Segment, Timeline, build_segment};
use crate::workarea::WorkArea;

/// An uploaded document.
#[derive(Clone, Debug)]
pub struct Upload {
    /// Client-supplied file name; only used to name the staged copy.
    pub filename: String,
    /// Document bytes.
    pub bytes: Vec<u8>,
}

/// One conversion request.
#[derive(Clone, Debug)]
pub struct ConversionRequest {
    /// The uploaded deck. `None` models a request without a file part.
    pub document: Option<Upload>,
    /// Where the finished video is written.
    pub output_path: PathBuf,
}

/// Per-slide outcome reported back to the caller.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct SegmentSummary {
    /// Slide index.
    pub index: usize,
    /// Offset of the segment in the video, in seconds.
    pub start_secs: f64,
    /// Segment duration in seconds.
    pub duration_secs: f64,
    /// Whether the segment carries narration.
    pub narrated: bool,
}

/// Result of a successful conversion.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct ConversionOutput {
    /// Location of the finished video.
    pub video_path: PathBuf,
    /// Sum of all segment durations.
    pub total_duration_secs: f64,
    /// Frames handed to the encoder.
    pub frames_total: u64,
    /// One entry per slide, in slide order.
    pub segments: Vec<SegmentSummary>,
}

/// Narration text chosen for one slide.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
pub struct SlideNarration {
    /// Slide index.
    pub index: usize,
    /// Text that would be synthesized; `None` for a silent slide.
    pub text: Option<String>,
}

/// Deck-to-video converter.
pub struct Converter {
    cfg: PipelineConfig,
    parser: Arc<dyn DocumentParser>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    settings: RenderSettings,
    output_locks: Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>,
}

static PARTIAL_SEQ: AtomicU64 = AtomicU64::new(0);

impl Converter {
    /// Create a converter. The configuration is validated and the font is loaded once here.
    pub fn new(
        cfg: PipelineConfig,
        parser: Arc<dyn DocumentParser>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> SlidecastResult<Self> {
        cfg.validate()?;
        let settings = RenderSettings::from_config(&cfg)?;
        Ok(Self {
            cfg,
            parser,
            synthesizer,
            settings,
            output_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Converter using [`PptxParser`] and the default `espeak-ng` synthesizer.
    pub fn with_defaults(cfg: PipelineConfig) -> SlidecastResult<Self> {
        Self::new(
            cfg,
            Arc::new(PptxParser::new()),
            Arc::new(CommandSynthesizer::default()),
        )
    }

    /// Active configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.cfg
    }

    /// Convert a deck, encoding into the sink produced by `sink_factory`.
    ///
    /// The factory receives a request-unique temporary path next to the requested output; the
    /// file is renamed into place only after the sink finished successfully.
    #[tracing::instrument(skip_all, fields(output = %req.output_path.display()))]
    pub fn convert<F>(
        &self,
        req: ConversionRequest,
        sink_factory: F,
        cancel: &CancelToken,
    ) -> SlidecastResult<ConversionOutput>
    where
        F: FnOnce(&Path) -> SlidecastResult<Box<dyn FrameSink>>,
    {
        let upload = req
            .document
            .ok_or_else(|| SlidecastError::input("no document uploaded"))?;
        if upload.bytes.is_empty() {
            return Err(SlidecastError::input(format!(
                "uploaded document '{}' is empty",
                upload.filename
            )));
        }
        if req.output_path.as_os_str().is_empty() {
            return Err(SlidecastError::input("output path is empty"));
        }

        let work_area = WorkArea::create(self.cfg.work_dir.as_deref())?;
        let staged = work_area.stage_upload(&upload.filename, &upload.bytes)?;
        tracing::debug!(staged = %staged.display(), bytes = upload.bytes.len(), "upload staged");

        let deck = self.load_deck(&upload.bytes)?;
        tracing::info!(slides = deck.len(), "deck parsed");

        let segments = self.build_segments(&deck, &work_area, cancel)?;
        let timeline = Timeline::assemble(segments)?;
        cancel.check()?;

        let stats = self.encode(&timeline, &work_area, &req.output_path, sink_factory, cancel)?;

        let segments = timeline
            .segments()
            .iter()
            .zip(timeline.segment_starts_secs())
            .map(|(s, start_secs)| SegmentSummary {
                index: s.index,
                start_secs,
                duration_secs: s.duration_secs,
                narrated: s.is_narrated(),
            })
            .collect();
        let out = ConversionOutput {
            video_path: req.output_path,
            total_duration_secs: timeline.total_duration_secs(),
            frames_total: stats.frames_total,
            segments,
        };

        if let Err(e) = work_area.close() {
            tracing::warn!(error = %e, "work area cleanup failed");
        }
        tracing::info!(
            total_secs = out.total_duration_secs,
            frames = out.frames_total,
            "conversion finished"
        );
        Ok(out)
    }

    /// Convert a deck to an MP4 through the system `ffmpeg`.
    pub fn convert_to_mp4(
        &self,
        req: ConversionRequest,
        cancel: &CancelToken,
    ) -> SlidecastResult<ConversionOutput> {
        let [r, g, b, _] = self.cfg.background_rgba;
        self.convert(
            req,
            |path| {
                let mut opts = FfmpegSinkOpts::new(path);
                opts.background_rgb = [r, g, b];
                Ok(Box::new(FfmpegSink::new(opts)) as Box<dyn FrameSink>)
            },
            cancel,
        )
    }

    /// Rasterize a single slide without synthesizing or encoding anything.
    pub fn render_slide_frame(&self, bytes: &[u8], index: usize) -> SlidecastResult<FrameRGBA> {
        let deck = self.load_deck(bytes)?;
        let slide = deck.slides.get(index).ok_or_else(|| {
            SlidecastError::input(format!(
                "slide {index} out of range (deck has {} slides)",
                deck.len()
            ))
        })?;
        let mut renderer = create_renderer(RendererKind::Cpu, &self.settings);
        let elements = self.unit_converter(&deck).normalize_all(&slide.shapes);
        renderer.render(&elements)
    }

    /// Narration text each slide would be given.
    pub fn narrations(&self, bytes: &[u8]) -> SlidecastResult<Vec<SlideNarration>> {
        let deck = self.load_deck(bytes)?;
        Ok(deck
            .slides
            .iter()
            .map(|s| SlideNarration {
                index: s.index,
                text: narration_for(s, &self.cfg),
            })
            .collect())
    }

    fn load_deck(&self, bytes: &[u8]) -> SlidecastResult<Deck> {
        let raw = self.parser.parse(bytes).map_err(|e| match e {
            SlidecastError::Parse(_) | SlidecastError::Cancelled => e,
            other => SlidecastError::parse(other.to_string()),
        })?;
        let deck = extract_deck(&raw);
        if deck.is_empty() {
            return Err(SlidecastError::parse("presentation has no slides"));
        }
        Ok(deck)
    }

    fn unit_converter(&self, deck: &Deck) -> UnitConverter {
        let fixed = UnitConverter::new(self.cfg.emu_per_px);
        let Some(size) = deck.slide_size_emu else {
            return fixed;
        };
        if self.cfg.fit_to_slide
            && let Some(fit) = UnitConverter::fit(size, self.cfg.resolution)
        {
            tracing::debug!(
                emu_per_px = fit.emu_per_px(),
                origin = ?fit.origin(),
                "slide scaled to output frame"
            );
            return fit;
        }
        let px = (
            i64::from(fixed.convert(size.0)),
            i64::from(fixed.convert(size.1)),
        );
        let frame = (
            i64::from(self.cfg.resolution.width),
            i64::from(self.cfg.resolution.height),
        );
        if px != frame {
            tracing::warn!(
                slide_px = ?px,
                frame_px = ?frame,
                "slide size does not match the output resolution"
            );
        }
        fixed
    }

    fn build_segments(
        &self,
        deck: &Deck,
        work_area: &WorkArea,
        cancel: &CancelToken,
    ) -> SlidecastResult<Vec<Segment>> {
        let units = self.unit_converter(deck);
        if !self.cfg.parallel {
            let mut renderer = create_renderer(RendererKind::Cpu, &self.settings);
            return deck
                .slides
                .iter()
                .map(|s| self.process_slide(s, units, renderer.as_mut(), work_area, cancel))
                .collect();
        }

        let pool = build_thread_pool(self.cfg.threads)?;
        pool.install(|| {
            deck.slides
                .par_iter()
                .map_init(
                    || create_renderer(RendererKind::Cpu, &self.settings),
                    |renderer, s| {
                        self.process_slide(s, units, renderer.as_mut(), work_area, cancel)
                    },
                )
                .collect()
        })
    }

    #[tracing::instrument(skip_all, fields(slide = slide.index))]
    fn process_slide(
        &self,
        slide: &Slide,
        units: UnitConverter,
        renderer: &mut dyn SlideRenderer,
        work_area: &WorkArea,
        cancel: &CancelToken,
    ) -> SlidecastResult<Segment> {
        cancel.check()?;

        let elements = units.normalize_all(&slide.shapes);
        let frame = renderer.render(&elements)?;
        let image = work_area.slide_image_path(slide.index)?;
        frame.save_png(&image)?;

        let narration = narration_for(slide, &self.cfg);
        build_segment(
            slide.index,
            &image,
            narration.as_deref(),
            self.synthesizer.as_ref(),
            &self.cfg.language,
            work_area,
            self.cfg.default_silent_secs,
        )
    }

    fn encode<F>(
        &self,
        timeline: &Timeline,
        work_area: &WorkArea,
        output_path: &Path,
        sink_factory: F,
        cancel: &CancelToken,
    ) -> SlidecastResult<MaterializeStats>
    where
        F: FnOnce(&Path) -> SlidecastResult<Box<dyn FrameSink>>,
    {
        ensure_parent_dir(output_path)?;
        let lock = self.output_lock(output_path);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let partial = partial_path(output_path);
        let result = self.encode_to(timeline, work_area, &partial, sink_factory, cancel);

        let stats = match result {
            Ok(stats) => stats,
            Err(e) => {
                let _ = std::fs::remove_file(&partial);
                return Err(e);
            }
        };
        if partial.exists() {
            std::fs::rename(&partial, output_path).map_err(|e| {
                let _ = std::fs::remove_file(&partial);
                SlidecastError::encoding(format!(
                    "failed to move '{}' to '{}': {e}",
                    partial.display(),
                    output_path.display()
                ))
            })?;
        }
        Ok(stats)
    }

    /// The sink is dropped before this returns, so an aborted encoder has stopped writing.
    fn encode_to<F>(
        &self,
        timeline: &Timeline,
        work_area: &WorkArea,
        path: &Path,
        sink_factory: F,
        cancel: &CancelToken,
    ) -> SlidecastResult<MaterializeStats>
    where
        F: FnOnce(&Path) -> SlidecastResult<Box<dyn FrameSink>>,
    {
        let mut sink = sink_factory(path)?;
        let audio = if sink.supports_audio() {
            build_audio_bed(timeline, self.cfg.fps, work_area)?
        } else {
            None
        };
        timeline.materialize(
            sink.as_mut(),
            self.cfg.resolution,
            self.cfg.fps,
            audio,
            cancel,
        )
    }

    fn output_lock(&self, output_path: &Path) -> Arc<Mutex<()>> {
        let key = std::path::absolute(output_path).unwrap_or_else(|_| output_path.to_path_buf());
        let mut locks = self
            .output_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        locks.entry(key).or_default().clone()
    }
}

fn partial_path(output_path: &Path) -> PathBuf {
    let seq = PARTIAL_SEQ.fetch_add(1, Ordering::Relaxed);
    let name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_owned());
    output_path.with_file_name(format!(".{name}.{}-{seq}.partial", std::process::id()))
}

fn build_thread_pool(threads: Option<usize>) -> SlidecastResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(SlidecastError::validation(
            "pipeline 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| SlidecastError::validation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../tests/unit/pipeline/pipeline.rs"]
mod tests;
