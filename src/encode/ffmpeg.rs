//! H.264 encoding through the system `ffmpeg`.
//!
//! Raw RGBA frames are piped to ffmpeg's stdin; the narration bed, when present, is read from a
//! raw `f32le` file as a second input. Each slide still is flattened once and its bytes are
//! repeated for the whole span.

use std::ffi::OsString;
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use crate::audio::media::is_tool_on_path;
use crate::encode::sink::{FrameSink, SinkConfig, StillCursor};
use crate::foundation::core::FrameRange;
use crate::foundation::error::{SlidecastError, SlidecastResult};
use crate::foundation::math::flatten_onto_rgb;
use crate::render::backend::FrameRGBA;

/// Options for [`FfmpegSink`].
#[derive(Clone, Debug)]
pub struct FfmpegSinkOpts {
    /// Output file path.
    pub out_path: PathBuf,
    /// Replace an existing file at `out_path`.
    pub overwrite: bool,
    /// Opaque colour that shows through transparent slide pixels.
    pub background_rgb: [u8; 3],
    /// Container passed as `-f`, so `out_path` needs no matching extension.
    pub container: String,
}

impl FfmpegSinkOpts {
    /// MP4 output to `out_path` over a white background.
    pub fn new(out_path: impl Into<PathBuf>) -> Self {
        Self {
            out_path: out_path.into(),
            overwrite: true,
            background_rgb: [255, 255, 255],
            container: "mp4".to_owned(),
        }
    }
}

/// A running ffmpeg process. Dropping it kills an encode that was not finished.
struct Encoder {
    child: Child,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<u8>>>,
}

impl Encoder {
    fn spawn(args: &[OsString]) -> SlidecastResult<Self> {
        let mut child = Command::new("ffmpeg")
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SlidecastError::encoding(format!("failed to spawn ffmpeg: {e}")))?;

        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });
        Ok(Self {
            child,
            stdin,
            stderr,
        })
    }

    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(bytes),
            None => Err(std::io::ErrorKind::BrokenPipe.into()),
        }
    }

    /// Close stdin and wait; a non-zero exit is reported with ffmpeg's own diagnostics.
    fn finish(mut self) -> SlidecastResult<()> {
        drop(self.stdin.take());
        let status = self
            .child
            .wait()
            .map_err(|e| SlidecastError::encoding(format!("failed to wait for ffmpeg: {e}")))?;
        let stderr = self
            .stderr
            .take()
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        if status.success() {
            return Ok(());
        }
        Err(SlidecastError::encoding(format!(
            "ffmpeg exited with {status}: {}",
            String::from_utf8_lossy(&stderr).trim()
        )))
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        drop(self.stdin.take());
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        if let Some(h) = self.stderr.take() {
            let _ = h.join();
        }
    }
}

/// Sink that encodes the slideshow to a video file with the system `ffmpeg`.
pub struct FfmpegSink {
    opts: FfmpegSinkOpts,
    cfg: Option<SinkConfig>,
    cursor: StillCursor,
    encoder: Option<Encoder>,
    flat: Vec<u8>,
}

impl FfmpegSink {
    /// Sink writing to `opts.out_path`; ffmpeg is started in `begin`.
    pub fn new(opts: FfmpegSinkOpts) -> Self {
        Self {
            opts,
            cfg: None,
            cursor: StillCursor::default(),
            encoder: None,
            flat: Vec::new(),
        }
    }

    /// Prefer ffmpeg's exit status and stderr over the broken-pipe error.
    fn write_failed(&mut self, err: std::io::Error) -> SlidecastError {
        match self.encoder.take().map(Encoder::finish) {
            Some(Err(exit)) => exit,
            _ => SlidecastError::encoding(format!("failed to write frame to ffmpeg: {err}")),
        }
    }
}

impl FrameSink for FfmpegSink {
    fn begin(&mut self, cfg: SinkConfig) -> SlidecastResult<()> {
        cfg.resolution.check_encodable()?;
        ensure_parent_dir(&self.opts.out_path)?;
        if !self.opts.overwrite && self.opts.out_path.exists() {
            return Err(SlidecastError::validation(format!(
                "output file '{}' already exists",
                self.opts.out_path.display()
            )));
        }
        if !is_ffmpeg_on_path() {
            return Err(SlidecastError::encoding(
                "ffmpeg is required for video encoding, but was not found on PATH",
            ));
        }

        let args = encoder_args(&self.opts, &cfg)?;
        self.encoder = Some(Encoder::spawn(&args)?);
        tracing::debug!(
            out = %self.opts.out_path.display(),
            audio = cfg.audio.is_some(),
            "ffmpeg started"
        );
        let px = cfg.resolution.width as usize * cfg.resolution.height as usize;
        self.flat = vec![0u8; px * 4];
        self.cursor.reset();
        self.cfg = Some(cfg);
        Ok(())
    }

    fn push_still(&mut self, span: FrameRange, frame: &FrameRGBA) -> SlidecastResult<()> {
        let cfg = self
            .cfg
            .as_ref()
            .ok_or_else(|| SlidecastError::encoding("ffmpeg sink not started"))?;
        self.cursor.advance(cfg, span, frame)?;
        flatten_onto_rgb(&mut self.flat, &frame.data, self.opts.background_rgb)?;

        let Some(encoder) = self.encoder.as_mut() else {
            return Err(SlidecastError::encoding("ffmpeg sink is already finished"));
        };
        for _ in 0..span.len_frames() {
            if let Err(e) = encoder.write(&self.flat) {
                return Err(self.write_failed(e));
            }
        }
        Ok(())
    }

    fn end(&mut self) -> SlidecastResult<()> {
        let encoder = self
            .encoder
            .take()
            .ok_or_else(|| SlidecastError::encoding("ffmpeg sink not started"))?;
        self.cfg = None;
        encoder.finish()
    }
}

/// Command line for one encode: rawvideo on stdin, optional PCM bed, H.264/yuv420p out.
fn encoder_args(opts: &FfmpegSinkOpts, cfg: &SinkConfig) -> SlidecastResult<Vec<OsString>> {
    let mut args = Vec::new();
    extend(&mut args, &[if opts.overwrite { "-y" } else { "-n" }, "-loglevel", "error"]);
    extend(
        &mut args,
        &[
            "-f",
            "rawvideo",
            "-pix_fmt",
            "rgba",
            "-s",
            &format!("{}x{}", cfg.resolution.width, cfg.resolution.height),
            "-r",
            &format!("{}/{}", cfg.fps.num, cfg.fps.den),
            "-i",
            "pipe:0",
        ],
    );

    match &cfg.audio {
        Some(audio) => {
            if audio.sample_rate == 0 || audio.channels == 0 {
                return Err(SlidecastError::validation(format!(
                    "narration bed needs a sample rate and channels, got {} Hz x {}",
                    audio.sample_rate, audio.channels
                )));
            }
            extend(
                &mut args,
                &[
                    "-f",
                    "f32le",
                    "-ar",
                    &audio.sample_rate.to_string(),
                    "-ac",
                    &audio.channels.to_string(),
                    "-i",
                ],
            );
            args.push(audio.path.clone().into_os_string());
            extend(&mut args, &["-c:a", "aac", "-shortest"]);
        }
        None => extend(&mut args, &["-an"]),
    }

    extend(
        &mut args,
        &[
            "-c:v",
            "libx264",
            "-pix_fmt",
            "yuv420p",
            "-movflags",
            "+faststart",
            "-f",
            &opts.container,
        ],
    );
    args.push(opts.out_path.clone().into_os_string());
    Ok(args)
}

fn extend(args: &mut Vec<OsString>, items: &[&str]) {
    args.extend(items.iter().map(OsString::from));
}

/// Create the parent directory of `path` when it has one.
pub fn ensure_parent_dir(path: &Path) -> SlidecastResult<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        use anyhow::Context as _;
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output directory '{}'", parent.display()))?;
    }
    Ok(())
}

/// Return `true` when `ffmpeg` can be invoked from `PATH`.
pub fn is_ffmpeg_on_path() -> bool {
    is_tool_on_path("ffmpeg")
}

#[cfg(test)]
#[path = "../../tests/unit/encode/ffmpeg.rs"]
mod tests;
