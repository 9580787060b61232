use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::Context as _;

use crate::audio::media::probe_duration_secs;

/// Synthesized narration for one slide.
#[derive(Clone, Debug, PartialEq)]
pub struct NarrationTrack {
    /// Audio file inside the work area.
    pub path: PathBuf,
    /// Playback duration in seconds.
    pub duration_secs: f64,
}

/// Text-to-speech seam.
///
/// Implementations write an audio file to `out_path` and report its duration. They are shared
/// across worker threads when slides are processed in parallel.
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language` into `out_path`.
    fn synthesize(&self, text: &str, language: &str, out_path: &Path)
    -> anyhow::Result<NarrationTrack>;

    /// File extension (without dot) of the audio this synthesizer writes.
    fn file_extension(&self) -> &str {
        "wav"
    }
}

/// Synthesizer that spawns an external TTS program.
///
/// The text is written to the program's stdin. `{lang}` and `{out}` in the argument list are
/// replaced with the language tag and the output path. Duration is probed with `ffprobe`.
#[derive(Clone, Debug)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    extension: String,
}

impl Default for CommandSynthesizer {
    fn default() -> Self {
        Self::espeak_ng()
    }
}

impl CommandSynthesizer {
    /// `espeak-ng -v {lang} -w {out} --stdin`.
    pub fn espeak_ng() -> Self {
        Self::new(
            "espeak-ng",
            ["-v", "{lang}", "-w", "{out}", "--stdin"],
            "wav",
        )
    }

    /// Build a synthesizer for an arbitrary program and argument template.
    pub fn new<I, S>(program: impl Into<String>, args: I, extension: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            extension: extension.into(),
        }
    }

    /// Program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }

    fn expand_args(&self, language: &str, out_path: &Path) -> Vec<String> {
        let out = out_path.to_string_lossy();
        self.args
            .iter()
            .map(|a| a.replace("{lang}", language).replace("{out}", &out))
            .collect()
    }
}

impl SpeechSynthesizer for CommandSynthesizer {
    #[tracing::instrument(skip(self, text), fields(program = %self.program, chars = text.len()))]
    fn synthesize(
        &self,
        text: &str,
        language: &str,
        out_path: &Path,
    ) -> anyhow::Result<NarrationTrack> {
        if text.trim().is_empty() {
            anyhow::bail!("refusing to synthesize empty narration");
        }

        let mut child = Command::new(&self.program)
            .args(self.expand_args(language, out_path))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn '{}'", self.program))?;

        // Write errors surface only after a successful exit status.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(text.as_bytes()),
            None => Err(std::io::ErrorKind::BrokenPipe.into()),
        };

        let out = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for '{}'", self.program))?;
        if !out.status.success() {
            anyhow::bail!(
                "'{}' exited with status {}: {}",
                self.program,
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            );
        }
        written.context("failed to write narration to synthesizer stdin")?;
        if !out_path.is_file() {
            anyhow::bail!(
                "'{}' did not produce '{}'",
                self.program,
                out_path.display()
            );
        }

        let duration_secs = probe_duration_secs(out_path)?;
        tracing::debug!(duration_secs, "narration synthesized");
        Ok(NarrationTrack {
            path: out_path.to_path_buf(),
            duration_secs,
        })
    }

    fn file_extension(&self) -> &str {
        &self.extension
    }
}

#[cfg(test)]
#[path = "../../tests/unit/narration/tts.rs"]
mod tests;
