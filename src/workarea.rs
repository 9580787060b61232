//! Per-request scratch directory for intermediates (staged upload, slide images, narration audio,
//! the audio bed).
//!
//! Everything handed out by a [`WorkArea`] is removed when it goes out of scope, on success and on
//! every error path alike. The final video is written elsewhere and is never tracked here.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context as _;

use crate::foundation::error::{SlidecastError, SlidecastResult};

/// Unique directory owned by one conversion, plus the intermediate paths it has handed out.
#[derive(Debug)]
pub struct WorkArea {
    dir: Option<tempfile::TempDir>,
    root: PathBuf,
    tracked: Mutex<BTreeSet<PathBuf>>,
}

impl WorkArea {
    /// Create a fresh directory under `base` (or the system temp dir).
    pub fn create(base: Option<&Path>) -> SlidecastResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("slidecast-");
        let dir = match base {
            Some(base) => {
                std::fs::create_dir_all(base).with_context(|| {
                    format!("failed to create work directory base '{}'", base.display())
                })?;
                builder.tempdir_in(base)
            }
            None => builder.tempdir(),
        }
        .context("failed to create work area")?;

        let root = dir.path().to_path_buf();
        tracing::debug!(root = %root.display(), "work area created");
        Ok(Self {
            dir: Some(dir),
            root,
            tracked: Mutex::new(BTreeSet::new()),
        })
    }

    /// Directory holding this request's intermediates.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Register an intermediate for cleanup. Paths outside the work area are rejected so the
    /// final output can never be swept up by accident.
    pub fn track(&self, path: impl Into<PathBuf>) -> SlidecastResult<PathBuf> {
        let path = path.into();
        if !path.starts_with(&self.root) {
            return Err(SlidecastError::validation(format!(
                "refusing to track '{}' outside work area '{}'",
                path.display(),
                self.root.display()
            )));
        }
        self.lock_tracked().insert(path.clone());
        Ok(path)
    }

    /// Write the uploaded document into the work area.
    ///
    /// Only the final component of `filename` is used, so a crafted name cannot escape the
    /// directory.
    pub fn stage_upload(&self, filename: &str, bytes: &[u8]) -> SlidecastResult<PathBuf> {
        let name = Path::new(filename)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("upload.bin");
        let path = self.track(self.root.join(format!("upload-{name}")))?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to stage upload '{}'", path.display()))?;
        Ok(path)
    }

    /// Path of the rasterized image for slide `index`.
    pub fn slide_image_path(&self, index: usize) -> SlidecastResult<PathBuf> {
        self.track(self.root.join(format!("slide_{index:04}.png")))
    }

    /// Path of the synthesized narration for slide `index`.
    pub fn narration_path(&self, index: usize, extension: &str) -> SlidecastResult<PathBuf> {
        self.track(self.root.join(format!("narration_{index:04}.{extension}")))
    }

    /// Path of the timeline-wide narration bed (raw `f32le`).
    pub fn audio_bed_path(&self) -> SlidecastResult<PathBuf> {
        self.track(self.root.join("narration_bed.f32le"))
    }

    /// Paths handed out so far.
    pub fn tracked(&self) -> Vec<PathBuf> {
        self.lock_tracked().iter().cloned().collect()
    }

    /// Remove every intermediate and the directory, reporting the first failure.
    pub fn close(mut self) -> SlidecastResult<()> {
        let removed = self.remove_tracked();
        let dir = self.dir.take();
        let closed = match dir {
            Some(dir) => dir
                .close()
                .with_context(|| format!("failed to remove work area '{}'", self.root.display())),
            None => Ok(()),
        };
        removed?;
        closed?;
        Ok(())
    }

    fn remove_tracked(&self) -> anyhow::Result<()> {
        let paths = std::mem::take(&mut *self.lock_tracked());
        let mut first_err = None;
        for p in paths {
            match std::fs::remove_file(&p) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to remove intermediate");
                    first_err.get_or_insert_with(|| {
                        anyhow::anyhow!("failed to remove '{}': {e}", p.display())
                    });
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn lock_tracked(&self) -> std::sync::MutexGuard<'_, BTreeSet<PathBuf>> {
        // A poisoned set is still a valid set of paths.
        self.tracked
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Drop for WorkArea {
    fn drop(&mut self) {
        if self.dir.is_none() {
            return;
        }
        let _ = self.remove_tracked();
        if let Some(dir) = self.dir.take()
            && let Err(e) = dir.close()
        {
            tracing::warn!(root = %self.root.display(), error = %e, "failed to remove work area");
        }
        tracing::debug!(root = %self.root.display(), "work area removed");
    }
}

#[cfg(test)]
#[path = "../tests/unit/workarea/workarea.rs"]
mod tests;
