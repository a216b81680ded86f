//! Filesystem utilities for atomic output files.
//!
//! Renders are written to a `.part` sibling of their final path and only
//! renamed into place once the encoder has finished, so a final path never
//! holds a partial file.

use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{MediaError, MediaResult};

/// Suffix appended to in-progress output files.
pub const PART_SUFFIX: &str = "part";

/// Temporary sibling path for `final_path` (`clip_1.mp4` -> `clip_1.part.mp4`).
///
/// The original extension is kept last so FFmpeg still picks the muxer from it.
pub fn part_path(final_path: &Path) -> PathBuf {
    let stem = final_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match final_path.extension() {
        Some(ext) => format!("{stem}.{PART_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}.{PART_SUFFIX}"),
    };
    final_path.with_file_name(name)
}

/// An output being written to a temporary path.
///
/// Dropping it without [`TempOutput::commit`] removes the temporary file,
/// which covers both encoder failures and cancelled tasks.
#[derive(Debug)]
pub struct TempOutput {
    part: PathBuf,
    target: PathBuf,
    committed: bool,
}

impl TempOutput {
    /// Reserve a temporary path for `target`, creating parent directories.
    pub async fn create(target: impl AsRef<Path>) -> MediaResult<Self> {
        let target = target.as_ref().to_path_buf();
        if let Some(parent) = target.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let part = part_path(&target);
        remove_if_exists(&part).await?;
        Ok(Self {
            part,
            target,
            committed: false,
        })
    }

    /// Path the encoder should write to.
    pub fn path(&self) -> &Path {
        &self.part
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Move the finished file into its final location.
    pub async fn commit(mut self) -> MediaResult<PathBuf> {
        if !self.part.exists() {
            return Err(MediaError::FileNotFound(self.part.clone()));
        }
        move_file(&self.part, &self.target).await?;
        self.committed = true;
        Ok(self.target.clone())
    }
}

impl Drop for TempOutput {
    fn drop(&mut self) {
        if !self.committed && self.part.exists() {
            if let Err(e) = std::fs::remove_file(&self.part) {
                tracing::warn!("Failed to remove temporary output {}: {}", self.part.display(), e);
            }
        }
    }
}

/// Remove a file, treating "not found" as success.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> MediaResult<()> {
    match fs::remove_file(path.as_ref()).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Move a file from `src` to `dst`, handling cross-device moves.
///
/// This function first attempts a fast rename. If that fails with EXDEV
/// (cross-device link error), it falls back to copy-and-delete.
pub async fn move_file(src: impl AsRef<Path>, dst: impl AsRef<Path>) -> MediaResult<()> {
    let src = src.as_ref();
    let dst = dst.as_ref();

    if let Some(parent) = dst.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).await?;
        }
    }

    match fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(e) if is_cross_device_error(&e) => {
            tracing::debug!(
                "Cross-device rename detected, falling back to copy+delete: {} -> {}",
                src.display(),
                dst.display()
            );
            copy_and_delete(src, dst).await
        }
        Err(e) => Err(MediaError::from(e)),
    }
}

/// Check if an IO error is EXDEV (cross-device link).
fn is_cross_device_error(e: &std::io::Error) -> bool {
    // EXDEV is error code 18 on Linux/macOS
    e.raw_os_error() == Some(18)
}

/// Copy file to destination (via temp file) then delete source.
async fn copy_and_delete(src: &Path, dst: &Path) -> MediaResult<()> {
    // Same directory as dst so the final rename stays on one filesystem
    let tmp_dst = part_path(dst);

    fs::copy(src, &tmp_dst).await.map_err(|e| {
        tracing::error!(
            "Failed to copy file during cross-device move: {} -> {}: {}",
            src.display(),
            tmp_dst.display(),
            e
        );
        MediaError::from(e)
    })?;

    if let Err(e) = fs::rename(&tmp_dst, dst).await {
        let _ = std::fs::remove_file(&tmp_dst);
        return Err(MediaError::from(e));
    }

    if let Err(e) = fs::remove_file(src).await {
        tracing::warn!(
            "Failed to remove source file after cross-device move: {}: {}",
            src.display(),
            e
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_part_path_keeps_extension() {
        assert_eq!(
            part_path(Path::new("/out/clip_1.mp4")),
            PathBuf::from("/out/clip_1.part.mp4")
        );
        assert_eq!(part_path(Path::new("/out/notes")), PathBuf::from("/out/notes.part"));
    }

    #[tokio::test]
    async fn test_move_file_overwrites_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("source.txt");
        let dst = dir.path().join("sub").join("dest.txt");

        fs::create_dir_all(dst.parent().unwrap()).await.unwrap();
        fs::write(&src, b"new content").await.unwrap();
        fs::write(&dst, b"old content").await.unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(fs::read_to_string(&dst).await.unwrap(), "new content");
    }

    #[tokio::test]
    async fn test_temp_output_commit_renames() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("clips").join("clip_1.mp4");

        let output = TempOutput::create(&target).await.unwrap();
        fs::write(output.path(), b"encoded").await.unwrap();
        let final_path = output.commit().await.unwrap();

        assert_eq!(final_path, target);
        assert!(target.exists());
        assert!(!part_path(&target).exists());
    }

    #[tokio::test]
    async fn test_temp_output_drop_removes_part() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("clip_2.mp4");

        {
            let output = TempOutput::create(&target).await.unwrap();
            fs::write(output.path(), b"half written").await.unwrap();
        }

        assert!(!part_path(&target).exists());
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_commit_without_file_fails() {
        let dir = TempDir::new().unwrap();
        let output = TempOutput::create(dir.path().join("clip_3.mp4")).await.unwrap();
        assert!(matches!(output.commit().await, Err(MediaError::FileNotFound(_))));
    }

    #[test]
    fn test_is_cross_device_error() {
        assert!(is_cross_device_error(&std::io::Error::from_raw_os_error(18)));
        assert!(!is_cross_device_error(&std::io::Error::from_raw_os_error(2)));
    }
}
