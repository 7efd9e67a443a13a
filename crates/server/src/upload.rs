//! Image uploads stored on local disk under a configured root.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// Extensions accepted for images, compared case-insensitively.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "gif"];

/// Files with this name are shared defaults and never deleted.
const PLACEHOLDER: &str = "placeholder.jpg";

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Unsupported file type. Use JPG, PNG or GIF.")]
    UnsupportedType,
    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
    #[error("Invalid file path")]
    InvalidPath,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A file received in a multipart form.
#[derive(Debug)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug)]
pub struct UploadSink {
    root: PathBuf,
    max_bytes: usize,
}

impl UploadSink {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    /// Validates type and size without writing anything. Returns the
    /// normalized extension.
    pub fn check(&self, file: &UploadedFile) -> Result<String, UploadError> {
        let extension = allowed_extension(&file.file_name)?;
        if file.bytes.len() > self.max_bytes {
            return Err(UploadError::TooLarge {
                size: file.bytes.len(),
                max: self.max_bytes,
            });
        }
        Ok(extension)
    }

    /// Writes `file` as `<subdir>/<entity_id>_<unix_ts>.<ext>` and returns
    /// that relative path.
    pub async fn store(
        &self,
        subdir: &str,
        entity_id: i32,
        file: &UploadedFile,
    ) -> Result<String, UploadError> {
        let extension = self.check(file)?;
        let relative = format!(
            "{subdir}/{entity_id}_{}.{extension}",
            chrono::Utc::now().timestamp()
        );
        let target = self.resolve(&relative)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, &file.bytes).await?;
        tracing::debug!(path = %target.display(), size = file.bytes.len(), "upload stored");
        Ok(relative)
    }

    /// Deletes a file previously returned by [`UploadSink::store`].
    /// Placeholders and missing files are left alone.
    pub async fn remove(&self, relative: &str) {
        if relative.is_empty() || relative.ends_with(PLACEHOLDER) {
            return;
        }
        let Ok(path) = self.resolve(relative) else {
            tracing::warn!("refusing to delete {relative}");
            return;
        };
        match tokio::fs::remove_file(&path).await {
            Ok(()) => tracing::debug!(path = %path.display(), "upload removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(path = %path.display(), "failed to remove upload: {err}"),
        }
    }

    /// Joins `relative` onto the root, refusing anything that could escape it.
    fn resolve(&self, relative: &str) -> Result<PathBuf, UploadError> {
        let path = Path::new(relative);
        if !path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
        {
            return Err(UploadError::InvalidPath);
        }
        Ok(self.root.join(path))
    }
}

fn allowed_extension(file_name: &str) -> Result<String, UploadError> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .ok_or(UploadError::UnsupportedType)?;
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(UploadError::UnsupportedType)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink() -> UploadSink {
        let root = std::env::temp_dir().join(format!(
            "autohub_upload_{}_{}",
            std::process::id(),
            chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        UploadSink::new(root, 16)
    }

    fn file(name: &str, size: usize) -> UploadedFile {
        UploadedFile {
            file_name: name.to_string(),
            bytes: vec![0u8; size],
        }
    }

    #[test]
    fn extension_is_checked_case_insensitively() {
        assert_eq!(allowed_extension("photo.JPG").unwrap(), "jpg");
        assert_eq!(allowed_extension("a.b.png").unwrap(), "png");
        assert!(allowed_extension("script.php").is_err());
        assert!(allowed_extension("noext").is_err());
    }

    #[tokio::test]
    async fn store_then_remove() {
        let sink = sink();
        let path = sink.store("part_images", 7, &file("p.gif", 4)).await.unwrap();
        assert!(path.starts_with("part_images/7_"));
        assert!(path.ends_with(".gif"));
        assert!(sink.root.join(&path).exists());

        sink.remove(&path).await;
        assert!(!sink.root.join(&path).exists());
    }

    #[tokio::test]
    async fn oversized_and_escaping_paths_are_refused() {
        let sink = sink();
        let err = sink.store("part_images", 1, &file("p.png", 17)).await;
        assert!(matches!(err, Err(UploadError::TooLarge { size: 17, max: 16 })));
        assert!(matches!(
            sink.store("../outside", 1, &file("p.png", 1)).await,
            Err(UploadError::InvalidPath)
        ));
    }
}
