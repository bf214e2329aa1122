//! Persistence of uploaded and generated images
//!
//! Every file gets a fresh UUIDv4 name, so concurrent requests never write
//! the same path and no locking is needed.

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use crate::error::GlassifyError;

/// Which directory a persisted image belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageRole {
    /// Uploaded face photos
    Face,
    /// Uploaded glasses photos
    Glasses,
    /// Generated composites
    Result,
}

/// Maps uploaded streams to unique paths inside role-specific directories.
#[derive(Clone, Debug)]
pub struct ImageStore {
    faces_dir: PathBuf,
    glasses_dir: PathBuf,
    results_dir: PathBuf,
}

impl ImageStore {
    /// Builds a store rooted at `data_dir`. Nothing is created on disk until
    /// [`ImageStore::ensure_dirs`] runs.
    pub fn new(data_dir: &Path) -> Self {
        let uploads = data_dir.join("uploads");
        Self {
            faces_dir: uploads.join("faces"),
            glasses_dir: uploads.join("glasses"),
            results_dir: data_dir.join("images"),
        }
    }

    /// Creates the three directories if absent. Idempotent; called once
    /// before the server starts accepting requests.
    pub async fn ensure_dirs(&self) -> Result<(), GlassifyError> {
        for dir in [&self.faces_dir, &self.glasses_dir, &self.results_dir] {
            tokio::fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    /// Returns the directory files of the given role are stored in.
    pub fn dir_for(&self, role: ImageRole) -> &Path {
        match role {
            ImageRole::Face => &self.faces_dir,
            ImageRole::Glasses => &self.glasses_dir,
            ImageRole::Result => &self.results_dir,
        }
    }

    /// Generates a fresh unique filename with the given extension.
    fn fresh_filename(extension: &str) -> String {
        format!("{}.{}", Uuid::new_v4(), extension)
    }

    /// Persists `bytes` under a fresh unique name in the role's directory.
    /// Returns the full path and the bare filename.
    pub async fn save(
        &self,
        role: ImageRole,
        extension: &str,
        bytes: &[u8],
    ) -> Result<(PathBuf, String), GlassifyError> {
        let filename = Self::fresh_filename(extension);
        let path = self.dir_for(role).join(&filename);
        tokio::fs::write(&path, bytes).await?;
        debug!("Saved {:?} image to {}", role, path.display());
        Ok((path, filename))
    }

    /// Reserves a fresh result path without writing anything. Used by the
    /// compositor and the copy fallback, which produce the bytes themselves.
    pub fn fresh_result_path(&self, extension: &str) -> (PathBuf, String) {
        let filename = Self::fresh_filename(extension);
        let path = self.results_dir.join(&filename);
        (path, filename)
    }

    /// Deletes a persisted file, ignoring it if already gone.
    pub async fn remove_if_exists(path: &Path) -> Result<(), GlassifyError> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_dirs_is_idempotent() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(tmp.path());
        store.ensure_dirs().await.expect("first create");
        store.ensure_dirs().await.expect("second create");
        assert!(store.dir_for(ImageRole::Face).is_dir());
        assert!(store.dir_for(ImageRole::Glasses).is_dir());
        assert!(store.dir_for(ImageRole::Result).is_dir());
    }

    #[tokio::test]
    async fn saves_get_unique_names() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let store = ImageStore::new(tmp.path());
        store.ensure_dirs().await.expect("create dirs");

        let (path_a, name_a) = store
            .save(ImageRole::Face, "jpg", b"same bytes")
            .await
            .expect("first save");
        let (path_b, name_b) = store
            .save(ImageRole::Face, "jpg", b"same bytes")
            .await
            .expect("second save");

        assert_ne!(name_a, name_b);
        assert!(path_a.is_file());
        assert!(path_b.is_file());
        assert!(name_a.ends_with(".jpg"));
    }

    #[tokio::test]
    async fn remove_if_exists_tolerates_missing_files() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let missing = tmp.path().join("nope.jpg");
        ImageStore::remove_if_exists(&missing)
            .await
            .expect("missing file is not an error");

        let store = ImageStore::new(tmp.path());
        store.ensure_dirs().await.expect("create dirs");
        let (path, _) = store
            .save(ImageRole::Glasses, "png", b"bytes")
            .await
            .expect("save");
        ImageStore::remove_if_exists(&path).await.expect("remove");
        assert!(!path.exists());
    }
}
