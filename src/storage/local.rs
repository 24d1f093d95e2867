//! Photo store backed by a local directory. The directory is served by the
//! HTTP layer, so "public" means reachable under `public_base_url`.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::types::{PhotoHandle, PhotoStore};
use super::StoreError;

pub struct LocalPhotoStore {
    root: PathBuf,
    public_base_url: String,
}

impl LocalPhotoStore {
    /// Create the upload directory if needed.
    pub fn new(root: &Path, public_base_url: &str) -> Result<Self, StoreError> {
        std::fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Only plain file names are accepted: no separators, no parent hops.
fn validate_file_name(file_name: &str) -> Result<(), StoreError> {
    let plain = !file_name.is_empty()
        && !file_name.contains(['/', '\\'])
        && file_name != "."
        && file_name != "..";
    if plain {
        Ok(())
    } else {
        Err(StoreError::Io(std::io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid photo file name: {file_name:?}"),
        )))
    }
}

/// `name.jpg`, then `name-1.jpg`, `name-2.jpg`, ...
fn candidate_name(file_name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return file_name.to_string();
    }
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => format!("{stem}-{attempt}.{ext}"),
        None => format!("{file_name}-{attempt}"),
    }
}

/// Remove a photo whose write failed part way, so the name is free again.
fn discard_on_error(path: &Path, written: std::io::Result<()>) -> std::io::Result<()> {
    if written.is_err() {
        if let Err(e) = std::fs::remove_file(path) {
            warn!(path = %path.display(), error = %e, "Could not remove partial photo");
        }
    }
    written
}

impl PhotoStore for LocalPhotoStore {
    fn upload(&self, bytes: &[u8], file_name: &str) -> Result<PhotoHandle, StoreError> {
        validate_file_name(file_name)?;

        // Two scans of the same class in the same second share a name;
        // never overwrite an earlier photo.
        for attempt in 0..1000 {
            let name = candidate_name(file_name, attempt);
            let path = self.root.join(&name);
            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    let written = file.write_all(bytes).and_then(|()| file.sync_all());
                    drop(file);
                    discard_on_error(&path, written)?;
                    debug!(path = %path.display(), bytes = bytes.len(), "Photo stored");
                    return Ok(PhotoHandle {
                        file_id: name.clone(),
                        name,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Err(StoreError::Io(std::io::Error::new(
            ErrorKind::AlreadyExists,
            format!("too many photos named {file_name}"),
        )))
    }

    fn make_public(&self, handle: &PhotoHandle) -> Result<String, StoreError> {
        if !self.root.join(&handle.file_id).is_file() {
            return Err(StoreError::NotFound(handle.file_id.clone()));
        }
        Ok(format!("{}/{}", self.public_base_url, handle.file_id))
    }
}
