//! [`FsContentStore`]: document content kept as plain files in one
//! directory, named after their content id.

use std::{io::ErrorKind, path::PathBuf};

use cherry_core::store::ContentStore;
use tracing::debug;
use uuid::Uuid;

use crate::{Error, Result, encode::encode_uuid};

#[derive(Debug, Clone)]
pub struct FsContentStore {
  root: PathBuf,
}

impl FsContentStore {
  /// Use `root` as the content directory, creating it if needed.
  pub async fn open(root: impl Into<PathBuf>) -> Result<Self> {
    let root = root.into();
    tokio::fs::create_dir_all(&root).await?;
    Ok(Self { root })
  }

  fn path_for(&self, content_id: Uuid) -> PathBuf {
    self.root.join(encode_uuid(content_id))
  }
}

impl ContentStore for FsContentStore {
  type Error = Error;

  async fn put(&self, content_id: Uuid, data: Vec<u8>) -> Result<String> {
    let path = self.path_for(content_id);
    debug!(path = %path.display(), bytes = data.len(), "writing content");
    tokio::fs::write(&path, data).await?;
    Ok(path.to_string_lossy().into_owned())
  }

  async fn get(&self, content_id: Uuid) -> Result<Option<Vec<u8>>> {
    match tokio::fs::read(self.path_for(content_id)).await {
      Ok(bytes) => Ok(Some(bytes)),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
      Err(e) => Err(e.into()),
    }
  }

  async fn remove(&self, content_id: Uuid) -> Result<()> {
    match tokio::fs::remove_file(self.path_for(content_id)).await {
      Ok(()) => Ok(()),
      Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
      Err(e) => Err(e.into()),
    }
  }
}
