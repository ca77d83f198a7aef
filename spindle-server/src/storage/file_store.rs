// Copyright 2025 OPPO.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Byte-level file operations under a storage server's root directory.
//! DFS paths are canonicalized before they touch the host filesystem, so
//! nothing can name an entry outside the root. File bytes travel base64
//! encoded in both directions.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use log::warn;
use spindle_common::fs::dfs_path;
use spindle_common::{DfsError, DfsResult};
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read `length` bytes at `offset`, base64-encoded. `length == -1`
    /// reads to the end of the file.
    pub async fn read(&self, pth: &str, offset: i64, length: i64) -> DfsResult<String> {
        let full = self.resolve(pth)?;
        let meta = Self::file_metadata(&full, pth).await?;
        let size = meta.len() as i64;

        let length = if length == -1 { size - offset } else { length };
        if offset < 0 || length < 0 || offset.checked_add(length).map_or(true, |end| end > size) {
            return Err(DfsError::index_out_of_bounds(format!(
                "offset {} and length {} are out of range for the {} byte file {}",
                offset, length, size, pth
            )));
        }

        let mut file = fs::File::open(&full).await?;
        file.seek(SeekFrom::Start(offset as u64)).await?;
        let mut buf = vec![0u8; length as usize];
        file.read_exact(&mut buf).await?;
        Ok(BASE64.encode(&buf))
    }

    /// Write the base64-decoded payload at `offset`, growing the file if
    /// the write runs past its end. The file must already exist.
    pub async fn write(&self, pth: &str, offset: i64, data: &str) -> DfsResult<()> {
        let full = self.resolve(pth)?;
        Self::file_metadata(&full, pth).await?;
        if offset < 0 {
            return Err(DfsError::index_out_of_bounds(format!(
                "negative write offset {} for {}",
                offset, pth
            )));
        }

        let bytes = BASE64
            .decode(data)
            .map_err(|e| DfsError::io(format!("invalid base64 payload: {}", e)))?;
        let mut file = fs::OpenOptions::new().write(true).open(&full).await?;
        file.seek(SeekFrom::Start(offset as u64)).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    pub async fn size(&self, pth: &str) -> DfsResult<i64> {
        let full = self.resolve(pth)?;
        let meta = Self::file_metadata(&full, pth).await?;
        Ok(meta.len() as i64)
    }

    /// Create an empty file, making parent directories as needed. An
    /// existing regular file is truncated. Creating `/` is refused.
    pub async fn create(&self, pth: &str) -> DfsResult<bool> {
        let names = dfs_path::path_components(pth)?;
        if names.len() == 1 {
            return Ok(false);
        }
        let full = self.resolve(pth)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::File::create(&full).await?;
        Ok(true)
    }

    /// Remove a file or a whole directory tree, then drop any ancestor
    /// directories the removal left empty, stopping at the root. Deleting
    /// `/` is refused.
    pub async fn delete(&self, pth: &str) -> DfsResult<bool> {
        let names = dfs_path::path_components(pth)?;
        if names.len() == 1 {
            return Ok(false);
        }
        let full = self.resolve(pth)?;
        let meta = fs::metadata(&full)
            .await
            .map_err(|e| Self::not_found_or_io(e, pth))?;

        if meta.is_dir() {
            fs::remove_dir_all(&full).await?;
        } else {
            fs::remove_file(&full).await?;
        }
        if let Some(parent) = full.parent() {
            self.prune_upward(parent).await;
        }
        Ok(true)
    }

    /// Best-effort removal of a batch of paths, used when the naming
    /// server's registration response names duplicates to drop.
    pub async fn delete_files(&self, pths: &[String]) {
        for pth in pths {
            match self.delete(pth).await {
                Ok(_) => {}
                Err(e) => warn!("failed to delete {}: {}", pth, e),
            }
        }
    }

    /// Every regular file under the root as an absolute DFS path.
    /// Synchronous walk; only used at startup before serving begins.
    pub fn scan_files(&self) -> DfsResult<Vec<String>> {
        let mut files = Vec::new();
        Self::walk_files(&self.root, &self.root, &mut files)?;
        Ok(files)
    }

    /// Remove every empty directory under the root, deepest first.
    /// Synchronous; only used right after registration.
    pub fn prune_all(&self) -> DfsResult<()> {
        Self::prune_recursive(&self.root, &self.root)?;
        Ok(())
    }

    /// Map a DFS path onto the local filesystem. Canonicalization rejects
    /// `..`, so the result cannot escape the root.
    fn resolve(&self, pth: &str) -> DfsResult<PathBuf> {
        let names = dfs_path::path_components(pth)?;
        let mut full = self.root.clone();
        for name in &names[1..] {
            full.push(name);
        }
        Ok(full)
    }

    async fn file_metadata(full: &Path, pth: &str) -> DfsResult<std::fs::Metadata> {
        let meta = fs::metadata(full)
            .await
            .map_err(|e| Self::not_found_or_io(e, pth))?;
        if meta.is_dir() {
            return Err(DfsError::file_not_found(format!(
                "path {} is not a file",
                pth
            )));
        }
        Ok(meta)
    }

    fn not_found_or_io(err: std::io::Error, pth: &str) -> DfsError {
        if err.kind() == std::io::ErrorKind::NotFound {
            DfsError::file_not_found(format!("path {} not found", pth))
        } else {
            DfsError::io(format!("error accessing {}: {}", pth, err))
        }
    }

    async fn prune_upward(&self, from: &Path) {
        let mut curr = from.to_path_buf();
        while curr != self.root {
            let empty = match std::fs::read_dir(&curr) {
                Ok(mut entries) => entries.next().is_none(),
                Err(_) => break,
            };
            if !empty || fs::remove_dir(&curr).await.is_err() {
                break;
            }
            match curr.parent() {
                Some(parent) => curr = parent.to_path_buf(),
                None => break,
            }
        }
    }

    fn walk_files(dir: &Path, root: &Path, files: &mut Vec<String>) -> DfsResult<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let ty = entry.file_type()?;
            if ty.is_dir() {
                Self::walk_files(&entry.path(), root, files)?;
            } else if ty.is_file() {
                let rel = entry
                    .path()
                    .strip_prefix(root)
                    .map_err(|e| DfsError::io(e.to_string()))?
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                files.push(format!("/{}", rel));
            }
        }
        Ok(())
    }

    fn prune_recursive(dir: &Path, root: &Path) -> DfsResult<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                Self::prune_recursive(&entry.path(), root)?;
            }
        }
        if dir != root && std::fs::read_dir(dir)?.next().is_none() {
            std::fs::remove_dir(dir)?;
        }
        Ok(())
    }
}
