//! Blob staging through temporary directories.
//!
//! Blobs move between memory and a node through a real file in a fresh
//! [`tempfile::TempDir`], which is removed when the guard drops on every
//! return path.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use crate::error::FrameError;
use crate::store::{BlobStore, Node};

/// Reduces a requested blob name to its final path component.
pub fn blob_name(requested: &str) -> Result<String, FrameError> {
    Path::new(requested)
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            FrameError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("`{requested}` does not name a file"),
            ))
        })
}

/// Writes `bytes` to a staged file and streams it into the blob `name`.
pub fn stage_out(node: &mut Node, name: &str, bytes: &[u8]) -> Result<(), FrameError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    fs::write(&path, bytes)?;

    let mut file = File::open(&path)?;
    node.put_blob(&mut file, name)?;
    log::debug!("staged {} bytes into blob `{name}` of node {}", bytes.len(), node.uuid());
    Ok(())
}

/// Copies the blob `name` into a staged file and reads it back.
pub fn stage_in(node: &Node, name: &str) -> Result<Vec<u8>, FrameError> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join(name);
    {
        let mut source = node.open_blob(name)?;
        let mut file = File::create(&path)?;
        io::copy(&mut source, &mut file)?;
    }
    Ok(fs::read(&path)?)
}
