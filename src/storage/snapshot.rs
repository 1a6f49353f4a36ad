//! Flat JSON persistence of the chain
//!
//! The file is a JSON array of blocks. Writes go to a sibling temp file that is then
//! renamed over the target, so a crash never leaves a half-written snapshot behind.

use crate::core::Block;
use crate::error::{BlockchainError, Result};
use log::info;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

pub struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(path: impl Into<PathBuf>) -> Snapshot {
        Snapshot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when no snapshot exists yet; unparsable content is corrupted state
    pub fn load(&self) -> Result<Option<Vec<Block>>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let blocks: Vec<Block> = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            BlockchainError::CorruptedState(format!("Unreadable snapshot {:?}: {e}", self.path))
        })?;
        info!("Loaded {} blocks from {:?}", blocks.len(), self.path);
        Ok(Some(blocks))
    }

    pub fn save(&self, blocks: &[Block]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        let mut writer = BufWriter::new(File::create(&staging)?);
        serde_json::to_writer_pretty(&mut writer, blocks)?;
        writer.flush()?;
        drop(writer);
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}
