//! Recorded feed: one series response per line, replayed in order.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::client::{parse_series, SeriesBatch};

#[derive(Debug, Clone, Default)]
pub struct Recording {
    pub batches: Vec<SeriesBatch>,
    pub bad_lines: usize,
}

impl Recording {
    pub fn point_count(&self) -> usize {
        self.batches.iter().map(|b| b.points.len()).sum()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordingManifest {
    pub path: String,
    pub sha256: String,
    pub batches: usize,
    pub points: usize,
    pub bad_lines: usize,
}

pub fn load_batches(path: &Path) -> Result<Recording> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut recording = Recording::default();

    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let parsed = serde_json::from_str::<serde_json::Value>(trimmed)
            .map_err(anyhow::Error::from)
            .and_then(|v| parse_series(&v));
        match parsed {
            Ok(batch) => recording.batches.push(batch),
            Err(_) => recording.bad_lines += 1,
        }
    }
    Ok(recording)
}

pub fn manifest(path: &Path, recording: &Recording) -> Result<RecordingManifest> {
    Ok(RecordingManifest {
        path: path.display().to_string(),
        sha256: file_sha256(path)?,
        batches: recording.batches.len(),
        points: recording.point_count(),
        bad_lines: recording.bad_lines,
    })
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
