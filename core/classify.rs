use crate::config::ProcessingOptions;
use log;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// How many leading bytes the binary heuristic looks at.
pub const PROBE_SAMPLE_BYTES: usize = 8000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    Text,
    Binary,
    /// The sample could not be read. Never treated as binary.
    Unreadable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    IncludeFull,
    IncludeTruncated,
    SkipLarge,
    SkipBinary,
    SkipUnreadable,
}

impl Classification {
    pub fn is_included(self) -> bool {
        matches!(
            self,
            Classification::IncludeFull | Classification::IncludeTruncated
        )
    }
}

/// NUL bytes or invalid UTF-8 mark a sample as binary. A multi-byte sequence
/// cut off by the end of the sample is tolerated.
pub fn probe_bytes(sample: &[u8]) -> Probe {
    if sample.contains(&0) {
        return Probe::Binary;
    }
    match std::str::from_utf8(sample) {
        Ok(_) => Probe::Text,
        Err(e) if e.error_len().is_none() => Probe::Text,
        Err(_) => Probe::Binary,
    }
}

pub fn probe_file(path: &Path) -> Probe {
    let mut sample = Vec::with_capacity(PROBE_SAMPLE_BYTES);
    let read = File::open(path)
        .and_then(|file| file.take(PROBE_SAMPLE_BYTES as u64).read_to_end(&mut sample));
    match read {
        Ok(_) => probe_bytes(&sample),
        Err(e) => {
            log::debug!("Probe failed for {}: {}", path.display(), e);
            Probe::Unreadable
        }
    }
}

/// Applies the inclusion policy.
///
/// `include_all` wins over both the binary and the size check. Otherwise the
/// binary check runs first, then the size check, where `truncate_oversized`
/// turns a skip into a truncated include.
pub fn classify(size_bytes: u64, probe: Probe, options: &ProcessingOptions) -> Classification {
    if probe == Probe::Unreadable {
        return Classification::SkipUnreadable;
    }
    if options.include_all {
        return Classification::IncludeFull;
    }
    if probe == Probe::Binary {
        return Classification::SkipBinary;
    }
    if size_bytes > options.size_threshold_bytes {
        return if options.truncate_oversized {
            Classification::IncludeTruncated
        } else {
            Classification::SkipLarge
        };
    }
    Classification::IncludeFull
}

/// Turns raw bytes into emitted text.
///
/// Returns `None` on a decode failure. `lossy` (used with `include_all`)
/// never fails. For truncated content an incomplete trailing character is
/// dropped instead of failing.
pub fn decode_content(bytes: Vec<u8>, lossy: bool, truncated: bool) -> Option<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Some(text),
        Err(e) if lossy => Some(String::from_utf8_lossy(e.as_bytes()).into_owned()),
        Err(e) if truncated && e.utf8_error().error_len().is_none() => {
            let valid_up_to = e.utf8_error().valid_up_to();
            let mut bytes = e.into_bytes();
            bytes.truncate(valid_up_to);
            String::from_utf8(bytes).ok()
        }
        Err(_) => None,
    }
}

pub fn read_limited(path: &Path, limit: Option<u64>) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    match limit {
        Some(limit) => file.take(limit).read_to_end(&mut buffer)?,
        None => file.read_to_end(&mut buffer)?,
    };
    Ok(buffer)
}
