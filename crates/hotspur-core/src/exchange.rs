//! Corpus input and the JSON segment exchange format.

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::error::Result;
use crate::types::Segment;

/// Read a corpus file. Invalid UTF-8 sequences are replaced rather than
/// rejected.
pub fn read_corpus(path: &Path) -> Result<String> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
            warn!("{} is not valid UTF-8; decoding lossily", path.display());
            Ok(String::from_utf8_lossy(&fs::read(path)?).into_owned())
        }
        Err(e) => Err(e.into()),
    }
}

/// Split corpus text into lines without their terminators (`\n` or `\r\n`).
pub fn corpus_lines(content: &str) -> Vec<&str> {
    content.lines().collect()
}

/// Write segments as a JSON array of flat objects.
pub fn write_segments(path: &Path, segments: &[Segment]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut writer, segments)?;
    writer.flush()?;
    debug!("wrote {} segments to {}", segments.len(), path.display());
    Ok(())
}

pub fn read_segments(path: &Path) -> Result<Vec<Segment>> {
    let reader = BufReader::new(fs::File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

/// Collapse internal whitespace runs to single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
