//! Fragment format of the aggregated text.
//!
//! Each processed file becomes:
//!
//! ```text
//! **** File: src/lib.rs | Size: 1.5 KiB (1536 bytes) | Content: 1536 bytes ****
//!
//! <exactly 1536 bytes of content>
//! ```
//!
//! followed by a newline. The header records the byte length of the content,
//! so [`parse_aggregate`] can split an aggregate back into records whatever
//! the content contains. Every other line the renderer emits starts with
//! `**** ` but never with `**** File: `.

use crate::error::{AppError, Result};
use byte_unit::{Byte, UnitType};
use serde::Serialize;

pub const MARKER_PREFIX: &str = "**** ";
const HEADER_PREFIX: &str = "**** File: ";
const TRUNCATED_PREFIX: &str = "**** Truncated: ";
const MARKER_SUFFIX: &str = " ****";
const FIELD_SEPARATOR: &str = " | ";
const TRUNCATED_FLAG: &str = " (truncated)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedFragment {
    pub path: String,
    pub size_bytes: u64,
    pub content: String,
    pub truncated: bool,
}

pub fn human_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let adjusted = Byte::from_u64(bytes).get_appropriate_unit(UnitType::Binary);
    format!("{:.1}", adjusted)
}

pub fn render_fragment(
    relative_path: &str,
    size_bytes: u64,
    content: &str,
    truncated: bool,
) -> String {
    let mut fragment = String::with_capacity(content.len() + relative_path.len() + 96);
    fragment.push_str(&format!(
        "{}{}{}Size: {} ({} bytes){}Content: {} bytes{}{}\n\n",
        HEADER_PREFIX,
        relative_path,
        FIELD_SEPARATOR,
        human_size(size_bytes),
        size_bytes,
        FIELD_SEPARATOR,
        content.len(),
        if truncated { TRUNCATED_FLAG } else { "" },
        MARKER_SUFFIX,
    ));
    fragment.push_str(content);
    fragment.push('\n');
    if truncated {
        fragment.push_str(&format!(
            "{}showing {} of {} bytes{}\n",
            TRUNCATED_PREFIX,
            content.len(),
            size_bytes,
            MARKER_SUFFIX
        ));
    }
    fragment
}

pub fn render_cutoff_marker(omitted_count: usize, max_files: usize) -> String {
    format!(
        "{}Omitted: {} more file(s) beyond the max-files limit of {}{}\n",
        MARKER_PREFIX, omitted_count, max_files, MARKER_SUFFIX
    )
}

pub fn render_summary_line(processed: usize, skipped: usize, omitted: usize) -> String {
    format!(
        "{}Summary: {} processed, {} skipped, {} omitted{}\n",
        MARKER_PREFIX, processed, skipped, omitted, MARKER_SUFFIX
    )
}

/// Splits an aggregate into its file records, in order. Marker lines are skipped.
pub fn parse_aggregate(text: &str) -> Result<Vec<ParsedFragment>> {
    let mut fragments = Vec::new();
    let mut pos = 0;

    while pos < text.len() {
        let (line, next) = next_line(text, pos)?;

        if let Some(header) = line.strip_prefix(HEADER_PREFIX) {
            let (path, size_bytes, content_len, truncated) = parse_header(header)?;
            pos = expect(text, next, "\n", &path)?;

            let content = pos
                .checked_add(content_len)
                .and_then(|end| text.get(pos..end))
                .ok_or_else(|| {
                    AppError::Parse(format!(
                        "Content of '{}' is shorter than the {} bytes its header declares",
                        path, content_len
                    ))
                })?
                .to_string();
            pos = expect(text, pos + content.len(), "\n", &path)?;

            if truncated {
                let (marker, after_marker) = next_line(text, pos)?;
                if !marker.starts_with(TRUNCATED_PREFIX) {
                    return Err(AppError::Parse(format!(
                        "Missing truncation marker after '{}'",
                        path
                    )));
                }
                pos = after_marker;
            }

            fragments.push(ParsedFragment {
                path,
                size_bytes,
                content,
                truncated,
            });
        } else if line.starts_with(MARKER_PREFIX) {
            pos = next;
        } else {
            return Err(AppError::Parse(format!(
                "Unexpected line at byte {}: '{}'",
                pos, line
            )));
        }
    }

    Ok(fragments)
}

fn next_line(text: &str, pos: usize) -> Result<(&str, usize)> {
    let rest = &text[pos..];
    let end = rest
        .find('\n')
        .ok_or_else(|| AppError::Parse(format!("Unterminated line at byte {}", pos)))?;
    Ok((&rest[..end], pos + end + 1))
}

fn expect(text: &str, pos: usize, token: &str, path: &str) -> Result<usize> {
    match text.get(pos..) {
        Some(rest) if rest.starts_with(token) => Ok(pos + token.len()),
        _ => Err(AppError::Parse(format!(
            "Malformed fragment for '{}' at byte {}",
            path, pos
        ))),
    }
}

fn parse_header(header: &str) -> Result<(String, u64, usize, bool)> {
    let malformed = || AppError::Parse(format!("Malformed file header: '{}'", header));

    let body = header.strip_suffix(MARKER_SUFFIX).ok_or_else(malformed)?;
    let mut fields = body.rsplitn(3, FIELD_SEPARATOR);
    let content_field = fields.next().ok_or_else(malformed)?;
    let size_field = fields.next().ok_or_else(malformed)?;
    let path = fields.next().ok_or_else(malformed)?;

    let content_field = content_field
        .strip_prefix("Content: ")
        .ok_or_else(malformed)?;
    let (content_field, truncated) = match content_field.strip_suffix(TRUNCATED_FLAG) {
        Some(rest) => (rest, true),
        None => (content_field, false),
    };
    let content_len = content_field
        .strip_suffix(" bytes")
        .and_then(|n| n.parse::<usize>().ok())
        .ok_or_else(malformed)?;

    let size_bytes = size_field
        .strip_prefix("Size: ")
        .and_then(|s| s.rsplit_once(" ("))
        .and_then(|(_, exact)| exact.strip_suffix(" bytes)"))
        .and_then(|n| n.parse::<u64>().ok())
        .ok_or_else(malformed)?;

    Ok((path.to_string(), size_bytes, content_len, truncated))
}
