//! Front-matter skipping and work-boundary detection.

use std::collections::HashSet;

use super::markers::Markers;
use super::{StructuralWarning, WarningKind};
use crate::config::ParserConfig;
use crate::exchange::normalize_whitespace;

/// Where the body begins and what the table of contents listed.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct FrontMatter {
    pub body_start: usize,
    pub toc_entries: Vec<String>,
}

/// A detected work: its title line and the half-open range of its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct WorkSpan {
    pub title: String,
    pub title_line: Option<usize>,
    pub start: usize,
    pub end: usize,
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

/// Locate a `Contents` heading near the top of the file and read the block of
/// entries that follows it. Without one the body starts at line zero.
pub(crate) fn scan_front_matter(lines: &[&str], scan_limit: usize) -> FrontMatter {
    let heading = lines.iter().take(scan_limit).position(|l| {
        let lower = l.trim().to_lowercase();
        lower == "contents" || lower == "table of contents"
    });
    let Some(heading) = heading else {
        return FrontMatter::default();
    };

    let mut i = heading + 1;
    while i < lines.len() && is_blank(lines[i]) {
        i += 1;
    }
    let mut toc_entries = Vec::new();
    while i < lines.len() && !is_blank(lines[i]) {
        toc_entries.push(normalize_whitespace(lines[i]));
        i += 1;
    }
    FrontMatter { body_start: i, toc_entries }
}

fn blank_run_before(lines: &[&str], i: usize, floor: usize) -> (usize, bool) {
    let mut count = 0;
    let mut j = i;
    while j > floor {
        if !is_blank(lines[j - 1]) {
            return (count, false);
        }
        count += 1;
        j -= 1;
    }
    (count, true)
}

/// All-caps heading with nothing structural about it, set apart by blank lines.
fn looks_like_title(lines: &[&str], i: usize, body_start: usize, markers: &Markers, config: &ParserConfig) -> bool {
    let line = lines[i].trim();
    let alpha = line.chars().filter(|c| c.is_alphabetic()).count();
    if alpha < 3 || line.chars().any(char::is_lowercase) || line.ends_with('.') {
        return false;
    }
    if markers.is_structural(line) {
        return false;
    }
    let (blanks, reached_floor) = blank_run_before(lines, i, body_start);
    if blanks < config.min_blank_lines_before_title && !reached_floor {
        return false;
    }
    lines.get(i + 1).map_or(true, |next| is_blank(next))
}

/// Split the body into works. Warnings for duplicate and missing catalog
/// titles, or for a body with no recognizable works, go to `warnings`.
pub(crate) fn detect_works(
    lines: &[&str],
    front: &FrontMatter,
    markers: &Markers,
    config: &ParserConfig,
    warnings: &mut Vec<StructuralWarning>,
) -> Vec<WorkSpan> {
    let catalog: Vec<String> = if config.known_titles.is_empty() {
        front.toc_entries.clone()
    } else {
        config.known_titles.iter().map(|t| normalize_whitespace(t)).collect()
    };
    let catalog_set: HashSet<&str> = catalog.iter().map(String::as_str).collect();

    let mut seen: HashSet<String> = HashSet::new();
    let mut starts: Vec<(usize, String)> = Vec::new();
    for i in front.body_start..lines.len() {
        if is_blank(lines[i]) {
            continue;
        }
        let preceded_by_blank = i == front.body_start || is_blank(lines[i - 1]);
        if !preceded_by_blank {
            continue;
        }
        let candidate = normalize_whitespace(lines[i]);
        let is_title = if catalog_set.is_empty() {
            looks_like_title(lines, i, front.body_start, markers, config)
        } else {
            catalog_set.contains(candidate.as_str())
        };
        if !is_title {
            continue;
        }
        if seen.contains(&candidate) {
            warnings.push(StructuralWarning::at(i, WarningKind::DuplicateTitle { title: candidate }));
            continue;
        }
        seen.insert(candidate.clone());
        starts.push((i, candidate));
    }

    for title in &catalog {
        if !seen.contains(title) {
            warnings.push(StructuralWarning { line_number: None, kind: WarningKind::MissingWork { title: title.clone() } });
        }
    }

    if starts.is_empty() {
        warnings.push(StructuralWarning { line_number: None, kind: WarningKind::NoWorksDetected });
        return vec![WorkSpan {
            title: config.untitled_work_label.clone(),
            title_line: None,
            start: front.body_start,
            end: lines.len(),
        }];
    }

    let mut spans = Vec::with_capacity(starts.len());
    for (k, (line, title)) in starts.iter().enumerate() {
        let end = starts.get(k + 1).map_or(lines.len(), |(next, _)| *next);
        spans.push(WorkSpan { title: title.clone(), title_line: Some(*line), start: line + 1, end });
    }
    spans
}
