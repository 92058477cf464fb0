//! Corpus parser: turns the flat text of the collected works into typed
//! segments with structural metadata and context windows.
//!
//! The pass runs in three steps:
//! 1. skip front matter and read the table of contents, if any
//! 2. split the body into works using the title catalog
//! 3. infer each work's type and walk its lines emitting segments
//!
//! Nothing in the input aborts a parse; oddities become [`StructuralWarning`]s.

mod markers;
mod works;

pub use markers::parse_numeral;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ParserConfig;
use crate::error::Result;
use crate::exchange::corpus_lines;
use crate::types::{DramaFields, Segment, Structure, VerseFields, WorkType};
use markers::{is_apparatus, Markers};
use works::{detect_works, scan_front_matter, WorkSpan};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    /// A catalog title occurred again after its work had already started.
    DuplicateTitle { title: String },
    /// A catalog title never occurred in the body.
    MissingWork { title: String },
    NoWorksDetected,
    UnclassifiedWork { title: String },
    /// A title whose body held no indexable line; it is left out of `works`.
    EmptyWork { title: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuralWarning {
    /// 1-based source line, when the warning concerns one.
    pub line_number: Option<u64>,
    pub kind: WarningKind,
}

impl StructuralWarning {
    fn at(index: usize, kind: WarningKind) -> Self {
        Self { line_number: Some(index as u64 + 1), kind }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseOutput {
    pub segments: Vec<Segment>,
    /// Work titles in source order.
    pub works: Vec<String>,
    pub warnings: Vec<StructuralWarning>,
}

pub struct CorpusParser {
    config: ParserConfig,
    markers: Markers,
}

impl CorpusParser {
    pub fn new(config: ParserConfig) -> Result<Self> {
        Ok(Self { config, markers: Markers::new()? })
    }

    pub fn parse_text(&self, content: &str) -> ParseOutput {
        self.parse(&corpus_lines(content))
    }

    pub fn parse(&self, lines: &[&str]) -> ParseOutput {
        let mut warnings = Vec::new();
        let front = scan_front_matter(lines, self.config.front_matter_scan_limit);
        debug!("body starts at line {} ({} contents entries)", front.body_start + 1, front.toc_entries.len());

        let spans = detect_works(lines, &front, &self.markers, &self.config, &mut warnings);
        let mut segments = Vec::new();
        let mut works = Vec::with_capacity(spans.len());
        for span in &spans {
            let emitted = segments.len();
            let work_type = self.infer_work_type(lines, span);
            match work_type {
                WorkType::Drama => self.walk_drama(lines, span, &mut segments),
                WorkType::VerseCollection => self.walk_verse(lines, span, &mut segments),
                WorkType::Unknown => {
                    if span.title_line.is_some() {
                        warnings.push(StructuralWarning::at(
                            span.start - 1,
                            WarningKind::UnclassifiedWork { title: span.title.clone() },
                        ));
                    }
                    self.walk_unknown(lines, span, &mut segments);
                }
            }
            debug!("work '{}' classified as {}", span.title, work_type.as_str());
            if segments.len() == emitted {
                warnings.push(StructuralWarning {
                    line_number: span.title_line.map(|i| i as u64 + 1),
                    kind: WarningKind::EmptyWork { title: span.title.clone() },
                });
                continue;
            }
            works.push(span.title.clone());
        }

        for w in &warnings {
            warn!("structural warning at line {:?}: {:?}", w.line_number, w.kind);
        }
        info!("parsed {} segments from {} works ({} warnings)", segments.len(), works.len(), warnings.len());
        ParseOutput { segments, works, warnings }
    }

    fn infer_work_type(&self, lines: &[&str], span: &WorkSpan) -> WorkType {
        let mut speaker_cues = 0;
        let mut numbered = false;
        for line in &lines[span.start..span.end] {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if self.markers.act(line).is_some() || self.markers.scene(line).is_some() {
                return WorkType::Drama;
            }
            if self.markers.speaker(line).is_some() {
                speaker_cues += 1;
            } else if self.markers.numbered(line).is_some() {
                numbered = true;
            }
        }
        if speaker_cues >= self.config.min_speaker_cues {
            return WorkType::Drama;
        }
        let upper_title = span.title.to_uppercase();
        if numbered || self.config.verse_title_hints.iter().any(|h| upper_title.contains(&h.to_uppercase())) {
            return WorkType::VerseCollection;
        }
        WorkType::Unknown
    }

    fn walk_drama(&self, lines: &[&str], span: &WorkSpan, out: &mut Vec<Segment>) {
        let mut state = DramaFields::default();
        for i in span.start..span.end {
            let line = lines[i].trim();
            if line.is_empty() {
                continue;
            }
            if is_apparatus(line) {
                state = DramaFields::default();
                continue;
            }
            if let Some((act, scene)) = self.markers.act(line) {
                state = DramaFields { act: Some(act), scene, speaker: None };
                continue;
            }
            if let Some(scene) = self.markers.scene(line) {
                state.scene = Some(scene);
                state.speaker = None;
                continue;
            }
            if self.markers.is_stage_direction(line) {
                continue;
            }
            let text = match self.markers.speaker(line) {
                Some(cue) => {
                    state.speaker = Some(cue.name.to_string());
                    match cue.remainder {
                        Some(rest) => rest,
                        None => continue,
                    }
                }
                None => line,
            };
            out.push(self.segment(lines, span, i, text, Structure::Drama(state.clone())));
        }
    }

    fn walk_verse(&self, lines: &[&str], span: &WorkSpan, out: &mut Vec<Segment>) {
        let mut state = VerseFields::default();
        for i in span.start..span.end {
            let line = lines[i].trim();
            if line.is_empty() {
                continue;
            }
            if let Some(n) = self.markers.numbered(line) {
                state.sonnet_number = Some(n);
                continue;
            }
            out.push(self.segment(lines, span, i, line, Structure::Verse(state.clone())));
        }
    }

    fn walk_unknown(&self, lines: &[&str], span: &WorkSpan, out: &mut Vec<Segment>) {
        for i in span.start..span.end {
            let line = lines[i].trim();
            if !line.is_empty() {
                out.push(self.segment(lines, span, i, line, Structure::Unknown));
            }
        }
    }

    fn segment(&self, lines: &[&str], span: &WorkSpan, i: usize, text: &str, structure: Structure) -> Segment {
        let n = self.config.context_lines;
        Segment {
            work_title: span.title.clone(),
            structure,
            text: text.to_string(),
            line_number: i as u64 + 1,
            preceding_lines: context(&lines[span.start.max(i.saturating_sub(n))..i]),
            following_lines: context(&lines[i + 1..span.end.min(i + n + 1)]),
        }
    }
}

fn context(window: &[&str]) -> Vec<String> {
    window.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).map(str::to_string).collect()
}

/// Parse corpus text with the given configuration.
pub fn parse_corpus(content: &str, config: &ParserConfig) -> Result<ParseOutput> {
    Ok(CorpusParser::new(config.clone())?.parse_text(content))
}
