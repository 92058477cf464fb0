//! Domain types shared by the corpus parser and the text engine.

use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 100;

/// Kind of work a segment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkType {
    Drama,
    VerseCollection,
    Unknown,
}

impl WorkType {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkType::Drama => "drama",
            WorkType::VerseCollection => "verse_collection",
            WorkType::Unknown => "unknown",
        }
    }
}

/// Structural position of a line inside a dramatic work.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DramaFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub act: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scene: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
}

/// Structural position of a line inside a verse collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerseFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sonnet_number: Option<u32>,
}

/// Per-work-type metadata. Serialized flat next to the segment fields with
/// `work_type` as the tag, so only the active group's fields ever appear.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "work_type")]
pub enum Structure {
    #[serde(rename = "drama")]
    Drama(DramaFields),
    #[serde(rename = "verse_collection")]
    Verse(VerseFields),
    #[serde(rename = "unknown")]
    Unknown,
}

impl Structure {
    pub fn work_type(&self) -> WorkType {
        match self {
            Structure::Drama(_) => WorkType::Drama,
            Structure::Verse(_) => WorkType::VerseCollection,
            Structure::Unknown => WorkType::Unknown,
        }
    }
}

/// The atomic indexed unit: one content line of a work plus its context.
///
/// - `line_number`: 1-based global source position, unique across the corpus
/// - `preceding_lines`/`following_lines`: context that never crosses into
///   another work
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    pub work_title: String,
    #[serde(flatten)]
    pub structure: Structure,
    pub text: String,
    pub line_number: u64,
    #[serde(default)]
    pub preceding_lines: Vec<String>,
    #[serde(default)]
    pub following_lines: Vec<String>,
}

impl Segment {
    pub fn work_type(&self) -> WorkType {
        self.structure.work_type()
    }

    pub fn drama(&self) -> Option<&DramaFields> {
        match &self.structure {
            Structure::Drama(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn verse(&self) -> Option<&VerseFields> {
        match &self.structure {
            Structure::Verse(fields) => Some(fields),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Any,
    Phrase,
    Regex,
}

/// A query as submitted by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query_text: String,
    #[serde(default)]
    pub work_filter: Option<String>,
    #[serde(default)]
    pub mode: SearchMode,
    #[serde(default)]
    pub case_sensitive: bool,
    #[serde(default)]
    pub fuzzy: bool,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl SearchRequest {
    pub fn new(query_text: impl Into<String>) -> Self {
        Self {
            query_text: query_text.into(),
            work_filter: None,
            mode: SearchMode::Any,
            case_sensitive: false,
            fuzzy: false,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }

    pub fn with_mode(mut self, mode: SearchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_work_filter(mut self, work: impl Into<String>) -> Self {
        self.work_filter = Some(work.into());
        self
    }

    pub fn with_case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    pub fn with_fuzzy(mut self, fuzzy: bool) -> Self {
        self.fuzzy = fuzzy;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Half-open range of Unicode scalar offsets into `Segment::text`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchSpan {
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub segment: Segment,
    pub match_spans: Vec<MatchSpan>,
    pub score: f32,
}

/// Why a query produced no (or partial) results without being an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QueryNotice {
    InvalidPattern { pattern: String, reason: String },
    UnknownWork { title: String },
    ScanTruncated { budget: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub hits: Vec<SearchHit>,
    pub total_hits: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notice: Option<QueryNotice>,
}

impl SearchResponse {
    pub fn empty_with(notice: QueryNotice) -> Self {
        Self { hits: Vec::new(), total_hits: 0, notice: Some(notice) }
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub document_count: u64,
    pub work_count: usize,
    pub index_size_bytes: u64,
}

/// Outcome of a bulk index build. `skipped` lists the line numbers of
/// segments that were rejected and logged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildReport {
    pub indexed: usize,
    pub skipped: Vec<u64>,
}
