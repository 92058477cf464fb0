//! Core of the hotspur workspace: segment types, configuration, errors, the
//! corpus parser, the segment exchange format and the engine traits.

pub mod config;
pub mod error;
pub mod exchange;
pub mod parser;
pub mod telemetry;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use parser::{parse_corpus, CorpusParser, ParseOutput, StructuralWarning, WarningKind};
pub use types::{
    BuildReport, DramaFields, IndexStatistics, MatchSpan, QueryNotice, SearchHit, SearchMode, SearchRequest,
    SearchResponse, Segment, Structure, VerseFields, WorkType,
};
