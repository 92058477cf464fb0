use std::collections::BTreeSet;

use crate::error::Result;
use crate::types::{BuildReport, IndexStatistics, SearchRequest, SearchResponse, Segment};

pub trait SegmentIndexer: Send + Sync {
    fn build_index(&self, segments: Vec<Segment>) -> Result<BuildReport>;
    fn clear_index(&self) -> Result<()>;
}

pub trait SegmentSearch: Send + Sync {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
    fn list_works(&self) -> Result<BTreeSet<String>>;
    fn statistics(&self) -> Result<IndexStatistics>;
}
