pub mod tantivy_utils;
pub mod index;
pub mod query;
pub mod prefilter;
pub mod highlight;
pub mod search;

pub use index::SegmentIndex;
