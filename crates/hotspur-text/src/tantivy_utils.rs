//! hotspur-text
//!
//! Schema, analyzers and field handles for the segment index. Tokenized and
//! atomic fields are declared side by side here so the split is visible in one
//! place.
use tantivy::schema::{
	Facet, FacetOptions, Field, IndexRecordOption, Schema, TextFieldIndexing, TextOptions, FAST, INDEXED, STORED, STRING,
};
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, TextAnalyzer};
use tantivy::{Index, TantivyDocument};

use hotspur_core::error::{Error, Result};
use hotspur_core::types::{Segment, Structure};

pub const RAW_TOKENIZER: &str = "hotspur_raw";
pub const FOLDED_TOKENIZER: &str = "hotspur_folded";

pub fn build_schema() -> Schema {
	let mut schema_builder = Schema::builder();
	// Tokenized: raw case (stored for verification) and case-folded.
	let raw_indexing = TextFieldIndexing::default().set_tokenizer(RAW_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	schema_builder.add_text_field("text", TextOptions::default().set_indexing_options(raw_indexing).set_stored());
	let folded_indexing = TextFieldIndexing::default().set_tokenizer(FOLDED_TOKENIZER).set_index_option(IndexRecordOption::WithFreqsAndPositions);
	schema_builder.add_text_field("text_folded", TextOptions::default().set_indexing_options(folded_indexing));
	// Atomic: exact-match only.
	schema_builder.add_text_field("work_title", STRING | STORED);
	schema_builder.add_text_field("work_type", STRING | STORED);
	schema_builder.add_text_field("speaker", STRING | STORED);
	schema_builder.add_facet_field("work", FacetOptions::default());
	schema_builder.add_u64_field("line_number", INDEXED | STORED | FAST);
	schema_builder.add_u64_field("act", INDEXED | STORED);
	schema_builder.add_u64_field("scene", INDEXED | STORED);
	schema_builder.add_u64_field("sonnet_number", INDEXED | STORED);
	schema_builder.add_text_field("segment", STORED);
	schema_builder.build()
}

/// No stopword or length filters: every word stays searchable, and the folded
/// stream is the raw stream lower-cased token for token.
pub fn register_tokenizers(index: &Index) {
	index.tokenizers().register(RAW_TOKENIZER, TextAnalyzer::builder(SimpleTokenizer::default()).build());
	index.tokenizers().register(FOLDED_TOKENIZER, TextAnalyzer::builder(SimpleTokenizer::default()).filter(LowerCaser).build());
}

pub fn analyzer(index: &Index, name: &str) -> Result<TextAnalyzer> {
	index.tokenizers().get(name).ok_or_else(|| Error::Query(format!("tokenizer '{}' is not registered", name)))
}

#[derive(Debug, Clone, Copy)]
pub struct SegmentFields {
	pub text: Field,
	pub text_folded: Field,
	pub work_title: Field,
	pub work_type: Field,
	pub speaker: Field,
	pub work: Field,
	pub line_number: Field,
	pub act: Field,
	pub scene: Field,
	pub sonnet_number: Field,
	pub segment: Field,
}

impl SegmentFields {
	pub fn from_schema(schema: &Schema) -> Result<Self> {
		let get = |name: &str| schema.get_field(name).storage(format!("resolving field '{}'", name));
		Ok(Self {
			text: get("text")?,
			text_folded: get("text_folded")?,
			work_title: get("work_title")?,
			work_type: get("work_type")?,
			speaker: get("speaker")?,
			work: get("work")?,
			line_number: get("line_number")?,
			act: get("act")?,
			scene: get("scene")?,
			sonnet_number: get("sonnet_number")?,
			segment: get("segment")?,
		})
	}

	/// Field to query for the requested case behaviour.
	pub fn text_field(&self, case_sensitive: bool) -> Field {
		if case_sensitive { self.text } else { self.text_folded }
	}

	pub fn tokenizer_name(case_sensitive: bool) -> &'static str {
		if case_sensitive { RAW_TOKENIZER } else { FOLDED_TOKENIZER }
	}

	pub fn to_document(&self, segment: &Segment) -> Result<TantivyDocument> {
		let mut doc = TantivyDocument::default();
		doc.add_text(self.text, &segment.text);
		doc.add_text(self.text_folded, &segment.text);
		doc.add_text(self.work_title, &segment.work_title);
		doc.add_text(self.work_type, segment.work_type().as_str());
		doc.add_facet(self.work, Facet::from_path([segment.work_title.as_str()]));
		doc.add_u64(self.line_number, segment.line_number);
		match &segment.structure {
			Structure::Drama(d) => {
				if let Some(act) = d.act { doc.add_u64(self.act, u64::from(act)); }
				if let Some(scene) = d.scene { doc.add_u64(self.scene, u64::from(scene)); }
				if let Some(speaker) = &d.speaker { doc.add_text(self.speaker, speaker); }
			}
			Structure::Verse(v) => {
				if let Some(n) = v.sonnet_number { doc.add_u64(self.sonnet_number, u64::from(n)); }
			}
			Structure::Unknown => {}
		}
		doc.add_text(self.segment, serde_json::to_string(segment)?);
		Ok(doc)
	}

	pub fn read_segment(&self, doc: &TantivyDocument) -> Result<Segment> {
		use tantivy::schema::Value;
		let json = doc.get_first(self.segment).and_then(|v| v.as_str()).ok_or_else(|| Error::storage("reading stored segment", "document has no stored segment"))?;
		Ok(serde_json::from_str(json)?)
	}
}

/// Maps foreign (tantivy, io) errors into `Error::Storage` with context.
pub trait StorageResultExt<T> {
	fn storage(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> StorageResultExt<T> for std::result::Result<T, E>
where
	E: std::error::Error + Send + Sync + 'static,
{
	fn storage(self, context: impl Into<String>) -> Result<T> {
		self.map_err(|e| Error::storage(context, e))
	}
}
