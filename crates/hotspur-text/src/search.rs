use std::cmp::Reverse;

use regex::RegexBuilder;
use tantivy::collector::{Count, TopDocs};
use tantivy::query::{AllQuery, BooleanQuery, Occur, Query, RegexQuery};
use tantivy::{DocAddress, DocId, Score, Searcher, SegmentReader, TantivyDocument, Term};
use tracing::{debug, warn};

use hotspur_core::error::Result;
use hotspur_core::types::{QueryNotice, SearchHit, SearchMode, SearchRequest, SearchResponse, Segment};

use crate::highlight::{phrase_spans, regex_spans, term_spans};
use crate::index::{OpenIndex, SegmentIndex};
use crate::prefilter::required_pieces;
use crate::query::{analyze, any_query, conjoin, phrase_query, query_terms, strip_phrase_quotes, work_filter_clause};
use crate::tantivy_utils::{analyzer, SegmentFields, StorageResultExt};

/// BM25 score, then earlier source line first.
type RankKey = (Score, Reverse<u64>);

enum WorkFilter {
	All,
	Title(Box<dyn Query>),
	Unknown(String),
}

impl SegmentIndex {
	/// Execute a query. Malformed patterns and unknown work titles come back
	/// as an empty response with a notice rather than an error.
	pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
		self.with_open(|open| {
			let searcher = open.reader.searcher();
			let limit = request.limit.min(self.search_config.max_limit);
			let filter = match self.work_filter(open, &searcher, request)? {
				WorkFilter::All => None,
				WorkFilter::Title(q) => Some(q),
				WorkFilter::Unknown(title) => {
					debug!("work filter '{}' matches no indexed work", title);
					return Ok(SearchResponse::empty_with(QueryNotice::UnknownWork { title }));
				}
			};
			match request.mode {
				SearchMode::Any | SearchMode::Phrase => self.search_terms(open, &searcher, request, filter, limit),
				SearchMode::Regex => self.search_regex(open, &searcher, request, filter, limit),
			}
		})
	}

	fn work_filter(&self, open: &OpenIndex, searcher: &Searcher, request: &SearchRequest) -> Result<WorkFilter> {
		let title = match request.work_filter.as_deref() {
			Some(t) if !t.trim().is_empty() && t != self.search_config.all_works_label => t,
			_ => return Ok(WorkFilter::All),
		};
		let term = Term::from_field_text(open.fields.work_title, title);
		if searcher.doc_freq(&term).storage("looking up work title")? == 0 {
			return Ok(WorkFilter::Unknown(title.to_string()));
		}
		Ok(WorkFilter::Title(work_filter_clause(open.fields.work_title, title)))
	}

	fn search_terms(
		&self,
		open: &OpenIndex,
		searcher: &Searcher,
		request: &SearchRequest,
		filter: Option<Box<dyn Query>>,
		limit: usize,
	) -> Result<SearchResponse> {
		let field = open.fields.text_field(request.case_sensitive);
		let mut analyzer = analyzer(&open.index, SegmentFields::tokenizer_name(request.case_sensitive))?;
		let phrase = request.mode == SearchMode::Phrase;
		let text = if phrase { strip_phrase_quotes(&request.query_text) } else { request.query_text.as_str() };
		let terms = query_terms(analyze(&mut analyzer, text), request.fuzzy, self.search_config.fuzzy_max_distance);
		let main = if phrase { phrase_query(field, &terms) } else { any_query(field, &terms) };
		let Some(main) = main else {
			debug!("query '{}' has no searchable terms", request.query_text);
			return Ok(SearchResponse::default());
		};
		let query = conjoin(main, filter);
		debug!("{:?} query: {:?}", request.mode, query);

		let (total_hits, top) = collect_ranked(searcher, query.as_ref(), limit, request.offset)?;
		let mut hits = Vec::with_capacity(top.len());
		for ((score, _), address) in top {
			let segment = load_segment(open, searcher, address)?;
			let match_spans = if phrase {
				phrase_spans(&mut analyzer, &segment.text, &terms)
			} else {
				term_spans(&mut analyzer, &segment.text, &terms)
			};
			hits.push(SearchHit { segment, match_spans, score });
		}
		Ok(SearchResponse { hits, total_hits, notice: None })
	}

	/// Prefilter candidates through the index, then verify each with the real
	/// pattern against the stored raw text.
	fn search_regex(
		&self,
		open: &OpenIndex,
		searcher: &Searcher,
		request: &SearchRequest,
		filter: Option<Box<dyn Query>>,
		limit: usize,
	) -> Result<SearchResponse> {
		let pattern = request.query_text.as_str();
		let regex = match RegexBuilder::new(pattern)
			.case_insensitive(!request.case_sensitive)
			.size_limit(self.search_config.regex_size_limit)
			.build()
		{
			Ok(regex) => regex,
			Err(e) => {
				warn!("rejecting regex '{}': {}", pattern, e);
				return Ok(SearchResponse::empty_with(QueryNotice::InvalidPattern {
					pattern: pattern.to_string(),
					reason: e.to_string(),
				}));
			}
		};

		let candidates: Box<dyn Query> = match required_pieces(pattern, !request.case_sensitive) {
			Some(pieces) => {
				debug!("regex '{}' prefiltered on {:?}", pattern, pieces);
				let mut clauses: Vec<(Occur, Box<dyn Query>)> = Vec::with_capacity(pieces.len());
				for piece in &pieces {
					let q = RegexQuery::from_pattern(&format!(".*{}.*", piece), open.fields.text_folded).storage("building regex prefilter")?;
					clauses.push((Occur::Should, Box::new(q)));
				}
				Box::new(BooleanQuery::new(clauses))
			}
			None => {
				debug!("regex '{}' has no required literal; scanning every segment", pattern);
				Box::new(AllQuery)
			}
		};
		let query = conjoin(candidates, filter);

		// Ranked collection is sized by the candidate count, never the bare budget.
		let budget = self.search_config.regex_scan_budget;
		let candidate_count = searcher.search(query.as_ref(), &Count).storage("counting regex candidates")?;
		if candidate_count == 0 {
			return Ok(SearchResponse::default());
		}
		let (_, top) = collect_ranked(searcher, query.as_ref(), candidate_count.min(budget), 0)?;
		let notice = (candidate_count > budget).then(|| {
			warn!("regex '{}' has {} candidates; verifying the first {}", pattern, candidate_count, budget);
			QueryNotice::ScanTruncated { budget }
		});

		let mut verified = Vec::new();
		for ((score, _), address) in top {
			let segment = load_segment(open, searcher, address)?;
			if regex.is_match(&segment.text) {
				verified.push((segment, score));
			}
		}
		let total_hits = verified.len();
		let hits = verified
			.into_iter()
			.skip(request.offset)
			.take(limit)
			.map(|(segment, score)| {
				let match_spans = regex_spans(&regex, &segment.text);
				SearchHit { segment, match_spans, score }
			})
			.collect();
		Ok(SearchResponse { hits, total_hits, notice })
	}
}

/// Total match count plus one ranked page. Ties in score go to the lower line
/// number so result order is deterministic.
fn collect_ranked(searcher: &Searcher, query: &dyn Query, limit: usize, offset: usize) -> Result<(usize, Vec<(RankKey, DocAddress)>)> {
	if limit == 0 {
		let total = searcher.search(query, &Count).storage("counting matches")?;
		return Ok((total, Vec::new()));
	}
	let top = TopDocs::with_limit(limit).and_offset(offset).tweak_score(|segment_reader: &SegmentReader| {
		let lines = segment_reader.fast_fields().u64("line_number").ok();
		move |doc: DocId, score: Score| -> RankKey { (score, Reverse(lines.as_ref().and_then(|c| c.first(doc)).unwrap_or(u64::MAX))) }
	});
	searcher.search(query, &(Count, top)).storage("executing query")
}

fn load_segment(open: &OpenIndex, searcher: &Searcher, address: DocAddress) -> Result<Segment> {
	let doc: TantivyDocument = searcher.doc(address).storage("loading document")?;
	open.fields.read_segment(&doc)
}
