//! Query construction for the Any and Phrase modes, fuzzy expansion and the
//! exact work filter.

use tantivy::query::{BooleanQuery, ConstScoreQuery, FuzzyTermQuery, Occur, PhraseQuery, Query, TermQuery};
use tantivy::schema::{Field, IndexRecordOption};
use tantivy::tokenizer::{TextAnalyzer, TokenStream};
use tantivy::Term;

/// One analyzed query term and the edit distance allowed for it (0 = exact).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryTerm {
	pub text: String,
	pub distance: u8,
}

/// Run `text` through the same analyzer the field was indexed with.
pub fn analyze(analyzer: &mut TextAnalyzer, text: &str) -> Vec<String> {
	let mut terms = Vec::new();
	let mut stream = analyzer.token_stream(text);
	while stream.advance() {
		terms.push(stream.token().text.clone());
	}
	terms
}

/// Quote characters accepted around a phrase.
pub fn strip_phrase_quotes(text: &str) -> &str {
	text.trim().trim_matches(|c| c == '"' || c == '\u{201c}' || c == '\u{201d}').trim()
}

/// Edit distance allowed for a term of this length, capped at `max`.
pub fn fuzzy_distance(term: &str, max: u8) -> u8 {
	let d = match term.chars().count() {
		0..=2 => 0,
		3..=4 => 1,
		_ => 2,
	};
	d.min(max)
}

pub fn query_terms(terms: Vec<String>, fuzzy: bool, max_distance: u8) -> Vec<QueryTerm> {
	terms
		.into_iter()
		.map(|text| {
			let distance = if fuzzy { fuzzy_distance(&text, max_distance) } else { 0 };
			QueryTerm { text, distance }
		})
		.collect()
}

/// Exact match, or exact OR fuzzy when the term allows edits (exact scores higher).
fn term_clause(field: Field, term: &QueryTerm) -> Box<dyn Query> {
	let t = Term::from_field_text(field, &term.text);
	let exact = Box::new(TermQuery::new(t.clone(), IndexRecordOption::WithFreqs)) as Box<dyn Query>;
	if term.distance == 0 {
		return exact;
	}
	let fuzzy = Box::new(FuzzyTermQuery::new(t, term.distance, true)) as Box<dyn Query>;
	Box::new(BooleanQuery::new(vec![(Occur::Should, exact), (Occur::Should, fuzzy)]))
}

/// Disjunction of the terms. `None` when there is nothing to search for.
pub fn any_query(field: Field, terms: &[QueryTerm]) -> Option<Box<dyn Query>> {
	match terms {
		[] => None,
		[single] => Some(term_clause(field, single)),
		_ => Some(Box::new(BooleanQuery::new(terms.iter().map(|t| (Occur::Should, term_clause(field, t))).collect()))),
	}
}

/// Contiguous sequence match. With fuzzy terms, positions cannot be checked by
/// tantivy, so every term is required instead.
pub fn phrase_query(field: Field, terms: &[QueryTerm]) -> Option<Box<dyn Query>> {
	match terms {
		[] => None,
		[single] => Some(term_clause(field, single)),
		_ if terms.iter().any(|t| t.distance > 0) => {
			Some(Box::new(BooleanQuery::new(terms.iter().map(|t| (Occur::Must, term_clause(field, t))).collect())))
		}
		_ => Some(Box::new(PhraseQuery::new(terms.iter().map(|t| Term::from_field_text(field, &t.text)).collect()))),
	}
}

/// Zero-score exact constraint on the atomic title field.
pub fn work_filter_clause(work_title: Field, title: &str) -> Box<dyn Query> {
	let term = Term::from_field_text(work_title, title);
	Box::new(ConstScoreQuery::new(Box::new(TermQuery::new(term, IndexRecordOption::Basic)), 0.0))
}

/// Both the main query and the optional filter are required. The main query is
/// nested so its own Should clauses keep their meaning.
pub fn conjoin(main: Box<dyn Query>, filter: Option<Box<dyn Query>>) -> Box<dyn Query> {
	match filter {
		None => main,
		Some(filter) => Box::new(BooleanQuery::new(vec![(Occur::Must, main), (Occur::Must, filter)])),
	}
}
