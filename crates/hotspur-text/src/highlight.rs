//! Match spans for result highlighting, as Unicode-character offsets into the
//! segment text.

use hotspur_core::types::MatchSpan;
use regex::Regex;
use tantivy::tokenizer::{TextAnalyzer, TokenStream};

use crate::query::QueryTerm;

struct Token {
	text: String,
	from: usize,
	to: usize,
}

fn tokens(analyzer: &mut TextAnalyzer, text: &str) -> Vec<Token> {
	let mut out = Vec::new();
	let mut stream = analyzer.token_stream(text);
	while stream.advance() {
		let t = stream.token();
		out.push(Token { text: t.text.clone(), from: t.offset_from, to: t.offset_to });
	}
	out
}

fn token_matches(token: &str, term: &QueryTerm) -> bool {
	if term.distance == 0 {
		token == term.text
	} else {
		// Restricted Damerau distance, the metric tantivy's fuzzy automaton uses
		// with transpositions enabled.
		strsim::osa_distance(token, &term.text) <= usize::from(term.distance)
	}
}

/// Byte offset to character offset. `byte` must lie on a char boundary.
fn char_offset(text: &str, byte: usize) -> usize {
	text.get(..byte).map_or_else(|| text.chars().count(), |prefix| prefix.chars().count())
}

fn to_char_span(text: &str, from: usize, to: usize) -> MatchSpan {
	MatchSpan { start: char_offset(text, from), end: char_offset(text, to) }
}

/// Every token that matches any query term.
pub fn term_spans(analyzer: &mut TextAnalyzer, text: &str, terms: &[QueryTerm]) -> Vec<MatchSpan> {
	tokens(analyzer, text)
		.iter()
		.filter(|tok| terms.iter().any(|term| token_matches(&tok.text, term)))
		.map(|tok| to_char_span(text, tok.from, tok.to))
		.collect()
}

/// Contiguous token runs matching the phrase, one span per run. When no run
/// exists (a fuzzy phrase matched out of order) the individual term matches
/// are returned instead.
pub fn phrase_spans(analyzer: &mut TextAnalyzer, text: &str, terms: &[QueryTerm]) -> Vec<MatchSpan> {
	let toks = tokens(analyzer, text);
	let n = terms.len();
	let mut spans = Vec::new();
	if n > 0 && toks.len() >= n {
		let mut i = 0;
		while i + n <= toks.len() {
			let window = &toks[i..i + n];
			if window.iter().zip(terms).all(|(tok, term)| token_matches(&tok.text, term)) {
				spans.push(to_char_span(text, window[0].from, window[n - 1].to));
				i += n;
			} else {
				i += 1;
			}
		}
	}
	if spans.is_empty() {
		return term_spans(analyzer, text, terms);
	}
	spans
}

/// Non-empty regex matches, left to right.
pub fn regex_spans(regex: &Regex, text: &str) -> Vec<MatchSpan> {
	regex.find_iter(text).filter(|m| !m.is_empty()).map(|m| to_char_span(text, m.start(), m.end())).collect()
}
