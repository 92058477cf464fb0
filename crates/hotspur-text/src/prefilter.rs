//! Literal extraction for the regex prefilter.
//!
//! From the parsed pattern we derive a set of word pieces such that every
//! string the pattern matches contains at least one of them. Each piece is an
//! alphanumeric run, so in indexed text it sits inside a single token and a
//! `.*piece.*` term regex on the folded field finds every candidate.
//!
//! Case-insensitive matching uses Unicode simple case folding, under which
//! `s` also matches `ſ` and `k` the Kelvin sign. Lower-casing does not map
//! those together, so in that mode pieces keep only ASCII letters and digits
//! outside `s` and `k`.

use regex_syntax::hir::{Hir, HirKind};

/// Required pieces for `pattern`, lower-cased, sorted and deduplicated.
/// `None` means no such set exists and a full scan is needed.
pub fn required_pieces(pattern: &str, case_insensitive: bool) -> Option<Vec<String>> {
	let hir = regex_syntax::parse(pattern).ok()?;
	let mut pieces = required(&hir, case_insensitive)?;
	pieces.sort();
	pieces.dedup();
	Some(pieces)
}

fn required(hir: &Hir, case_insensitive: bool) -> Option<Vec<String>> {
	match hir.kind() {
		HirKind::Literal(lit) => {
			let s = std::str::from_utf8(&lit.0).ok()?;
			longest_word_piece(s, case_insensitive).map(|p| vec![p])
		}
		HirKind::Concat(children) => children.iter().filter_map(|c| required(c, case_insensitive)).max_by(|a, b| {
			strength(a).cmp(&strength(b)).then_with(|| b.len().cmp(&a.len()))
		}),
		HirKind::Alternation(branches) => {
			let mut union = Vec::new();
			for branch in branches {
				union.extend(required(branch, case_insensitive)?);
			}
			Some(union)
		}
		HirKind::Repetition(rep) if rep.min >= 1 => required(&rep.sub, case_insensitive),
		HirKind::Capture(cap) => required(&cap.sub, case_insensitive),
		_ => None,
	}
}

/// Shortest piece in the set; longer pieces select fewer terms.
fn strength(set: &[String]) -> usize {
	set.iter().map(|p| p.chars().count()).min().unwrap_or(0)
}

fn longest_word_piece(s: &str, case_insensitive: bool) -> Option<String> {
	s.split(|c: char| if case_insensitive { !folds_only_to_ascii(c) } else { !c.is_alphanumeric() })
		.filter(|p| !p.is_empty())
		.max_by_key(|p| p.chars().count())
		.map(str::to_lowercase)
}

/// ASCII letters and digits whose case-insensitive matches are exactly their
/// ASCII upper and lower forms.
fn folds_only_to_ascii(c: char) -> bool {
	c.is_ascii_alphanumeric() && !matches!(c.to_ascii_lowercase(), 's' | 'k')
}
