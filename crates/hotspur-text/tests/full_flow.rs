use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

use hotspur_core::config::Settings;
use hotspur_core::exchange::read_corpus;
use hotspur_core::traits::{SegmentIndexer, SegmentSearch};
use hotspur_core::{parse_corpus, Error, MatchSpan, ParseOutput, QueryNotice, SearchMode, SearchRequest, Segment, Structure};
use hotspur_text::SegmentIndex;
use tempfile::TempDir;

const HAMLET: &str = "THE TRAGEDY OF HAMLET, PRINCE OF DENMARK";

fn fixture_path() -> PathBuf {
	// crates/hotspur-text -> crates -> repo root
	let root = PathBuf::from(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap().to_path_buf();
	root.join("test_data/mini_corpus.txt")
}

fn parse_fixture() -> ParseOutput {
	let settings = Settings::default();
	parse_corpus(&read_corpus(&fixture_path()).expect("read fixture"), &settings.parser).expect("parse")
}

/// Index the fixture into a fresh temp dir. The TempDir must outlive the index.
fn build_fixture() -> (TempDir, SegmentIndex, ParseOutput) {
	let tmp = TempDir::new().unwrap();
	let index = SegmentIndex::new(tmp.path().join("index"), &Settings::default());
	let parsed = parse_fixture();
	let report = index.build_index(parsed.segments.clone()).expect("build");
	assert_eq!(report.indexed, parsed.segments.len());
	assert!(report.skipped.is_empty());
	(tmp, index, parsed)
}

fn texts(response: &hotspur_core::SearchResponse) -> Vec<&str> {
	response.hits.iter().map(|h| h.segment.text.as_str()).collect()
}

#[test]
fn match_everything_regex_round_trips_all_segments() {
	let (_tmp, index, parsed) = build_fixture();
	let response = index.search(&SearchRequest::new(".*").with_mode(SearchMode::Regex).with_limit(1000)).expect("search");
	assert_eq!(response.total_hits, parsed.segments.len());
	let returned: Vec<Segment> = response.hits.into_iter().map(|h| h.segment).collect();
	assert_eq!(returned, parsed.segments, "stored segments are reconstructed exactly, in line order");
}

#[test]
fn work_filter_is_exact() {
	let (_tmp, index, _) = build_fixture();
	let filtered = index.search(&SearchRequest::new("love").with_work_filter(HAMLET)).unwrap();
	assert_eq!(filtered.total_hits, 2);
	assert!(filtered.hits.iter().all(|h| h.segment.work_title == HAMLET));

	let unfiltered = index.search(&SearchRequest::new("love")).unwrap();
	assert_eq!(unfiltered.total_hits, 5);
	let sentinel = index.search(&SearchRequest::new("love").with_work_filter("All Works")).unwrap();
	assert_eq!(sentinel.total_hits, unfiltered.total_hits);
	let empty = index.search(&SearchRequest::new("love").with_work_filter("")).unwrap();
	assert_eq!(empty.total_hits, unfiltered.total_hits);

	// A single word of a multi-word title is not a title.
	let partial = index.search(&SearchRequest::new("love").with_work_filter("HAMLET")).unwrap();
	assert!(partial.is_empty());
	assert_eq!(partial.notice, Some(QueryNotice::UnknownWork { title: "HAMLET".to_string() }));
}

#[test]
fn phrase_requires_contiguous_order() {
	let (_tmp, index, _) = build_fixture();
	let response = index.search(&SearchRequest::new("\"to be or not to be\"").with_mode(SearchMode::Phrase)).unwrap();
	assert_eq!(response.total_hits, 1, "Ophelia's reordered line must not match");
	let hit = &response.hits[0];
	assert!(hit.segment.text.starts_with("To be, or not to be"));
	assert_eq!(hit.match_spans, vec![MatchSpan { start: 0, end: 19 }]);

	let any = index.search(&SearchRequest::new("to be or not to be")).unwrap();
	assert!(any.total_hits > 1);
}

#[test]
fn regex_honours_case_flag_and_reports_spans() {
	let (_tmp, index, _) = build_fixture();
	let sensitive = index.search(&SearchRequest::new("love.*death").with_mode(SearchMode::Regex).with_case_sensitive(true)).unwrap();
	assert_eq!(texts(&sensitive), vec!["Thy love is death to me."]);
	assert_eq!(sensitive.hits[0].match_spans, vec![MatchSpan { start: 4, end: 17 }]);

	let insensitive = index.search(&SearchRequest::new("love.*death").with_mode(SearchMode::Regex)).unwrap();
	assert_eq!(insensitive.total_hits, 2);
	assert!(texts(&insensitive).contains(&"Love and death walk hand in hand."));
	for hit in &insensitive.hits {
		let re = regex::RegexBuilder::new("love.*death").case_insensitive(true).build().unwrap();
		assert!(re.is_match(&hit.segment.text));
	}
}

#[test]
fn invalid_pattern_is_a_notice_not_an_error() {
	let (_tmp, index, _) = build_fixture();
	let response = index.search(&SearchRequest::new("(").with_mode(SearchMode::Regex)).expect("no error");
	assert!(response.is_empty());
	assert_eq!(response.total_hits, 0);
	assert!(matches!(response.notice, Some(QueryNotice::InvalidPattern { ref pattern, .. }) if pattern == "("));
}

#[test]
fn case_sensitive_any_uses_raw_field() {
	let (_tmp, index, _) = build_fixture();
	let response = index.search(&SearchRequest::new("Love").with_case_sensitive(true)).unwrap();
	assert_eq!(texts(&response), vec!["Love and death walk hand in hand."]);
	assert_eq!(response.hits[0].match_spans, vec![MatchSpan { start: 0, end: 4 }]);
}

#[test]
fn fuzzy_tolerates_a_transposition() {
	let (_tmp, index, _) = build_fixture();
	let exact = index.search(&SearchRequest::new("Romoe")).unwrap();
	assert_eq!(exact.total_hits, 0);

	let fuzzy = index.search(&SearchRequest::new("Romoe").with_fuzzy(true)).unwrap();
	let hit = fuzzy.hits.iter().find(|h| h.segment.text.starts_with("O Romeo")).expect("Juliet's line matches");
	assert_eq!(hit.match_spans.len(), 3);
}

#[test]
fn results_are_ranked_then_ordered_by_line() {
	let (_tmp, index, _) = build_fixture();
	let response = index.search(&SearchRequest::new("love")).unwrap();
	for pair in response.hits.windows(2) {
		let (a, b) = (&pair[0], &pair[1]);
		assert!(a.score > b.score || (a.score == b.score && a.segment.line_number < b.segment.line_number));
	}
}

#[test]
fn pagination_never_exceeds_limit() {
	let (_tmp, index, _) = build_fixture();
	let all = index.search(&SearchRequest::new("love")).unwrap();
	let page = index.search(&SearchRequest::new("love").with_limit(2).with_offset(1)).unwrap();
	assert_eq!(page.total_hits, all.total_hits);
	assert_eq!(page.hits.len(), 2);
	assert_eq!(page.hits[0].segment, all.hits[1].segment);
	assert_eq!(page.hits[1].segment, all.hits[2].segment);

	let regex_page = index.search(&SearchRequest::new(".*").with_mode(SearchMode::Regex).with_limit(3).with_offset(27)).unwrap();
	assert_eq!(regex_page.total_hits, 28);
	assert_eq!(regex_page.hits.len(), 1);
}

#[test]
fn hits_carry_context_unchanged() {
	let (_tmp, index, parsed) = build_fixture();
	let response = index.search(&SearchRequest::new("wherefore")).unwrap();
	let hit = &response.hits[0];
	let original = parsed.segments.iter().find(|s| s.line_number == hit.segment.line_number).unwrap();
	assert_eq!(hit.segment.preceding_lines, original.preceding_lines);
	assert_eq!(hit.segment.preceding_lines, vec!["ACT II", "SCENE II. Capulet's Garden.", "JULIET."]);
	assert_eq!(hit.segment.following_lines, original.following_lines);
}

#[test]
fn list_works_matches_parser_and_rebuild_is_idempotent() {
	let (_tmp, index, parsed) = build_fixture();
	let works = index.list_works().unwrap();
	assert_eq!(works.len(), 6);
	assert_eq!(works, parsed.works.iter().cloned().collect::<BTreeSet<String>>());

	let counts = index.work_counts().unwrap();
	let hamlet = counts.iter().find(|(t, _)| t == HAMLET).map(|(_, c)| *c);
	assert_eq!(hamlet, Some(10));

	let before = index.statistics().unwrap();
	assert_eq!(before.document_count, 28);
	assert_eq!(before.work_count, 6);
	assert!(before.index_size_bytes > 0);

	index.build_index(parsed.segments.clone()).unwrap();
	let after = index.statistics().unwrap();
	assert_eq!(after.document_count, before.document_count);
	assert_eq!(after.work_count, before.work_count);
}

#[test]
fn clear_index_then_search_is_index_not_found() {
	let (_tmp, index, _) = build_fixture();
	assert!(index.index_exists());
	index.clear_index().unwrap();
	assert!(!index.index_exists());
	let err = index.search(&SearchRequest::new("love")).unwrap_err();
	assert!(matches!(err, Error::IndexNotFound(_)));
}

#[test]
fn missing_index_is_distinct_from_empty_results() {
	let tmp = TempDir::new().unwrap();
	let index = SegmentIndex::new(tmp.path().join("never-built"), &Settings::default());
	assert!(matches!(index.statistics(), Err(Error::IndexNotFound(_))));

	let (_tmp, built, _) = build_fixture();
	let none = built.search(&SearchRequest::new("zounds")).unwrap();
	assert!(none.is_empty());
	assert!(none.notice.is_none());
}

#[test]
fn empty_segments_are_skipped_not_fatal() {
	let tmp = TempDir::new().unwrap();
	let index = SegmentIndex::new(tmp.path().join("index"), &Settings::default());
	let mut segments = parse_fixture().segments;
	segments[0].text = "   ".to_string();
	let line = segments[0].line_number;
	let report = index.build_index(segments).unwrap();
	assert_eq!(report.skipped, vec![line]);
	assert_eq!(report.indexed, 27);
}

#[test]
fn concurrent_builds_are_rejected_by_the_lock_file() {
	let tmp = TempDir::new().unwrap();
	let index = SegmentIndex::new(tmp.path().join("index"), &Settings::default());

	// A lock still being written has no pid yet.
	std::fs::write(tmp.path().join("index.lock"), b"").unwrap();
	assert!(matches!(index.build_index(parse_fixture().segments), Err(Error::IndexLocked(_))));

	std::fs::write(tmp.path().join("index.lock"), std::process::id().to_string()).unwrap();
	assert!(matches!(index.build_index(parse_fixture().segments), Err(Error::IndexLocked(_))));
	assert!(matches!(index.clear_index(), Err(Error::IndexLocked(_))));
}

#[cfg(target_os = "linux")]
#[test]
fn lock_left_by_an_exited_process_is_taken_over() {
	let tmp = TempDir::new().unwrap();
	let lock = tmp.path().join("index.lock");
	let index = SegmentIndex::new(tmp.path().join("index"), &Settings::default());

	std::fs::write(&lock, u32::MAX.to_string()).unwrap();
	let report = index.build_index(parse_fixture().segments).expect("stale lock is taken over");
	assert_eq!(report.indexed, 28);
	assert!(!lock.exists());
	assert_eq!(index.search(&SearchRequest::new("candle")).unwrap().total_hits, 1);

	std::fs::write(&lock, u32::MAX.to_string()).unwrap();
	index.clear_index().expect("stale lock is taken over");
	assert!(!lock.exists());
	assert!(!index.index_exists());
}

#[test]
fn case_insensitive_regex_matches_folded_long_s() {
	let tmp = TempDir::new().unwrap();
	let index = SegmentIndex::new(tmp.path().join("index"), &Settings::default());
	let segment = Segment {
		work_title: "A FUNERAL ELEGY".to_string(),
		structure: Structure::Unknown,
		text: "all is lo\u{17f}t now".to_string(),
		line_number: 1,
		preceding_lines: Vec::new(),
		following_lines: Vec::new(),
	};
	index.build_index(vec![segment]).unwrap();

	for pattern in ["lost", "l[o]st", "LOST now"] {
		let response = index.search(&SearchRequest::new(pattern).with_mode(SearchMode::Regex)).unwrap();
		assert_eq!(response.total_hits, 1, "pattern {pattern}");
	}
	let sensitive = index.search(&SearchRequest::new("lost").with_mode(SearchMode::Regex).with_case_sensitive(true)).unwrap();
	assert_eq!(sensitive.total_hits, 0);
}

#[test]
fn list_works_omits_titles_without_segments() {
	let text = "Contents\n\n  THE TEMPEST\n  THE SONNETS\n\n\nTHE TEMPEST\n\nACT I\n\nEnter Prospero.\n\n\nTHE SONNETS\n\n1\n\nFrom fairest creatures we desire increase,\n";
	let parsed = parse_corpus(text, &Settings::default().parser).unwrap();
	let tmp = TempDir::new().unwrap();
	let index = SegmentIndex::new(tmp.path().join("index"), &Settings::default());
	index.build_index(parsed.segments.clone()).unwrap();
	assert_eq!(index.list_works().unwrap(), parsed.works.iter().cloned().collect::<BTreeSet<String>>());
}

#[test]
fn parallel_searches_share_one_index() {
	let (_tmp, index, _) = build_fixture();
	let index = Arc::new(index);
	let handles: Vec<_> = (0..8)
		.map(|_| {
			let index = Arc::clone(&index);
			thread::spawn(move || index.search(&SearchRequest::new("love")).map(|r| r.total_hits))
		})
		.collect();
	for handle in handles {
		assert_eq!(handle.join().unwrap().unwrap(), 5);
	}
}

#[test]
fn searches_during_rebuilds_see_a_complete_index() {
	let (_tmp, index, parsed) = build_fixture();
	let index = Arc::new(index);
	let builder = {
		let index = Arc::clone(&index);
		let segments = parsed.segments.clone();
		thread::spawn(move || {
			for _ in 0..3 {
				index.build_index(segments.clone()).expect("rebuild");
			}
		})
	};
	let searchers: Vec<_> = (0..4)
		.map(|_| {
			let index = Arc::clone(&index);
			thread::spawn(move || {
				for _ in 0..20 {
					let response = index.search(&SearchRequest::new("love")).expect("search during rebuild");
					assert_eq!(response.total_hits, 5);
				}
			})
		})
		.collect();
	builder.join().unwrap();
	for handle in searchers {
		handle.join().unwrap();
	}
	assert_eq!(index.statistics().unwrap().document_count, 28);
}

#[test]
fn regex_scan_stops_at_the_budget() {
	let tmp = TempDir::new().unwrap();
	let mut settings = Settings::default();
	settings.search.regex_scan_budget = 2;
	let index = SegmentIndex::new(tmp.path().join("index"), &settings);
	index.build_index(parse_fixture().segments).unwrap();

	let truncated = index.search(&SearchRequest::new(".*").with_mode(SearchMode::Regex)).unwrap();
	assert_eq!(truncated.notice, Some(QueryNotice::ScanTruncated { budget: 2 }));
	assert_eq!(truncated.total_hits, 2);
	assert_eq!(truncated.hits.len(), 2);

	let within = index.search(&SearchRequest::new("brief candle").with_mode(SearchMode::Regex)).unwrap();
	assert!(within.notice.is_none());
	assert_eq!(texts(&within), vec!["Out, out, brief candle!"]);

	let no_candidates = index.search(&SearchRequest::new("zounds").with_mode(SearchMode::Regex)).unwrap();
	assert!(no_candidates.is_empty());
	assert!(no_candidates.notice.is_none());
}

#[test]
fn fuzzy_phrase_requires_every_approximate_term() {
	let (_tmp, index, _) = build_fixture();
	let exact = index.search(&SearchRequest::new("\"brief candel\"").with_mode(SearchMode::Phrase)).unwrap();
	assert_eq!(exact.total_hits, 0);

	let fuzzy = index.search(&SearchRequest::new("\"brief candel\"").with_mode(SearchMode::Phrase).with_fuzzy(true)).unwrap();
	assert!(texts(&fuzzy).contains(&"Out, out, brief candle!"));
	assert!(fuzzy.hits.iter().all(|h| !h.match_spans.is_empty()));
}

#[test]
fn case_sensitive_phrase_uses_raw_field() {
	let (_tmp, index, _) = build_fixture();
	let response = index.search(&SearchRequest::new("\"To be, or not\"").with_mode(SearchMode::Phrase).with_case_sensitive(true)).unwrap();
	assert_eq!(response.total_hits, 1);
	assert_eq!(response.hits[0].match_spans, vec![MatchSpan { start: 0, end: 13 }]);

	let lower = index.search(&SearchRequest::new("\"to be or not to be\"").with_mode(SearchMode::Phrase).with_case_sensitive(true)).unwrap();
	assert_eq!(lower.total_hits, 0);
}

#[test]
fn engine_is_usable_through_the_traits() {
	let (_tmp, index, _) = build_fixture();
	let search: &dyn SegmentSearch = &index;
	assert_eq!(search.list_works().unwrap().len(), 6);
	let indexer: &dyn SegmentIndexer = &index;
	indexer.clear_index().unwrap();
	assert!(matches!(search.search(&SearchRequest::new("love")), Err(Error::IndexNotFound(_))));
}

#[test]
fn reopened_index_answers_without_rebuild() {
	let (tmp, index, _) = build_fixture();
	index.close();
	assert!(!index.is_open());
	let other = SegmentIndex::new(tmp.path().join("index"), &Settings::default());
	let response = other.search(&SearchRequest::new("candle")).unwrap();
	assert_eq!(texts(&response), vec!["Out, out, brief candle!"]);
	assert!(other.is_open());
}
