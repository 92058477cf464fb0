use std::env;
use std::path::PathBuf;

use hotspur_core::config::Config;
use hotspur_core::telemetry::init_tracing;
use hotspur_core::{SearchMode, SearchRequest};
use hotspur_text::SegmentIndex;

// Query an existing segment index and print results with context.
// Usage:
//   cargo run -p hotspur-text --example search -- "your query" \
//     [--index data/index] [--mode any|phrase|regex] [--work "THE SONNETS"] \
//     [--case] [--fuzzy] [--limit 10] [--offset 0] [--works]

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        eprintln!("Usage: cargo run -p hotspur-text --example search -- <query> [--index DIR] [--mode MODE] [--work TITLE] [--case] [--fuzzy] [--limit N] [--offset N] [--works]");
        std::process::exit(1);
    }
    let mut query = String::new();
    let mut index_dir: Option<PathBuf> = None;
    let mut mode = SearchMode::Any;
    let mut work: Option<String> = None;
    let mut case_sensitive = false;
    let mut fuzzy = false;
    let mut limit: Option<usize> = None;
    let mut offset: usize = 0;
    let mut show_works = false;

    let mut i = 0;
    while i < args.len() {
        let needs_value = matches!(args[i].as_str(), "--index" | "--mode" | "--work" | "--limit" | "--offset");
        if needs_value && i + 1 >= args.len() { eprintln!("{} requires a value", args[i]); std::process::exit(2); }
        match args[i].as_str() {
            "--index" => { index_dir = Some(PathBuf::from(&args[i + 1])); i += 2; continue; }
            "--mode" => {
                mode = match args[i + 1].as_str() {
                    "any" => SearchMode::Any,
                    "phrase" => SearchMode::Phrase,
                    "regex" => SearchMode::Regex,
                    other => { eprintln!("Unknown mode: {}", other); std::process::exit(2); }
                };
                i += 2; continue;
            }
            "--work" => { work = Some(args[i + 1].clone()); i += 2; continue; }
            "--limit" => { limit = args[i + 1].parse().ok(); i += 2; continue; }
            "--offset" => { offset = args[i + 1].parse().unwrap_or(offset); i += 2; continue; }
            "--case" => { case_sensitive = true; i += 1; continue; }
            "--fuzzy" => { fuzzy = true; i += 1; continue; }
            "--works" => { show_works = true; i += 1; continue; }
            s if s.starts_with("--") => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            s => {
                if query.is_empty() { query = s.to_string(); }
                i += 1; continue;
            }
        }
    }

    let settings = Config::load()?.settings()?;
    init_tracing(&settings.telemetry.filter);
    let index_dir = index_dir.unwrap_or_else(|| settings.index.index_path());
    let limit = limit.unwrap_or(settings.search.default_limit);
    let index = SegmentIndex::new(index_dir, &settings);

    if show_works {
        for (title, count) in index.work_counts()? {
            println!("{:>6}  {}", count, title);
        }
        return Ok(());
    }
    if query.is_empty() {
        eprintln!("Missing <query> argument");
        std::process::exit(1);
    }

    let mut request = SearchRequest::new(query)
        .with_mode(mode)
        .with_case_sensitive(case_sensitive)
        .with_fuzzy(fuzzy)
        .with_limit(limit)
        .with_offset(offset);
    if let Some(w) = work { request = request.with_work_filter(w); }

    println!("Hotspur search\n==============");
    println!("Index: {}", index.index_dir().display());
    println!("Query: {} ({:?}, limit {})\n", request.query_text, request.mode, limit);

    let response = index.search(&request)?;
    if let Some(notice) = &response.notice {
        println!("Notice: {:?}", notice);
    }
    println!("{} total hits", response.total_hits);
    for (n, hit) in response.hits.iter().enumerate() {
        let s = &hit.segment;
        println!("{:>2}. score={:.3} {} (line {})", offset + n + 1, hit.score, s.work_title, s.line_number);
        if let Some(d) = s.drama() {
            println!("    act={:?} scene={:?} speaker={:?}", d.act, d.scene, d.speaker);
        }
        for line in &s.preceding_lines { println!("      {}", line); }
        println!("    > {}", highlight(&s.text, &hit.match_spans));
        for line in &s.following_lines { println!("      {}", line); }
    }
    Ok(())
}

/// Wrap each span in brackets for terminal output.
fn highlight(text: &str, spans: &[hotspur_core::MatchSpan]) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::new();
    let mut pos = 0;
    for span in spans {
        if span.start < pos { continue; }
        out.extend(&chars[pos..span.start]);
        out.push('[');
        out.extend(&chars[span.start..span.end.min(chars.len())]);
        out.push(']');
        pos = span.end.min(chars.len());
    }
    out.extend(&chars[pos.min(chars.len())..]);
    out
}
