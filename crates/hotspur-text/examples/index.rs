use std::env;
use std::path::{Path, PathBuf};

use hotspur_core::config::Config;
use hotspur_core::exchange::{read_corpus, write_segments};
use hotspur_core::telemetry::init_tracing;
use hotspur_core::CorpusParser;
use hotspur_text::SegmentIndex;

// Parse a corpus file and (re)build the segment index from it.
// Usage:
//   cargo run -p hotspur-text --example index -- [--corpus test_data/mini_corpus.txt] [--index data/index] [--segments out.json]
// Notes:
//   - The new index is built next to the old one and swapped in on success.
//   - Other settings come from config.toml / HOTSPUR_* variables.

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();
    let mut corpus: Option<PathBuf> = None;
    let mut index_dir: Option<PathBuf> = None;
    let mut segments_out: Option<PathBuf> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--corpus" | "--index" | "--segments" => {
                if i + 1 >= args.len() { eprintln!("{} requires a path", args[i]); std::process::exit(2); }
                let value = Some(PathBuf::from(&args[i + 1]));
                match args[i].as_str() {
                    "--corpus" => corpus = value,
                    "--index" => index_dir = value,
                    _ => segments_out = value,
                }
                i += 2; continue;
            }
            s if s.starts_with('-') => {
                eprintln!("Unknown flag: {}", s); std::process::exit(2);
            }
            _ => { i += 1; }
        }
    }

    let settings = Config::load()?.settings()?;
    init_tracing(&settings.telemetry.filter);

    // Compute workspace root from this crate's manifest dir: ../../
    let ws_root = Path::new(env!("CARGO_MANIFEST_DIR")).ancestors().nth(2).unwrap_or(Path::new("."));
    let corpus = corpus.unwrap_or_else(|| ws_root.join("test_data/mini_corpus.txt"));
    let index_dir = index_dir.unwrap_or_else(|| settings.index.index_path());

    println!("Hotspur index build\n===================");
    println!("Corpus   : {}", corpus.display());
    println!("Index dir: {}", index_dir.display());

    let parser = CorpusParser::new(settings.parser.clone())?;
    let output = parser.parse_text(&read_corpus(&corpus)?);
    println!("Parsed {} segments from {} works ({} warnings)", output.segments.len(), output.works.len(), output.warnings.len());
    if let Some(path) = segments_out {
        write_segments(&path, &output.segments)?;
        println!("Segments written to {}", path.display());
    }

    let index = SegmentIndex::new(index_dir, &settings);
    let report = index.build_index(output.segments)?;
    let stats = index.statistics()?;
    println!("Done. Indexed {} segments, skipped {}.", report.indexed, report.skipped.len());
    println!("{} documents, {} works, {} bytes on disk", stats.document_count, stats.work_count, stats.index_size_bytes);
    Ok(())
}
