use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use indicatif::{ProgressBar, ProgressStyle};
use tantivy::collector::FacetCollector;
use tantivy::directory::MmapDirectory;
use tantivy::query::AllQuery;
use tantivy::schema::Facet;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, TantivyDocument};
use tracing::{debug, info, warn};

use hotspur_core::config::{IndexConfig, SearchConfig, Settings};
use hotspur_core::error::{Error, Result};
use hotspur_core::traits::{SegmentIndexer, SegmentSearch};
use hotspur_core::types::{BuildReport, IndexStatistics, SearchRequest, SearchResponse, Segment};

use crate::tantivy_utils::{build_schema, register_tokenizers, SegmentFields, StorageResultExt};

/// A committed index as seen by searches: one reader, reloaded only on rebuild.
pub(crate) struct OpenIndex {
	pub index: Index,
	pub reader: IndexReader,
	pub fields: SegmentFields,
}

/// Segment index rooted at one directory. Builds and clears take the write
/// side of `state`; searches hold the read side while they run.
pub struct SegmentIndex {
	index_dir: PathBuf,
	index_config: IndexConfig,
	pub(crate) search_config: SearchConfig,
	state: RwLock<Option<OpenIndex>>,
}

impl SegmentIndex {
	pub fn new(index_dir: PathBuf, settings: &Settings) -> Self {
		Self { index_dir, index_config: settings.index.clone(), search_config: settings.search.clone(), state: RwLock::new(None) }
	}

	pub fn from_settings(settings: &Settings) -> Self {
		Self::new(settings.index.index_path(), settings)
	}

	pub fn index_dir(&self) -> &Path { &self.index_dir }

	pub fn index_exists(&self) -> bool {
		match MmapDirectory::open(&self.index_dir) {
			Ok(dir) => Index::exists(&dir).unwrap_or(false),
			Err(_) => false,
		}
	}

	pub fn is_open(&self) -> bool { self.read_state().is_some() }

	/// Open the committed index if it is not open yet.
	pub fn open(&self) -> Result<()> {
		let mut state = self.write_state();
		if state.is_none() {
			recover_interrupted_swap(&self.index_dir)?;
			*state = Some(self.load()?);
		}
		Ok(())
	}

	/// Drop the open handle. The next search reopens lazily.
	pub fn close(&self) {
		*self.write_state() = None;
	}

	pub fn build_index(&self, segments: Vec<Segment>) -> Result<BuildReport> {
		let mut state = self.write_state();
		let _lock = BuildLock::acquire(&self.index_dir)?;

		let staging = sibling(&self.index_dir, "staging");
		if staging.exists() {
			warn!("removing leftover staging directory {}", staging.display());
			fs::remove_dir_all(&staging)?;
		}
		fs::create_dir_all(&staging)?;

		let schema = build_schema();
		let index = Index::create_in_dir(&staging, schema.clone()).storage("creating staging index")?;
		register_tokenizers(&index);
		let fields = SegmentFields::from_schema(&schema)?;
		let mut writer: IndexWriter<TantivyDocument> = index
			.writer_with_num_threads(self.index_config.writer_threads, self.index_config.writer_heap_bytes)
			.storage("opening index writer")?;

		let progress = self.index_config.show_progress.then(|| progress_bar(segments.len()));
		let mut report = BuildReport::default();
		for segment in &segments {
			if segment.text.trim().is_empty() || segment.work_title.trim().is_empty() {
				warn!("skipping segment at line {}: empty text or work title", segment.line_number);
				report.skipped.push(segment.line_number);
				continue;
			}
			writer.add_document(fields.to_document(segment)?).storage("adding document")?;
			report.indexed += 1;
			if let Some(pb) = &progress { pb.inc(1); }
		}
		writer.commit().storage("committing index")?;
		writer.wait_merging_threads().storage("waiting for merge threads")?;
		if let Some(pb) = progress { pb.finish_with_message("index committed"); }

		// Release the old reader's mmaps before its files move.
		*state = None;
		swap_into_place(&staging, &self.index_dir)?;
		*state = Some(self.load()?);
		info!("indexed {} segments into {} ({} skipped)", report.indexed, self.index_dir.display(), report.skipped.len());
		Ok(report)
	}

	/// Delete the persisted index. Later searches fail with `IndexNotFound`.
	pub fn clear_index(&self) -> Result<()> {
		let mut state = self.write_state();
		let _lock = BuildLock::acquire(&self.index_dir)?;
		*state = None;
		for dir in [self.index_dir.clone(), sibling(&self.index_dir, "staging"), sibling(&self.index_dir, "previous")] {
			if dir.exists() { fs::remove_dir_all(&dir)?; }
		}
		info!("cleared index at {}", self.index_dir.display());
		Ok(())
	}

	pub fn list_works(&self) -> Result<BTreeSet<String>> {
		Ok(self.work_counts()?.into_iter().map(|(title, _)| title).collect())
	}

	/// Documents per work, ordered by title.
	pub fn work_counts(&self) -> Result<Vec<(String, u64)>> {
		self.with_open(facet_counts)
	}

	pub fn statistics(&self) -> Result<IndexStatistics> {
		self.with_open(|open| {
			let document_count = open.reader.searcher().num_docs();
			let work_count = facet_counts(open)?.len();
			Ok(IndexStatistics { document_count, work_count, index_size_bytes: dir_size(&self.index_dir) })
		})
	}

	/// Run `f` against the open index, opening it first if needed.
	pub(crate) fn with_open<T>(&self, f: impl FnOnce(&OpenIndex) -> Result<T>) -> Result<T> {
		{
			let state = self.read_state();
			if let Some(open) = state.as_ref() {
				return f(open);
			}
		}
		self.open()?;
		let state = self.read_state();
		match state.as_ref() {
			Some(open) => f(open),
			None => Err(Error::IndexNotFound(self.index_dir.clone())),
		}
	}

	fn load(&self) -> Result<OpenIndex> {
		if !self.index_exists() {
			return Err(Error::IndexNotFound(self.index_dir.clone()));
		}
		let index = Index::open_in_dir(&self.index_dir).storage("opening index")?;
		register_tokenizers(&index);
		let reader = index.reader_builder().reload_policy(ReloadPolicy::Manual).try_into().storage("creating index reader")?;
		let fields = SegmentFields::from_schema(&index.schema())?;
		debug!("opened index at {}", self.index_dir.display());
		Ok(OpenIndex { index, reader, fields })
	}

	fn read_state(&self) -> RwLockReadGuard<'_, Option<OpenIndex>> {
		self.state.read().unwrap_or_else(PoisonError::into_inner)
	}

	fn write_state(&self) -> RwLockWriteGuard<'_, Option<OpenIndex>> {
		self.state.write().unwrap_or_else(PoisonError::into_inner)
	}
}

impl SegmentIndexer for SegmentIndex {
	fn build_index(&self, segments: Vec<Segment>) -> Result<BuildReport> { SegmentIndex::build_index(self, segments) }

	fn clear_index(&self) -> Result<()> { SegmentIndex::clear_index(self) }
}

impl SegmentSearch for SegmentIndex {
	fn search(&self, request: &SearchRequest) -> Result<SearchResponse> { SegmentIndex::search(self, request) }

	fn list_works(&self) -> Result<BTreeSet<String>> { SegmentIndex::list_works(self) }

	fn statistics(&self) -> Result<IndexStatistics> { SegmentIndex::statistics(self) }
}

fn facet_counts(open: &OpenIndex) -> Result<Vec<(String, u64)>> {
	let searcher = open.reader.searcher();
	let mut collector = FacetCollector::for_field("work");
	collector.add_facet(Facet::root());
	let counts = searcher.search(&AllQuery, &collector).storage("counting works")?;
	Ok(counts
		.get(Facet::root())
		.map(|(facet, count)| (facet.to_path().last().map(|s| s.to_string()).unwrap_or_default(), count))
		.collect())
}

fn dir_size(dir: &Path) -> u64 {
	walkdir::WalkDir::new(dir)
		.into_iter()
		.filter_map(|e| e.ok())
		.filter(|e| e.file_type().is_file())
		.filter_map(|e| e.metadata().ok())
		.map(|m| m.len())
		.sum()
}

fn progress_bar(len: usize) -> ProgressBar {
	let pb = ProgressBar::new(len as u64);
	let style = ProgressStyle::default_bar()
		.template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({percent}%) {msg}")
		.map(|s| s.progress_chars("#>-"))
		.unwrap_or_else(|_| ProgressStyle::default_bar());
	pb.set_style(style);
	pb
}

/// `<dir>.<suffix>` next to the index directory.
fn sibling(index_dir: &Path, suffix: &str) -> PathBuf {
	let name = index_dir.file_name().map_or_else(|| "index".to_string(), |n| n.to_string_lossy().into_owned());
	index_dir.with_file_name(format!("{}.{}", name, suffix))
}

fn swap_into_place(staging: &Path, target: &Path) -> Result<()> {
	let previous = sibling(target, "previous");
	if previous.exists() { fs::remove_dir_all(&previous)?; }
	if target.exists() { fs::rename(target, &previous)?; }
	fs::rename(staging, target)?;
	if previous.exists() { fs::remove_dir_all(&previous)?; }
	Ok(())
}

/// A crash between the two renames of a swap leaves only `<dir>.previous`.
fn recover_interrupted_swap(target: &Path) -> Result<()> {
	let previous = sibling(target, "previous");
	if !target.exists() && previous.exists() {
		warn!("restoring {} from an interrupted rebuild", target.display());
		fs::rename(&previous, target)?;
	}
	Ok(())
}

/// Cross-process build exclusion: a `<dir>.lock` file holding the owner's pid
/// that exists only while a build or clear runs. A lock whose owner has exited
/// is taken over.
struct BuildLock {
	path: PathBuf,
}

impl BuildLock {
	fn acquire(index_dir: &Path) -> Result<Self> {
		let path = sibling(index_dir, "lock");
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent)?;
		}
		match Self::create(&path) {
			Ok(()) => Ok(Self { path }),
			Err(e) if e.kind() == ErrorKind::AlreadyExists => {
				let Some(pid) = stale_owner(&path) else {
					return Err(Error::IndexLocked(path));
				};
				warn!("taking over build lock {} left by exited process {}", path.display(), pid);
				if let Err(e) = fs::remove_file(&path) {
					if e.kind() != ErrorKind::NotFound {
						return Err(e.into());
					}
				}
				match Self::create(&path) {
					Ok(()) => Ok(Self { path }),
					Err(e) if e.kind() == ErrorKind::AlreadyExists => Err(Error::IndexLocked(path)),
					Err(e) => Err(e.into()),
				}
			}
			Err(e) => Err(e.into()),
		}
	}

	fn create(path: &Path) -> std::io::Result<()> {
		let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
		write!(file, "{}", std::process::id())?;
		file.sync_all()
	}
}

impl Drop for BuildLock {
	fn drop(&mut self) {
		if let Err(e) = fs::remove_file(&self.path) {
			warn!("failed to remove build lock {}: {}", self.path.display(), e);
		}
	}
}

/// Pid recorded in a lock file whose process is gone. A lock that is empty,
/// unreadable or owned by a live process is never stale.
fn stale_owner(path: &Path) -> Option<u32> {
	let pid: u32 = fs::read_to_string(path).ok()?.trim().parse().ok()?;
	(pid != std::process::id() && !process_alive(pid)).then_some(pid)
}

#[cfg(target_os = "linux")]
fn process_alive(pid: u32) -> bool {
	Path::new("/proc").join(pid.to_string()).exists()
}

#[cfg(not(target_os = "linux"))]
fn process_alive(_pid: u32) -> bool {
	true
}
