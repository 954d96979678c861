//! Single-pass in-memory indexing.
//!
//! Documents stream into a per-block hash map of term → postings. When the
//! block budget is reached the block is sorted by term, handed to a
//! [`BlockStore`], and a brand-new map takes its place. Capacity is never
//! carried over between blocks, so later blocks pay the full allocation
//! cost again; the per-block timings in [`SpimiReport`] make that visible.
//! Completed blocks are combined by a k-way merge on term.

use crate::config::BlockBudget;
use crate::error::{InputError, Result};
use crate::index::{union_postings, DocId, Document, InvertedIndex, Posting, PostingsList};
use crate::persist::{write_block, BlockFileReader};
use crate::tokenizer::Analyzer;
use serde::Serialize;
use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// A term and its postings inside one block, postings ascending by doc id.
pub type BlockEntry = (String, Vec<Posting>);

#[derive(Debug, Clone, Serialize)]
pub struct BlockStats {
    pub block_id: usize,
    pub docs: usize,
    pub terms: usize,
    pub postings: usize,
    /// First and last document of the block in stream order.
    pub first_doc: DocId,
    pub last_doc: DocId,
    pub elapsed: Duration,
}

impl BlockStats {
    /// Postings accumulated per second.
    pub fn throughput(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 { self.postings as f64 / secs } else { f64::INFINITY }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SpimiReport {
    pub blocks: Vec<BlockStats>,
    pub accumulate_elapsed: Duration,
    pub merge_elapsed: Duration,
}

impl SpimiReport {
    /// First-block throughput over last-block throughput; above 1.0 means later blocks ran slower.
    pub fn slowdown(&self) -> Option<f64> {
        let first = self.blocks.first()?;
        let last = self.blocks.last()?;
        if self.blocks.len() < 2 || first.postings == 0 || last.postings == 0 {
            return None;
        }
        let (a, b) = (first.throughput(), last.throughput());
        if a.is_finite() && b.is_finite() && b > 0.0 { Some(a / b) } else { None }
    }

    pub fn total_elapsed(&self) -> Duration { self.accumulate_elapsed + self.merge_elapsed }
}

/// Block files written during one build. Whatever is still on disk when this
/// is dropped gets removed, so a failed build leaves nothing behind.
#[derive(Debug)]
pub struct SpillDir {
    dir: PathBuf,
    files: Vec<PathBuf>,
    /// Only a directory this build created is removed with the files.
    created: bool,
}

impl SpillDir {
    fn create(dir: PathBuf) -> Result<Self> {
        let created = !dir.exists();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir, files: Vec::new(), created })
    }

    pub fn dir(&self) -> &Path { &self.dir }

    pub fn files(&self) -> &[PathBuf] { &self.files }

    fn remove(&mut self) -> std::io::Result<()> {
        for file in self.files.drain(..) {
            match fs::remove_file(&file) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        if std::mem::take(&mut self.created) {
            match fs::remove_dir(&self.dir) {
                Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
                _ => {}
            }
        }
        Ok(())
    }
}

impl Drop for SpillDir {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::warn!(dir = %self.dir.display(), error = %e, "could not remove spilled blocks");
        }
    }
}

/// Where flushed blocks go until the merge.
#[derive(Debug)]
pub enum BlockStore {
    Memory(Vec<Vec<BlockEntry>>),
    Disk(SpillDir),
}

impl BlockStore {
    pub fn in_memory() -> Self { BlockStore::Memory(Vec::new()) }

    /// Spill every block to `dir` as a bincode file.
    pub fn spill_to(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(BlockStore::Disk(SpillDir::create(dir.as_ref().to_path_buf())?))
    }

    pub fn len(&self) -> usize {
        match self {
            BlockStore::Memory(blocks) => blocks.len(),
            BlockStore::Disk(spill) => spill.files.len(),
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    fn put(&mut self, entries: Vec<BlockEntry>) -> Result<()> {
        match self {
            BlockStore::Memory(blocks) => blocks.push(entries),
            BlockStore::Disk(spill) => {
                let path = spill.dir.join(format!("block-{:06}.bin", spill.files.len()));
                // Registered first so a half-written file is cleaned up too.
                spill.files.push(path.clone());
                write_block(&path, &entries)?;
            }
        }
        Ok(())
    }

    fn into_cursors(self) -> Result<(Vec<BlockCursor>, Option<SpillDir>)> {
        match self {
            BlockStore::Memory(blocks) => Ok((blocks.into_iter().map(|b| BlockCursor::Memory(b.into_iter())).collect(), None)),
            BlockStore::Disk(spill) => {
                let cursors = spill.files.iter().map(|f| BlockFileReader::open(f).map(BlockCursor::Disk)).collect::<Result<Vec<_>>>()?;
                Ok((cursors, Some(spill)))
            }
        }
    }
}

enum BlockCursor {
    Memory(std::vec::IntoIter<BlockEntry>),
    Disk(BlockFileReader),
}

impl BlockCursor {
    fn next_entry(&mut self) -> Result<Option<BlockEntry>> {
        match self {
            BlockCursor::Memory(it) => Ok(it.next()),
            BlockCursor::Disk(reader) => reader.next_entry(),
        }
    }
}

/// Accumulates documents into budget-bounded blocks.
pub struct BlockAccumulator<'a> {
    analyzer: &'a Analyzer,
    budget: BlockBudget,
    store: BlockStore,
    block: HashMap<String, Vec<Posting>>,
    block_docs: usize,
    block_first: DocId,
    block_last: DocId,
    block_postings: usize,
    block_started: Instant,
    seen: HashSet<DocId>,
    stats: Vec<BlockStats>,
}

impl<'a> BlockAccumulator<'a> {
    pub fn new(analyzer: &'a Analyzer, budget: BlockBudget, store: BlockStore) -> Result<Self> {
        budget.validate()?;
        Ok(Self {
            analyzer,
            budget,
            store,
            block: HashMap::new(),
            block_docs: 0,
            block_first: 0,
            block_last: 0,
            block_postings: 0,
            block_started: Instant::now(),
            seen: HashSet::new(),
            stats: Vec::new(),
        })
    }

    pub fn add_document(&mut self, doc: &Document) -> Result<()> {
        if !self.seen.insert(doc.id) {
            return Err(InputError::DuplicateDocId(doc.id).into());
        }
        if self.block_docs == 0 {
            self.block_started = Instant::now();
            self.block_first = doc.id;
        }
        let analyzer = self.analyzer;
        for term in analyzer.terms(&doc.text) {
            let list = self.block.entry(term).or_default();
            match list.last_mut() {
                Some(last) if last.doc_id == doc.id => last.tf += 1,
                _ => {
                    list.push(Posting { doc_id: doc.id, tf: 1 });
                    self.block_postings += 1;
                }
            }
        }
        self.block_docs += 1;
        self.block_last = doc.id;
        if self.budget.is_exhausted(self.block_docs, self.block.len(), self.block_postings) {
            self.flush()?;
        }
        Ok(())
    }

    /// Blocks completed so far.
    pub fn blocks(&self) -> &[BlockStats] { &self.stats }

    fn flush(&mut self) -> Result<()> {
        if self.block_docs == 0 {
            return Ok(());
        }
        // Take the map by value; the next block starts from an empty, unallocated one.
        let block = std::mem::take(&mut self.block);
        let mut entries: Vec<BlockEntry> = block.into_iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        for (_, postings) in entries.iter_mut() {
            if !postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id) {
                postings.sort_unstable_by_key(|p| p.doc_id);
            }
        }

        let stats = BlockStats {
            block_id: self.stats.len(),
            docs: self.block_docs,
            terms: entries.len(),
            postings: self.block_postings,
            first_doc: self.block_first,
            last_doc: self.block_last,
            elapsed: self.block_started.elapsed(),
        };
        tracing::debug!(block_id = stats.block_id, docs = stats.docs, terms = stats.terms, postings = stats.postings, elapsed_us = stats.elapsed.as_micros() as u64, "flushed block");
        self.store.put(entries)?;
        self.stats.push(stats);
        self.block_postings = 0;
        self.block_docs = 0;
        Ok(())
    }

    /// Flush the open block and hand back everything the merge needs.
    pub fn finish(mut self) -> Result<(BlockStore, Vec<BlockStats>, u32)> {
        self.flush()?;
        Ok((self.store, self.stats, self.seen.len() as u32))
    }
}

/// k-way merge of term-sorted blocks into the final index. Spilled block files
/// are removed afterwards whether or not the merge succeeds.
pub fn merge_blocks(store: BlockStore, num_docs: u32) -> Result<InvertedIndex> {
    let (mut cursors, spilled) = store.into_cursors()?;
    let mut heads: Vec<Option<Vec<Posting>>> = vec![None; cursors.len()];
    let mut heap: BinaryHeap<Reverse<(String, usize)>> = BinaryHeap::with_capacity(cursors.len());

    for (i, cursor) in cursors.iter_mut().enumerate() {
        if let Some((term, postings)) = cursor.next_entry()? {
            heads[i] = Some(postings);
            heap.push(Reverse((term, i)));
        }
    }

    let mut terms: BTreeMap<String, PostingsList> = BTreeMap::new();
    while let Some(Reverse((term, i))) = heap.pop() {
        let mut postings = heads[i].take().unwrap_or_default();
        advance(&mut cursors[i], &mut heads[i], &mut heap, i)?;

        while heap.peek().is_some_and(|Reverse((next, _))| *next == term) {
            let Some(Reverse((_, j))) = heap.pop() else { break };
            let other = heads[j].take().unwrap_or_default();
            // Blocks cover disjoint documents; plain concatenation keeps order when they arrive in id order.
            match (postings.last(), other.first()) {
                (Some(a), Some(b)) if a.doc_id < b.doc_id => postings.extend(other),
                (None, _) => postings = other,
                _ => postings = union_postings(&postings, &other),
            }
            advance(&mut cursors[j], &mut heads[j], &mut heap, j)?;
        }
        terms.insert(term, PostingsList::from_sorted(postings));
    }

    drop(cursors);
    if let Some(mut spill) = spilled {
        spill.remove()?;
    }
    Ok(InvertedIndex::from_parts(terms, num_docs))
}

fn advance(
    cursor: &mut BlockCursor,
    head: &mut Option<Vec<Posting>>,
    heap: &mut BinaryHeap<Reverse<(String, usize)>>,
    i: usize,
) -> Result<()> {
    if let Some((term, postings)) = cursor.next_entry()? {
        *head = Some(postings);
        heap.push(Reverse((term, i)));
    }
    Ok(())
}

/// Accumulate then merge, recording per-block statistics.
pub fn build_spimi_with_report<I>(analyzer: &Analyzer, budget: BlockBudget, store: BlockStore, docs: I) -> Result<(InvertedIndex, SpimiReport)>
where
    I: IntoIterator<Item = Document>,
{
    let started = Instant::now();
    let mut acc = BlockAccumulator::new(analyzer, budget, store)?;
    for doc in docs {
        acc.add_document(&doc)?;
    }
    let (store, blocks, num_docs) = acc.finish()?;
    let accumulate_elapsed = started.elapsed();

    let merge_started = Instant::now();
    let num_blocks = store.len();
    let index = merge_blocks(store, num_docs)?;
    let merge_elapsed = merge_started.elapsed();

    tracing::info!(num_blocks, num_terms = index.num_terms(), num_docs, merge_ms = merge_elapsed.as_millis() as u64, "spimi build complete");
    Ok((index, SpimiReport { blocks, accumulate_elapsed, merge_elapsed }))
}

/// In-memory SPIMI build.
pub fn build_spimi<I>(analyzer: &Analyzer, budget: BlockBudget, docs: I) -> Result<InvertedIndex>
where
    I: IntoIterator<Item = Document>,
{
    build_spimi_with_report(analyzer, budget, BlockStore::in_memory(), docs).map(|(index, _)| index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn docs() -> Vec<Document> {
        vec![
            Document::new(1, "apple banana"),
            Document::new(2, "banana cherry banana"),
            Document::new(3, "apple"),
            Document::new(4, "durian"),
        ]
    }

    #[test]
    fn one_doc_per_block() {
        let analyzer = Analyzer::default();
        let (index, report) = build_spimi_with_report(&analyzer, BlockBudget::docs(1), BlockStore::in_memory(), docs()).unwrap();
        assert_eq!(report.blocks.len(), 4);
        assert_eq!(index.get("banana").unwrap().postings(), &[Posting { doc_id: 1, tf: 1 }, Posting { doc_id: 2, tf: 2 }]);
        assert_eq!(index.get("apple").unwrap().doc_ids().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(index.num_docs(), 4);
    }

    #[test]
    fn term_budget_flushes() {
        let analyzer = Analyzer::default();
        let (_, report) = build_spimi_with_report(&analyzer, BlockBudget::terms(2), BlockStore::in_memory(), docs()).unwrap();
        // {apple, banana} | {banana, cherry} | {apple, durian}
        assert_eq!(report.blocks.len(), 3);
        assert!(report.blocks.iter().all(|b| b.terms <= 2));
    }

    #[test]
    fn out_of_order_ids_still_sorted() {
        let analyzer = Analyzer::default();
        let docs = vec![Document::new(9, "x"), Document::new(3, "x"), Document::new(5, "x y")];
        let index = build_spimi(&analyzer, BlockBudget::docs(2), docs).unwrap();
        assert_eq!(index.get("x").unwrap().doc_ids().collect::<Vec<_>>(), vec![3, 5, 9]);
    }

    #[test]
    fn zero_budget_rejected_before_reading() {
        let analyzer = Analyzer::default();
        let err = BlockAccumulator::new(&analyzer, BlockBudget::terms(0), BlockStore::in_memory()).err().unwrap();
        assert!(matches!(err, Error::ResourceExhaustion { budget: "max_terms" }));
    }

    #[test]
    fn spilled_blocks_merge_and_clean_up() {
        let dir = tempfile::tempdir().unwrap();
        let analyzer = Analyzer::default();
        let store = BlockStore::spill_to(dir.path().join("blocks")).unwrap();
        let (index, report) = build_spimi_with_report(&analyzer, BlockBudget::docs(2), store, docs()).unwrap();
        assert_eq!(report.blocks.len(), 2);
        assert_eq!(index, build_spimi(&analyzer, BlockBudget::unbounded(), docs()).unwrap());
        assert!(!dir.path().join("blocks").exists());
    }

    #[test]
    fn failed_build_removes_spilled_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let blocks = dir.path().join("blocks");
        let analyzer = Analyzer::default();
        let store = BlockStore::spill_to(&blocks).unwrap();
        let mut acc = BlockAccumulator::new(&analyzer, BlockBudget::docs(1), store).unwrap();
        acc.add_document(&Document::new(1, "apple")).unwrap();
        acc.add_document(&Document::new(2, "banana")).unwrap();
        assert_eq!(fs::read_dir(&blocks).unwrap().count(), 2);
        assert!(acc.add_document(&Document::new(1, "again")).is_err());
        drop(acc);
        assert!(!blocks.exists());
    }

    #[test]
    fn existing_spill_dir_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("keep.txt"), "x").unwrap();
        let analyzer = Analyzer::default();
        let store = BlockStore::spill_to(dir.path()).unwrap();
        build_spimi_with_report(&analyzer, BlockBudget::docs(1), store, docs()).unwrap();
        let left: Vec<_> = fs::read_dir(dir.path()).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(left, vec![std::ffi::OsString::from("keep.txt")]);
    }

    #[test]
    fn block_stats_record_doc_range() {
        let analyzer = Analyzer::default();
        let (_, report) = build_spimi_with_report(&analyzer, BlockBudget::docs(3), BlockStore::in_memory(), docs()).unwrap();
        let ranges: Vec<(DocId, DocId, usize)> = report.blocks.iter().map(|b| (b.first_doc, b.last_doc, b.docs)).collect();
        assert_eq!(ranges, vec![(1, 3, 3), (4, 4, 1)]);
    }

    #[test]
    fn slowdown_needs_two_blocks() {
        let report = SpimiReport::default();
        assert!(report.slowdown().is_none());
    }
}
