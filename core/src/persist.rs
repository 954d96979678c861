use crate::config::IndexConfig;
use crate::error::Result;
use crate::spimi::BlockEntry;
use crate::{DocId, InvertedIndex};
use bincode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

pub const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: usize,
    pub num_postings: usize,
    /// `traditional` or `spimi`.
    pub strategy: String,
    /// Configuration the index was built with; queries must analyze terms the same way.
    pub config: IndexConfig,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn index(&self) -> PathBuf { self.root.join("index.bin") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
    fn doc_id_map(&self) -> PathBuf { self.root.join("doc_id_map.bin") }
    pub fn blocks_dir(&self) -> PathBuf { self.root.join("blocks") }
}

pub fn save_index(paths: &IndexPaths, index: &InvertedIndex) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = BufWriter::new(File::create(paths.index())?);
    bincode::serialize_into(&mut f, index)?;
    f.flush()?;
    Ok(())
}

pub fn load_index(paths: &IndexPaths) -> Result<InvertedIndex> {
    let f = BufReader::new(File::open(paths.index())?);
    let index = bincode::deserialize_from(f)?;
    Ok(index)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

/// External document id (as it appeared in the input) → internal `DocId`.
pub fn save_doc_id_map(paths: &IndexPaths, map: &HashMap<String, DocId>) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.doc_id_map())?;
    let bytes = bincode::serialize(map)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_doc_id_map(paths: &IndexPaths) -> Result<HashMap<String, DocId>> {
    let mut f = File::open(paths.doc_id_map())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let map = bincode::deserialize(&buf)?;
    Ok(map)
}

/// Everything a query process needs: the index, how it was built, and the id map.
pub fn load_all(paths: &IndexPaths) -> Result<(InvertedIndex, MetaFile, HashMap<String, DocId>)> {
    let index = load_index(paths)?;
    let meta = load_meta(paths)?;
    let map = load_doc_id_map(paths)?;
    Ok((index, meta, map))
}

/// Block file layout: entry count (u64), then that many `(term, postings)` records.
pub fn write_block(path: &Path, entries: &[BlockEntry]) -> Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    bincode::serialize_into(&mut w, &(entries.len() as u64))?;
    for entry in entries {
        bincode::serialize_into(&mut w, entry)?;
    }
    w.flush()?;
    Ok(())
}

/// Streams a block file one entry at a time.
pub struct BlockFileReader {
    reader: BufReader<File>,
    remaining: u64,
}

impl BlockFileReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let remaining: u64 = bincode::deserialize_from(&mut reader)?;
        Ok(Self { reader, remaining })
    }

    pub fn next_entry(&mut self) -> Result<Option<BlockEntry>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let entry = bincode::deserialize_from(&mut self.reader)?;
        Ok(Some(entry))
    }
}
