//! Document stream from JSON / JSONL files.
//!
//! Each record is an object with an `id` (string or number) and `title` /
//! `body` (or `text`) fields. Internal doc ids are assigned in stream order.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use spimi_core::{DocId, Document, InputError};
use walkdir::WalkDir;

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize)]
struct InputDoc {
    id: Option<Value>,
    #[serde(default)]
    title: String,
    #[serde(default, alias = "text")]
    body: String,
}

#[derive(Debug)]
pub struct InputRecord {
    pub external_id: String,
    pub doc: Document,
}

/// `.json` / `.jsonl` files under `input` (or `input` itself), in path order.
pub fn collect_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        anyhow::bail!("input path not found: {}", input.display());
    }
    Ok(files)
}

type Records = Box<dyn Iterator<Item = Result<Value>>>;

/// Lazily reads records file by file; nothing is kept after it is yielded.
pub struct DocumentStream {
    files: std::vec::IntoIter<PathBuf>,
    current: Option<Records>,
    position: usize,
    next_doc_id: DocId,
    doc_id_map: HashMap<String, DocId>,
}

impl DocumentStream {
    pub fn open(input: &Path) -> Result<Self> {
        let files = collect_files(input)?;
        tracing::debug!(files = files.len(), "opened document stream");
        Ok(Self { files: files.into_iter(), current: None, position: 0, next_doc_id: 0, doc_id_map: HashMap::new() })
    }

    /// External id → internal id for every document yielded so far.
    pub fn into_doc_id_map(self) -> HashMap<String, DocId> {
        self.doc_id_map
    }

    fn open_file(path: &Path) -> Result<Records> {
        if path.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            let reader = BufReader::new(File::open(path)?);
            let lines = reader.lines().filter_map(|line| match line {
                Ok(l) if l.trim().is_empty() => None,
                Ok(l) => Some(serde_json::from_str::<Value>(&l).map_err(anyhow::Error::from)),
                Err(e) => Some(Err(e.into())),
            });
            Ok(Box::new(lines))
        } else {
            let reader = BufReader::new(File::open(path)?);
            let json: Value = serde_json::from_reader(reader)?;
            match json {
                Value::Array(arr) => Ok(Box::new(arr.into_iter().map(Ok))),
                obj @ Value::Object(_) => Ok(Box::new(std::iter::once(Ok(obj)))),
                _ => Ok(Box::new(std::iter::empty())),
            }
        }
    }

    fn to_record(&mut self, value: Value) -> Result<InputRecord> {
        let position = self.position;
        let doc: InputDoc = serde_json::from_value(value)
            .map_err(|e| input_error(InputError::Malformed { position, reason: e.to_string() }))?;
        let external_id = match doc.id {
            Some(Value::String(s)) if !s.trim().is_empty() => s,
            Some(Value::Number(n)) => n.to_string(),
            None | Some(Value::Null) | Some(Value::String(_)) => return Err(input_error(InputError::MissingId { position })),
            Some(other) => {
                let reason = format!("id must be a string or number, got {other}");
                return Err(input_error(InputError::Malformed { position, reason }));
            }
        };
        if self.doc_id_map.contains_key(&external_id) {
            return Err(input_error(InputError::DuplicateExternalId(external_id)));
        }
        let doc_id = self.next_doc_id;
        self.next_doc_id += 1;
        self.doc_id_map.insert(external_id.clone(), doc_id);

        let text = if doc.title.is_empty() { doc.body } else { format!("{} {}", doc.title, doc.body) };
        Ok(InputRecord { external_id, doc: Document::new(doc_id, text) })
    }
}

fn input_error(e: InputError) -> anyhow::Error {
    spimi_core::Error::from(e).into()
}

impl Iterator for DocumentStream {
    type Item = Result<InputRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(records) = self.current.as_mut() {
                if let Some(value) = records.next() {
                    let item = value.and_then(|v| self.to_record(v));
                    self.position += 1;
                    return Some(item);
                }
                self.current = None;
            }
            let path = self.files.next()?;
            match Self::open_file(&path) {
                Ok(records) => self.current = Some(records),
                Err(e) => return Some(Err(e.context(format!("reading {}", path.display())))),
            }
        }
    }
}
