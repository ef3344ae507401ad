//! Entries and the record files that hold them.
//!
//! A record folder contains `*.json` files, each an array of objects:
//!
//! ```json
//! [{ "title": "Ada Lovelace", "description": "Ada was ...", "id": 17 }]
//! ```
//!
//! `title`/`name`, `description`/`text` and `id`/`image_id` are accepted
//! interchangeably.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use wordcast_common::error::{WordcastError, WordcastResult};

/// Image extensions tried, in order, when resolving an entry's image.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Name used when a record carries no title.
pub const UNTITLED: &str = "Untitled";

/// One video to produce.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    /// Subject name; also the basis of the output filename.
    pub name: String,
    /// Narration text.
    pub text: String,
    /// Identifier of the paired still image.
    pub image_id: String,
}

impl Entry {
    pub fn new(name: impl Into<String>, text: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            image_id: image_id.into(),
        }
    }

    /// Filesystem-safe output stem.
    pub fn output_stem(&self) -> String {
        sanitize_filename(&self.name)
    }

    /// Output file for this entry inside `output_dir`.
    pub fn output_path(&self, output_dir: &Path, extension: &str) -> PathBuf {
        output_path(output_dir, &self.name, extension)
    }

    /// Paired image inside `image_dir`, if any.
    pub fn resolve_image(&self, image_dir: &Path) -> Option<PathBuf> {
        resolve_image(image_dir, &self.image_id)
    }
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default, alias = "name")]
    title: Option<String>,
    #[serde(default, alias = "text")]
    description: Option<String>,
    #[serde(default, alias = "image_id")]
    id: Option<serde_json::Value>,
}

impl TryFrom<RawEntry> for Entry {
    type Error = String;

    fn try_from(raw: RawEntry) -> Result<Self, Self::Error> {
        let name = raw.title.unwrap_or_else(|| UNTITLED.to_string());
        let image_id = match raw.id {
            None | Some(serde_json::Value::Null) => sanitize_filename(&name),
            Some(serde_json::Value::String(s)) => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            Some(other) => return Err(format!("unsupported id value {other} for '{name}'")),
        };
        Ok(Entry {
            name,
            text: raw.description.unwrap_or_default(),
            image_id,
        })
    }
}

/// Entries loaded from one record file.
#[derive(Debug, Clone)]
pub struct RecordFile {
    pub path: PathBuf,
    pub entries: Vec<Entry>,
}

/// All record files of a folder, in file-name order.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub files: Vec<RecordFile>,
    /// Files that could not be read or parsed, with the reason.
    pub failures: Vec<(PathBuf, String)>,
}

impl RecordSet {
    /// Load every `*.json` file in `dir`.
    ///
    /// A file that fails to parse is recorded in `failures` and skipped; the
    /// remaining files still load. A folder without any JSON file is an error.
    pub fn load(dir: impl AsRef<Path>) -> WordcastResult<Self> {
        let dir = dir.as_ref();
        let paths = list_record_files(dir)?;
        if paths.is_empty() {
            return Err(WordcastError::records(format!(
                "No JSON files found in {}",
                dir.display()
            )));
        }

        let mut set = RecordSet::default();
        for path in paths {
            match load_record_file(&path) {
                Ok(entries) => {
                    tracing::debug!(path = %path.display(), entries = entries.len(), "Loaded record file");
                    set.files.push(RecordFile { path, entries });
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable record file");
                    set.failures.push((path, e.to_string()));
                }
            }
        }
        Ok(set)
    }

    /// All entries across files, in processing order.
    pub fn entries(&self) -> impl Iterator<Item = &Entry> {
        self.files.iter().flat_map(|f| f.entries.iter())
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.files.iter().map(|f| f.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sorted list of `*.json` files directly inside `dir`.
pub fn list_record_files(dir: &Path) -> WordcastResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(WordcastError::FileNotFound {
            path: dir.to_path_buf(),
        });
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Parse one record file.
pub fn load_record_file(path: &Path) -> WordcastResult<Vec<Entry>> {
    let content = std::fs::read_to_string(path)?;
    let raw: Vec<RawEntry> = serde_json::from_str(&content).map_err(|e| {
        WordcastError::records(format!("Parse error in {}: {e}", path.display()))
    })?;

    raw.into_iter()
        .map(Entry::try_from)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| WordcastError::records(format!("{}: {e}", path.display())))
}

/// Map every character that is not alphanumeric to `_`.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect()
}

/// First existing `<dir>/<id>.<ext>` over [`IMAGE_EXTENSIONS`].
pub fn resolve_image(dir: &Path, id: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{id}.{ext}")))
        .find(|path| path.is_file())
}

/// `<dir>/<sanitized name>.<extension>`.
pub fn output_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    dir.join(format!("{}.{extension}", sanitize_filename(name)))
}

/// Entries whose output names coincide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    /// The shared sanitized stem.
    pub stem: String,
    /// Indices into the input slice, in input order. The first one wins.
    pub indices: Vec<usize>,
}

/// Group entries that would write to the same output file.
pub fn find_name_collisions<'a>(entries: impl IntoIterator<Item = &'a Entry>) -> Vec<NameCollision> {
    let mut by_stem: HashMap<String, Vec<usize>> = HashMap::new();
    let mut order = Vec::new();
    for (idx, entry) in entries.into_iter().enumerate() {
        let stem = entry.output_stem();
        let slot = by_stem.entry(stem.clone()).or_default();
        if slot.is_empty() {
            order.push(stem);
        }
        slot.push(idx);
    }

    order
        .into_iter()
        .filter_map(|stem| {
            let indices = by_stem.remove(&stem)?;
            (indices.len() > 1).then_some(NameCollision { stem, indices })
        })
        .collect()
}
