//! JSON histogram container.
//!
//! A container is a single JSON document mapping object names to histograms.
//! Handles are explicit: [`HistFile::open`] reads, [`HistFile::create`]
//! starts an empty container (replacing any file on [`HistFile::close`]),
//! [`HistFile::update`] loads an existing one for appending.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use ry_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::histogram::Histogram;
use crate::sparse::SparseHistogram;

const FORMAT_TAG: &str = "ryhist-v1";

/// An object stored in a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HistObject {
    /// 1-D histogram.
    Hist1d(Histogram),
    /// N-D sparse histogram.
    Sparse(SparseHistogram),
}

impl HistObject {
    /// Name of the stored object.
    pub fn name(&self) -> &str {
        match self {
            Self::Hist1d(h) => &h.name,
            Self::Sparse(h) => &h.name,
        }
    }

    /// Class name shown by [`HistFile::list_keys`].
    pub fn class_name(&self) -> &'static str {
        match self {
            Self::Hist1d(_) => "Hist1D",
            Self::Sparse(_) => "SparseHist",
        }
    }
}

/// Key listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInfo {
    /// Object name.
    pub name: String,
    /// Object class name (`"Hist1D"` or `"SparseHist"`).
    pub class_name: String,
}

#[derive(Serialize, Deserialize)]
struct Document {
    format: String,
    objects: BTreeMap<String, HistObject>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Read,
    Write,
}

/// Handle on a histogram container.
#[derive(Debug)]
pub struct HistFile {
    path: PathBuf,
    objects: BTreeMap<String, HistObject>,
    mode: Mode,
    dirty: bool,
}

impl HistFile {
    /// Open an existing container read-only.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let objects = read_document(&path)?;
        Ok(Self { path, objects, mode: Mode::Read, dirty: false })
    }

    /// Start an empty writable container at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            objects: BTreeMap::new(),
            mode: Mode::Write,
            dirty: true,
        })
    }

    /// Open a container for appending, starting empty if it does not exist.
    pub fn update(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let objects = if path.exists() { read_document(&path)? } else { BTreeMap::new() };
        Ok(Self { path, objects, mode: Mode::Write, dirty: true })
    }

    /// Path of the container on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// List all stored objects, sorted by name.
    pub fn list_keys(&self) -> Vec<KeyInfo> {
        self.objects
            .iter()
            .map(|(name, obj)| KeyInfo {
                name: name.clone(),
                class_name: obj.class_name().to_string(),
            })
            .collect()
    }

    /// Whether an object named `name` exists.
    pub fn contains(&self, name: &str) -> bool {
        self.objects.contains_key(name)
    }

    /// Get a 1-D histogram by name.
    pub fn get_histogram(&self, name: &str) -> Result<Histogram> {
        match self.objects.get(name) {
            Some(HistObject::Hist1d(h)) => Ok(h.clone()),
            Some(other) => Err(Error::Validation(format!(
                "'{name}' in {} is a {}, not a 1-D histogram",
                self.path.display(),
                other.class_name()
            ))),
            None => Err(Error::NotFound(format!("'{name}' in {}", self.path.display()))),
        }
    }

    /// Get a sparse histogram by name.
    pub fn get_sparse(&self, name: &str) -> Result<SparseHistogram> {
        match self.objects.get(name) {
            Some(HistObject::Sparse(h)) => Ok(h.clone()),
            Some(other) => Err(Error::Validation(format!(
                "'{name}' in {} is a {}, not a sparse histogram",
                self.path.display(),
                other.class_name()
            ))),
            None => Err(Error::NotFound(format!("'{name}' in {}", self.path.display()))),
        }
    }

    /// Store `obj` under its own name, replacing any previous object.
    pub fn write(&mut self, obj: HistObject) -> Result<()> {
        if self.mode == Mode::Read {
            return Err(Error::Validation(format!(
                "{} was opened read-only",
                self.path.display()
            )));
        }
        self.objects.insert(obj.name().to_string(), obj);
        self.dirty = true;
        Ok(())
    }

    /// Store a 1-D histogram under its name.
    pub fn write_histogram(&mut self, h: Histogram) -> Result<()> {
        self.write(HistObject::Hist1d(h))
    }

    /// Flush to disk and release the handle.
    pub fn close(mut self) -> Result<()> {
        self.flush()
    }

    fn flush(&mut self) -> Result<()> {
        if self.mode == Mode::Read || !self.dirty {
            return Ok(());
        }
        let doc = Document { format: FORMAT_TAG.to_string(), objects: self.objects.clone() };
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec(&doc)?)?;
        fs::rename(&tmp, &self.path)?;
        self.dirty = false;
        Ok(())
    }
}

impl Drop for HistFile {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            log::warn!("failed to write {} on drop: {e}", self.path.display());
        }
    }
}

fn read_document(path: &Path) -> Result<BTreeMap<String, HistObject>> {
    let bytes = fs::read(path)?;
    let doc: Document = serde_json::from_slice(&bytes)?;
    if doc.format != FORMAT_TAG {
        return Err(Error::Validation(format!(
            "{}: unsupported container format '{}'",
            path.display(),
            doc.format
        )));
    }
    for (key, obj) in &doc.objects {
        if key != obj.name() {
            return Err(Error::Validation(format!(
                "{}: key '{key}' holds object named '{}'",
                path.display(),
                obj.name()
            )));
        }
        if let HistObject::Hist1d(h) = obj {
            h.validate()?;
        }
    }
    Ok(doc.objects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::Axis;

    fn tmp_path(tag: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("ryhist_{tag}_{}_{nanos}.json", std::process::id()))
    }

    #[test]
    fn create_write_reopen() {
        let path = tmp_path("roundtrip");
        let mut f = HistFile::create(&path).unwrap();
        let mut h = Histogram::new("hist_a", "A", vec![0.0, 1.0, 2.0]).unwrap();
        h.set_bin(1, 7.0, 2.0);
        f.write_histogram(h.clone()).unwrap();
        let axes = vec![Axis::uniform("x", "", 2, 0.0, 1.0).unwrap()];
        f.write(HistObject::Sparse(SparseHistogram::new("hData", "", axes).unwrap())).unwrap();
        f.close().unwrap();

        let f = HistFile::open(&path).unwrap();
        let keys: Vec<String> = f.list_keys().into_iter().map(|k| k.name).collect();
        assert_eq!(keys, vec!["hData".to_string(), "hist_a".to_string()]);
        assert_eq!(f.get_histogram("hist_a").unwrap(), h);
        assert!(f.get_sparse("hData").is_ok());
        assert!(matches!(f.get_histogram("hData"), Err(Error::Validation(_))));
        assert!(matches!(f.get_histogram("nope"), Err(Error::NotFound(_))));
        drop(f);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn create_replaces_and_update_appends() {
        let path = tmp_path("update");
        let mut f = HistFile::create(&path).unwrap();
        f.write_histogram(Histogram::new("a", "", vec![0.0, 1.0]).unwrap()).unwrap();
        f.close().unwrap();

        let mut f = HistFile::update(&path).unwrap();
        f.write_histogram(Histogram::new("b", "", vec![0.0, 1.0]).unwrap()).unwrap();
        f.close().unwrap();
        assert_eq!(HistFile::open(&path).unwrap().list_keys().len(), 2);

        let f = HistFile::create(&path).unwrap();
        f.close().unwrap();
        assert!(HistFile::open(&path).unwrap().list_keys().is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn drop_flushes_writer() {
        let path = tmp_path("drop");
        {
            let mut f = HistFile::create(&path).unwrap();
            f.write_histogram(Histogram::new("a", "", vec![0.0, 1.0]).unwrap()).unwrap();
        }
        assert!(HistFile::open(&path).unwrap().contains("a"));
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn read_only_rejects_writes() {
        let path = tmp_path("ro");
        HistFile::create(&path).unwrap().close().unwrap();
        let mut f = HistFile::open(&path).unwrap();
        assert!(f.write_histogram(Histogram::new("a", "", vec![0.0, 1.0]).unwrap()).is_err());
        drop(f);
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn open_missing_is_io_error() {
        assert!(matches!(HistFile::open(tmp_path("missing")), Err(Error::Io(_))));
    }
}
