use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Document;
use crate::storage::layout::StorageLayout;

pub const SNAPSHOT_FORMAT: u32 = 1;

/// Everything needed to restore the document store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub format: u32,
    pub saved_at: DateTime<Utc>,
    pub documents: Vec<Document>,
}

impl Snapshot {
    pub fn new(documents: Vec<Document>) -> Self {
        Snapshot {
            format: SNAPSHOT_FORMAT,
            saved_at: Utc::now(),
            documents,
        }
    }

    /// Load snapshot from disk, `None` when nothing was saved yet
    pub fn load(storage: &StorageLayout) -> Result<Option<Self>> {
        let path = storage.documents_path();
        if !path.exists() {
            return Ok(None);
        }

        let reader = BufReader::new(File::open(&path)?);
        let snapshot: Snapshot = serde_json::from_reader(reader)?;
        if snapshot.format != SNAPSHOT_FORMAT {
            return Err(Error::new(
                ErrorKind::Parse,
                format!("unsupported snapshot format {} in {}", snapshot.format, path.display()),
            ));
        }

        debug!(path = %path.display(), documents = snapshot.documents.len(), "snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Save snapshot to disk. The file is replaced atomically so a crash
    /// mid-write leaves the previous snapshot intact.
    pub fn save(&self, storage: &StorageLayout) -> Result<()> {
        let path = storage.documents_path();
        write_atomic(&storage.base_dir, &path, |writer| {
            serde_json::to_writer(writer, self)?;
            Ok(())
        })?;

        debug!(path = %path.display(), documents = self.documents.len(), "snapshot saved");
        Ok(())
    }
}

/// Writes through a temp file in `dir` and renames it over `path`
pub fn write_atomic<F>(dir: &Path, path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&mut tempfile::NamedTempFile>) -> Result<()>,
{
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(&mut tmp);
        write(&mut writer)?;
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{DocId, FieldValue};

    #[test]
    fn missing_snapshot_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path()).unwrap();
        assert!(Snapshot::load(&layout).unwrap().is_none());
    }

    #[test]
    fn saved_documents_come_back() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path()).unwrap();
        let doc = Document::new(DocId::from("d1"), "calls")
            .with_field("title", FieldValue::text("Standup"))
            .with_field("minutes", FieldValue::Number(15.0));

        Snapshot::new(vec![doc.clone()]).save(&layout).unwrap();
        let loaded = Snapshot::load(&layout).unwrap().unwrap();
        assert_eq!(loaded.documents, vec![doc]);
    }

    #[test]
    fn corrupt_snapshot_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StorageLayout::new(dir.path()).unwrap();
        std::fs::write(layout.documents_path(), b"{not json").unwrap();
        let err = Snapshot::load(&layout).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Parse);
    }
}
