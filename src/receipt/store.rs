//! Append-only receipt stores.
//!
//! The `ReceiptStore` trait exposes reads and `append` only; nothing can
//! rewrite or drop a committed receipt.

use crate::core::{Error, Result};
use crate::receipt::chain::verify_chain;
use crate::receipt::record::Receipt;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Core trait for receipt storage.
pub trait ReceiptStore {
    /// All committed receipts, oldest first.
    fn receipts(&self) -> &[Receipt];

    /// Append a receipt and make it durable.
    ///
    /// On error the store is left exactly as it was before the call.
    fn append(&mut self, receipt: Receipt) -> Result<()>;

    /// Number of committed receipts.
    fn len(&self) -> usize {
        self.receipts().len()
    }

    /// Whether no receipt has been committed yet.
    fn is_empty(&self) -> bool {
        self.receipts().is_empty()
    }

    /// Most recent receipt.
    fn last(&self) -> Option<&Receipt> {
        self.receipts().last()
    }
}

/// In-memory store, lost when dropped.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    receipts: Vec<Receipt>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ReceiptStore for MemoryStore {
    fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    fn append(&mut self, receipt: Receipt) -> Result<()> {
        self.receipts.push(receipt);
        Ok(())
    }
}

/// Store persisted as one JSON array, rewritten in full on every append.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    receipts: Vec<Receipt>,
}

impl JsonFileStore {
    /// Open a store, loading any receipts already at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let receipts = Self::load(&path)?;
        info!(path = %path.display(), receipts = receipts.len(), "receipt store opened");
        Ok(Self { path, receipts })
    }

    /// Open a store and refuse it if the loaded chain does not verify.
    pub fn open_verified(path: impl AsRef<Path>) -> Result<Self> {
        let store = Self::open(path)?;
        let verification = verify_chain(&store.receipts)?;
        if !verification.valid {
            let index = verification.first_invalid_index.unwrap_or(0);
            warn!(
                path = %store.path.display(),
                index,
                fault = ?verification.fault,
                "receipt chain failed verification"
            );
            return Err(Error::ChainIntegrityViolated(index));
        }
        Ok(store)
    }

    /// Read receipts from `path`. A missing file is an empty log.
    pub fn load(path: &Path) -> Result<Vec<Receipt>> {
        if !path.exists() {
            debug!(path = %path.display(), "no receipt file, starting a fresh chain");
            return Ok(Vec::new());
        }
        let data = fs::read_to_string(path)
            .map_err(|e| Error::Persistence(format!("read {}: {}", path.display(), e)))?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Location of the receipt file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Rewrite the whole file via a sibling temp file and a rename.
    fn persist(&self) -> Result<()> {
        let data = to_indented_json(&self.receipts)?;
        let tmp = self.temp_path();

        let written = fs::write(&tmp, &data).and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(Error::Persistence(format!(
                "write {}: {}",
                self.path.display(),
                e
            )));
        }
        Ok(())
    }
}

impl ReceiptStore for JsonFileStore {
    fn receipts(&self) -> &[Receipt] {
        &self.receipts
    }

    fn append(&mut self, receipt: Receipt) -> Result<()> {
        self.receipts.push(receipt);
        if let Err(e) = self.persist() {
            self.receipts.pop();
            warn!(path = %self.path.display(), error = %e, "receipt append rolled back");
            return Err(e);
        }
        debug!(path = %self.path.display(), receipts = self.receipts.len(), "receipts persisted");
        Ok(())
    }
}

/// JSON with four-space indentation.
fn to_indented_json<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::receipt::chain::HashMode;
    use crate::receipt::record::tests::sample_receipt;
    use tempfile::tempdir;

    fn chained(store: &impl ReceiptStore, description: &str) -> Receipt {
        let mut receipt = sample_receipt();
        receipt.proposal.description = description.to_string();
        if let Some(last) = store.last() {
            receipt.timestamp = receipt.timestamp.max(last.timestamp);
        }
        receipt.previous_hash = HashMode::Chained.link_after(store.last());
        receipt.seal().unwrap()
    }

    #[test]
    fn test_memory_store_append() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        let receipt = chained(&store, "first");
        store.append(receipt.clone()).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.last(), Some(&receipt));
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("receipts.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_append_then_reload_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("receipts.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        for i in 0..3 {
            let receipt = chained(&store, &format!("proposal {}", i));
            store.append(receipt).unwrap();
        }

        let reopened = JsonFileStore::open_verified(&path).unwrap();
        assert_eq!(reopened.receipts(), store.receipts());
        assert!(!dir.path().join("receipts.json.tmp").exists());
    }

    #[test]
    fn test_file_is_indented_array() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("receipts.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        let receipt = chained(&store, "indent");
        store.append(receipt).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("[\n    {"));
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_write_rolls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("receipts.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        let receipt = chained(&store, "doomed");
        let err = store.append(receipt).unwrap_err();

        assert!(matches!(err, Error::Persistence(_)));
        assert!(store.is_empty());
        assert!(!path.exists());
    }

    #[test]
    fn test_open_verified_rejects_tampered_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("receipts.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        for i in 0..2 {
            let receipt = chained(&store, &format!("proposal {}", i));
            store.append(receipt).unwrap();
        }

        let mut value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        value[1]["approved"] = serde_json::json!(false);
        fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

        assert!(JsonFileStore::open(&path).is_ok());
        let err = JsonFileStore::open_verified(&path).unwrap_err();
        assert!(matches!(err, Error::ChainIntegrityViolated(1)));
    }

    #[test]
    fn test_malformed_file_is_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("receipts.json");
        fs::write(&path, "not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(Error::Serialization(_))
        ));
    }
}
