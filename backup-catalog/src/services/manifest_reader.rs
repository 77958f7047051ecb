//! Reads the `manifest.json` entry embedded in a backup archive.
//!
//! Only the container's central directory and the manifest entry itself are
//! read; the rest of the archive is never decompressed. Two manifest schemas
//! exist on disk:
//!
//! - checksum-only: `{ "timestamp", "checksums": { path: checksum } }`, with an
//!   optional aggregate `size`
//! - sized: `{ "timestamp", "size", "files": { path: { "checksum", "size" } } }`
//!
//! The schema is detected once per manifest and normalized by one function
//! per variant. Content that parses as JSON but has the wrong shape yields a
//! degraded record instead of an error.

use crate::error::{CatalogError, Result};
use crate::models::{ArchiveRecord, FileEntry};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Upper bound for the manifest entry's uncompressed size.
pub const MAX_MANIFEST_BYTES: u64 = 16 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVariant {
    Checksums,
    Sized,
}

#[derive(Debug, Deserialize)]
struct ChecksumManifest {
    timestamp: String,
    checksums: BTreeMap<String, String>,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SizedManifest {
    timestamp: String,
    files: BTreeMap<String, SizedManifestFile>,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SizedManifestFile {
    checksum: String,
    size: u64,
}

/// Identifies the manifest schema from its top-level keys.
pub fn detect_schema(raw: &Value) -> Option<SchemaVariant> {
    let obj = raw.as_object()?;
    if obj.contains_key("files") {
        Some(SchemaVariant::Sized)
    } else if obj.contains_key("checksums") {
        Some(SchemaVariant::Checksums)
    } else {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct ManifestReader {
    max_manifest_bytes: Option<u64>,
}

impl ManifestReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_manifest_bytes(mut self, limit: u64) -> Self {
        self.max_manifest_bytes = Some(limit);
        self
    }

    fn limit(&self) -> u64 {
        self.max_manifest_bytes.unwrap_or(MAX_MANIFEST_BYTES)
    }

    /// Reads one archive's manifest and normalizes it.
    ///
    /// Fails only when the container cannot be opened, has no manifest entry,
    /// or the entry is not JSON. Malformed manifest content degrades.
    pub fn read_manifest(&self, container: &Path) -> Result<ArchiveRecord> {
        let bytes = self.read_manifest_bytes(container)?;
        let raw: Value = serde_json::from_slice(&bytes).map_err(|e| {
            CatalogError::archive_unreadable(container, format!("{MANIFEST_ENTRY} is not valid JSON: {e}"))
        })?;

        match normalize(container, &raw) {
            Ok(record) => Ok(record),
            Err(e) => {
                tracing::warn!(path = %container.display(), error = %e, "Degrading archive record");
                Ok(ArchiveRecord::degraded(container, top_level_timestamp(&raw)))
            }
        }
    }

    fn read_manifest_bytes(&self, container: &Path) -> Result<Vec<u8>> {
        let file = File::open(container).map_err(|e| CatalogError::archive_unreadable(container, e))?;
        let mut archive =
            zip::ZipArchive::new(file).map_err(|e| CatalogError::archive_unreadable(container, e))?;
        let entry = archive.by_name(MANIFEST_ENTRY).map_err(|e| {
            CatalogError::archive_unreadable(container, format!("{MANIFEST_ENTRY}: {e}"))
        })?;

        let limit = self.limit();
        if entry.size() > limit {
            return Err(CatalogError::archive_unreadable(
                container,
                format!("{MANIFEST_ENTRY} is {} bytes, limit is {limit}", entry.size()),
            ));
        }

        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry
            .take(limit + 1)
            .read_to_end(&mut bytes)
            .map_err(|e| CatalogError::archive_unreadable(container, e))?;
        if bytes.len() as u64 > limit {
            return Err(CatalogError::archive_unreadable(
                container,
                format!("{MANIFEST_ENTRY} exceeds {limit} bytes"),
            ));
        }
        Ok(bytes)
    }
}

fn normalize(container: &Path, raw: &Value) -> Result<ArchiveRecord> {
    match detect_schema(raw) {
        Some(SchemaVariant::Checksums) => normalize_checksums(container, raw),
        Some(SchemaVariant::Sized) => normalize_sized(container, raw),
        None => Err(CatalogError::manifest_malformed(
            container,
            "neither a 'files' nor a 'checksums' mapping is present",
        )),
    }
}

fn normalize_checksums(container: &Path, raw: &Value) -> Result<ArchiveRecord> {
    let manifest = ChecksumManifest::deserialize(raw)
        .map_err(|e| CatalogError::manifest_malformed(container, e))?;

    let entries = manifest
        .checksums
        .into_iter()
        .map(|(path, checksum)| FileEntry { path, checksum, size: 0 })
        .collect();

    Ok(ArchiveRecord::new(
        container,
        Some(manifest.timestamp),
        entries,
        manifest.size.unwrap_or(0),
    ))
}

fn normalize_sized(container: &Path, raw: &Value) -> Result<ArchiveRecord> {
    let manifest = SizedManifest::deserialize(raw)
        .map_err(|e| CatalogError::manifest_malformed(container, e))?;

    let entries: Vec<FileEntry> = manifest
        .files
        .into_iter()
        .map(|(path, file)| FileEntry {
            path,
            checksum: file.checksum,
            size: file.size,
        })
        .collect();
    let total = match manifest.size {
        Some(size) => size,
        None => entries
            .iter()
            .try_fold(0u64, |acc, e| acc.checked_add(e.size))
            .ok_or_else(|| CatalogError::manifest_malformed(container, "file sizes overflow the archive total"))?,
    };

    Ok(ArchiveRecord::new(container, Some(manifest.timestamp), entries, total))
}

fn top_level_timestamp(raw: &Value) -> Option<String> {
    raw.get("timestamp").and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    /// Writes a zip archive holding the given named entries.
    pub(crate) fn write_archive(path: &Path, entries: &[(&str, &[u8])]) -> std::io::Result<()> {
        let mut zip = zip::ZipWriter::new(File::create(path)?);
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default())?;
            zip.write_all(data)?;
        }
        zip.finish()?;
        Ok(())
    }

    pub(crate) fn write_manifest_archive(path: &Path, manifest: &Value) -> std::io::Result<()> {
        let body = serde_json::to_vec(manifest)?;
        write_archive(path, &[("web.zip", &b"payload"[..]), (MANIFEST_ENTRY, &body[..])])
    }

    fn archive_with(dir: &TempDir, name: &str, manifest: Value) -> PathBuf {
        let path = dir.path().join(name);
        write_manifest_archive(&path, &manifest).unwrap();
        path
    }

    #[test]
    fn test_detect_schema() {
        assert_eq!(detect_schema(&json!({ "timestamp": "t", "files": {} })), Some(SchemaVariant::Sized));
        assert_eq!(detect_schema(&json!({ "timestamp": "t", "checksums": {} })), Some(SchemaVariant::Checksums));
        assert_eq!(detect_schema(&json!({ "timestamp": "t" })), None);
        assert_eq!(detect_schema(&json!([1, 2])), None);
    }

    #[test]
    fn test_sized_manifest_sorted_by_size() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "backup_2024-06-01.zip", json!({
            "timestamp": "2024-06-01T03:00:00",
            "size": 65,
            "files": {
                "a.zip": { "checksum": "0xa", "size": 10 },
                "b.zip": { "checksum": "0xb", "size": 50 },
                "c.zip": { "checksum": "0xc", "size": 5 },
            },
        }));

        let record = ManifestReader::new().read_manifest(&path).unwrap();
        assert_eq!(record.filename, "backup_2024-06-01.zip");
        assert_eq!(record.timestamp.as_deref(), Some("2024-06-01T03:00:00"));
        let sizes: Vec<u64> = record.file_entries.iter().map(|e| e.size).collect();
        assert_eq!(sizes, vec![50, 10, 5]);
        assert_eq!(record.file_entries[0].checksum, "0xb");
        assert_eq!(record.total_size, 65);
        assert!(!record.degraded);
    }

    #[test]
    fn test_sized_manifest_without_total_sums_entries() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "a.zip", json!({
            "timestamp": "2024-06-01",
            "files": {
                "x": { "checksum": "1", "size": 3 },
                "y": { "checksum": "2", "size": 4 },
            },
        }));
        let record = ManifestReader::new().read_manifest(&path).unwrap();
        assert_eq!(record.total_size, 7);
    }

    #[test]
    fn test_overflowing_entry_sizes_degrade() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "a.zip", json!({
            "timestamp": "2024-06-01",
            "files": {
                "a": { "checksum": "1", "size": u64::MAX },
                "b": { "checksum": "2", "size": 2 },
            },
        }));
        let record = ManifestReader::new().read_manifest(&path).unwrap();
        assert!(record.degraded);
        assert_eq!(record.total_size, 0);
        assert!(record.file_entries.is_empty());
        assert_eq!(record.timestamp.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn test_checksum_manifest_in_path_order() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "a.zip", json!({
            "timestamp": "2024-01-01T00:00:00",
            "checksums": { "web.zip": "0x2", "db.zip": "0x1" },
            "size": 1234,
        }));

        let record = ManifestReader::new().read_manifest(&path).unwrap();
        let paths: Vec<&str> = record.file_entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["db.zip", "web.zip"]);
        assert!(record.file_entries.iter().all(|e| e.size == 0));
        assert_eq!(record.total_size, 1234);
    }

    #[test]
    fn test_missing_mapping_degrades() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "a.zip", json!({ "timestamp": "2024-06-01" }));

        let record = ManifestReader::new().read_manifest(&path).unwrap();
        assert!(record.degraded);
        assert!(record.file_entries.is_empty());
        assert_eq!(record.total_size, 0);
        assert_eq!(record.timestamp.as_deref(), Some("2024-06-01"));
    }

    #[test]
    fn test_mistyped_entries_degrade() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "a.zip", json!({
            "timestamp": "2024-06-01",
            "size": 10,
            "files": { "a": { "checksum": "1", "size": -4 } },
        }));
        let record = ManifestReader::new().read_manifest(&path).unwrap();
        assert!(record.degraded);
        assert_eq!(record.timestamp.as_deref(), Some("2024-06-01"));

        let path = archive_with(&dir, "b.zip", json!({ "timestamp": 17, "checksums": { "a": "1" } }));
        let record = ManifestReader::new().read_manifest(&path).unwrap();
        assert!(record.degraded);
        assert_eq!(record.timestamp, None);
        assert_eq!(record.sort_key, None);
    }

    #[test]
    fn test_non_object_manifest_degrades() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "a.zip", json!(["not", "a", "manifest"]));
        let record = ManifestReader::new().read_manifest(&path).unwrap();
        assert!(record.degraded);
        assert_eq!(record.filename, "a.zip");
    }

    #[test]
    fn test_invalid_json_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.zip");
        write_archive(&path, &[(MANIFEST_ENTRY, &b"{ not json"[..])]).unwrap();

        let err = ManifestReader::new().read_manifest(&path).unwrap_err();
        assert!(matches!(err, CatalogError::ArchiveUnreadable { .. }));
    }

    #[test]
    fn test_missing_manifest_entry_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.zip");
        write_archive(&path, &[("other.json", &b"{}"[..])]).unwrap();

        let err = ManifestReader::new().read_manifest(&path).unwrap_err();
        assert!(matches!(err, CatalogError::ArchiveUnreadable { .. }));
    }

    #[test]
    fn test_not_a_zip_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.zip");
        std::fs::write(&path, b"definitely not a zip archive").unwrap();

        let err = ManifestReader::new().read_manifest(&path).unwrap_err();
        assert!(matches!(err, CatalogError::ArchiveUnreadable { .. }));

        let err = ManifestReader::new()
            .read_manifest(&dir.path().join("missing.zip"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::ArchiveUnreadable { .. }));
    }

    #[test]
    fn test_oversized_manifest_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = archive_with(&dir, "a.zip", json!({ "timestamp": "2024-06-01", "checksums": {} }));
        let err = ManifestReader::new()
            .with_max_manifest_bytes(8)
            .read_manifest(&path)
            .unwrap_err();
        assert!(matches!(err, CatalogError::ArchiveUnreadable { .. }));
    }
}
