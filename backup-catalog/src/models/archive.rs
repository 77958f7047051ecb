//! Catalog records and their wire representation.
//!
//! Records are normalized at read time and carry both the raw manifest
//! timestamp (passed through to clients) and its parsed form (used only for
//! ordering). The JSON shape depends on the [`CatalogLayout`] a deployment
//! serves.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// One backed-up file described by an archive's manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: String,
    pub checksum: String,
    /// Zero for manifests that record checksums only.
    pub size: u64,
}

/// One archive container in a tier listing.
#[derive(Debug, Clone, PartialEq)]
pub struct ArchiveRecord {
    pub filename: String,
    pub timestamp: Option<String>,
    pub sort_key: Option<DateTime<Utc>>,
    pub file_entries: Vec<FileEntry>,
    pub total_size: u64,
    pub degraded: bool,
}

impl ArchiveRecord {
    pub fn new(
        container: &Path,
        timestamp: Option<String>,
        mut file_entries: Vec<FileEntry>,
        total_size: u64,
    ) -> Self {
        // Stable: equal sizes keep the caller's (path) order.
        file_entries.sort_by(|a, b| b.size.cmp(&a.size));
        Self {
            filename: archive_filename(container),
            sort_key: timestamp.as_deref().and_then(parse_timestamp),
            timestamp,
            file_entries,
            total_size,
            degraded: false,
        }
    }

    /// Record for an archive whose manifest content could not be used.
    pub fn degraded(container: &Path, timestamp: Option<String>) -> Self {
        Self {
            degraded: true,
            ..Self::new(container, timestamp, Vec::new(), 0)
        }
    }
}

/// Base name of a container path, accepting both `/` and `\` separators.
pub fn archive_filename(container: &Path) -> String {
    let normalized = container.to_string_lossy().replace('\\', "/");
    normalized
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Parses a manifest timestamp. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Response shape served by a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogLayout {
    /// Per-file checksum and size plus the archive's aggregate size.
    #[default]
    Sized,
    /// Per-file checksum only.
    Checksums,
}

impl CatalogLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            CatalogLayout::Sized => "sized",
            CatalogLayout::Checksums => "checksums",
        }
    }
}

impl fmt::Display for CatalogLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogLayout {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sized" => Ok(CatalogLayout::Sized),
            "checksums" | "checksum" => Ok(CatalogLayout::Checksums),
            other => anyhow::bail!("unknown catalog layout '{other}' (expected sized or checksums)"),
        }
    }
}

/// Ordered records for one tier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Catalog {
    pub files: Vec<ArchiveRecord>,
}

impl Catalog {
    pub fn render(&self, layout: CatalogLayout) -> CatalogResponse<'_> {
        let files = self
            .files
            .iter()
            .map(|record| match layout {
                CatalogLayout::Sized => RecordView::Sized(SizedRecord {
                    filename: &record.filename,
                    timestamp: record.timestamp.as_deref(),
                    files: record
                        .file_entries
                        .iter()
                        .map(|e| SizedFile {
                            filename: &e.path,
                            checksum: &e.checksum,
                            size: e.size,
                        })
                        .collect(),
                    size: record.total_size,
                }),
                CatalogLayout::Checksums => RecordView::Checksums(ChecksumRecord {
                    filename: &record.filename,
                    timestamp: record.timestamp.as_deref(),
                    checksums: record
                        .file_entries
                        .iter()
                        .map(|e| FileChecksum {
                            filename: &e.path,
                            checksum: &e.checksum,
                        })
                        .collect(),
                }),
            })
            .collect();
        CatalogResponse { files }
    }
}

#[derive(Debug, Serialize)]
pub struct CatalogResponse<'a> {
    pub files: Vec<RecordView<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum RecordView<'a> {
    Sized(SizedRecord<'a>),
    Checksums(ChecksumRecord<'a>),
}

#[derive(Debug, Serialize)]
pub struct SizedRecord<'a> {
    pub filename: &'a str,
    pub timestamp: Option<&'a str>,
    pub files: Vec<SizedFile<'a>>,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct SizedFile<'a> {
    pub filename: &'a str,
    pub checksum: &'a str,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct ChecksumRecord<'a> {
    pub filename: &'a str,
    pub timestamp: Option<&'a str>,
    pub checksums: Vec<FileChecksum<'a>>,
}

#[derive(Debug, Serialize)]
pub struct FileChecksum<'a> {
    pub filename: &'a str,
    pub checksum: &'a str,
}
