use crate::models::{ArchiveRecord, Catalog};
use std::cmp::Ordering;

/// Orders records newest first. Records without a usable timestamp sort
/// last; ties fall back to the filename.
pub fn assemble(mut records: Vec<ArchiveRecord>) -> Catalog {
    records.sort_by(compare_records);
    Catalog { files: records }
}

fn compare_records(a: &ArchiveRecord, b: &ArchiveRecord) -> Ordering {
    let by_time = match (&a.sort_key, &b.sort_key) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_time.then_with(|| a.filename.cmp(&b.filename))
}
