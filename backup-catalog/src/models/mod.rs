pub mod archive;
pub mod tier;

pub use archive::{ArchiveRecord, Catalog, CatalogLayout, FileEntry};
pub use tier::Tier;
