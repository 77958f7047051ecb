pub mod catalog;
pub mod manifest_reader;
pub mod tier_scanner;
