//! Store infrastructure - Document index clients and scanning

mod http;
mod in_memory;
mod scanner;

pub use http::HttpDocumentStore;
pub use in_memory::{matches_query, InMemoryDocumentStore};
pub use scanner::{ScanOptions, ScanPage, ScanResult, Scanner, DEFAULT_SCAN_PAGE_SIZE};
