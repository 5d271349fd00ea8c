pub mod chunk;
pub mod document;
pub mod error;
pub mod reader;
pub mod splitter;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use chunk::Chunk;
pub use document::{Document, MediaType};
pub use error::SplitError;
pub use reader::FileReader;
pub use splitter::{DEFAULT_MAX_PAGES, PageSplitter, SplitterConfig, page_ranges};
