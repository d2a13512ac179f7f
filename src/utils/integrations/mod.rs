//! Integration utilities: parse caching and file watching

pub mod cache;
pub mod watch;

// Re-export commonly used items
pub use cache::ParseCache;
pub use watch::{ChangeFilter, Debouncer, FileWatcher, WatchEvent};
