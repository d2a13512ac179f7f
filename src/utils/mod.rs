//! Utility modules for codepath
//!
//! Organized into logical groups:
//! - `backends/` - Parser backend chain (syntax tree, Python outline, whole file)
//! - `analysis/` - Relationships, metrics, graph assembly and path resolution
//! - `integrations/` - Parse cache and file watching

pub mod analysis;
pub mod backends;
pub mod integrations;

pub mod ast;
pub mod summary;
