pub mod config;
pub mod error;
pub mod db;
pub mod graph;
pub mod taxonomy;
pub mod traversal;
pub mod http;

pub use config::Config;
pub use error::{LineageError, Result};
pub use taxonomy::{Axis, TaxonomyRegistry};
pub use traversal::{CancelFlag, HopCollapser, TraversalEngine, TraverseRequest};
