//! Primary store collaborators
//!
//! Persistence is external to this crate; everything goes through the
//! `SampleStore` trait. `InMemoryStore` is the reference backend used by
//! tests and the CLI.

mod memory;
mod traits;

pub use memory::InMemoryStore;
pub use traits::{SampleStore, StoreError, StoreResult};
