pub mod history;
pub mod merge;

pub use history::{History, MergePolicy};
pub use merge::{ingest, Batch, Sample};
