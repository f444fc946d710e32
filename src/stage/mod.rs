pub mod filter;
pub mod reader;
pub mod runtime;
pub mod sorted_merge;
pub mod sorter;
pub mod split;
pub mod writer;

pub use runtime::{new_edge, run_chain, RecordRx, RecordTx, Stage, DEFAULT_QUEUE_BOUND};
