//! Data ingestion and dataset construction

pub mod dataset;
pub mod tables;

pub use dataset::{
    split_with_seed, SequenceBatch, SequenceBatcher, SequenceBuilder, SequenceDataset,
    SequenceSample,
};
pub use tables::Tables;
