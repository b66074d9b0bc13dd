//! soul-episodes library
//!
//! Exposes the CLI, dataset configuration, render pipeline and thought
//! synthesis for integration testing.

pub mod cli;
pub mod config;
pub mod pipeline;
pub mod thoughts;

pub use config::{load_dataset, DatasetConfig, LoadedDataset, DATASET_ENV};
pub use pipeline::{RenderPipeline, RunSummary};
