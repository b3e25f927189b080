//! Filesystem and environment helpers.

pub mod paths;

pub use paths::{default_config_file, default_trace_file, expand_tilde, get_data_dir};
