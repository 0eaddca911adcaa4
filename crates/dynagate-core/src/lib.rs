//! Dynagate core: configuration, in-memory tables and the handler that
//! connects them to the HTTP layer.
#![allow(clippy::doc_markdown, clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handler;
pub mod provider;
pub mod state;

pub use config::DynagateConfig;
pub use error::DynagateError;
pub use handler::DynagateHandler;
pub use provider::DynagateProvider;
