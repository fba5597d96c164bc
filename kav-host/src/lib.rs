//! kav-host: runtime side of the Kubernetes access viewer
//!
//! Turns a [`Selector`] into markdown by running `rakkess` or
//! `kubectl-who-can`, and hands the result to a pull-only display surface
//! through [`DocumentProvider`].
//!
//! # Example
//!
//! ```no_run
//! use kav_host::{DocumentProvider, KavConfig, KubeContentSource, ProcessToolRunner, Selector, Viewer};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let source = KubeContentSource::new(Arc::new(ProcessToolRunner::new()), KavConfig::default());
//! let (provider, events) = DocumentProvider::new(source)?;
//! let mut viewer = Viewer::new(provider, events);
//!
//! let markdown = viewer.open(Selector::Namespace("dev".into()), |_| {}).await;
//! println!("{markdown}");
//! # Ok(())
//! # }
//! ```

pub mod address;
pub mod config;
pub mod provider;
pub mod source;
pub mod store;
pub mod tool;
pub mod viewer;

pub use address::{Address, RequestToken, Selector, Target};
pub use config::{ConfigError, KavConfig, DEFAULT_VERBS};
pub use provider::{
    ChangeEvents, ContentSource, Document, DocumentProvider, ProviderError, PLACEHOLDER,
};
pub use source::KubeContentSource;
pub use store::ResultStore;
pub use tool::{ProcessToolRunner, ToolError, ToolInvocation, ToolRunner};
pub use viewer::Viewer;
