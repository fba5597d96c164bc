//! # kav: Kubernetes access viewer
//!
//! Shows what the current Kubernetes identity may do (`rakkess`) and who may
//! perform an action (`kubectl-who-can`) as markdown tables.
//!
//! This crate holds the command-line core shared by the `kav` binary:
//!
//! - [`State`]: shared application state handed to every handler
//! - [`CliError`]: user errors (exit code 1) vs system failures (exit code 101)
//! - [`Response`] / [`IntoResponse`]: what a handler returns
//! - [`CommandRouter`]: derive that dispatches a command enum to handlers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kav::{CliResult, CommandRouter, State};
//!
//! pub struct AppState {
//!     pub config: KavConfig,
//! }
//!
//! #[derive(CommandRouter)]
//! #[router(state = AppState)]
//! enum Commands {
//!     #[router(handler = handlers::version)]
//!     Version,
//!
//!     #[router(handler = handlers::access)]
//!     Access(AccessArgs),
//! }
//!
//! mod handlers {
//!     pub async fn version(_state: State<AppState>) -> CliResult<String> {
//!         Ok(kav::version_info())
//!     }
//!
//!     pub async fn access(state: State<AppState>, args: AccessArgs) -> CliResult<String> {
//!         // run rakkess, render markdown
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let state = State::new(AppState { config: KavConfig::default() });
//!     let response = Commands::Version.execute(state).await;
//!     response.emit();
//!     std::process::exit(response.exit_code);
//! }
//! ```

use kav_host::{ConfigError, ProviderError, ToolError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

pub use kav_macros::CommandRouter;

pub mod build_info;
pub mod tracing_support;

#[cfg(feature = "tracing")]
pub use tracing_support::{init_subscriber, init_subscriber_with_config, TracingConfig, TracingFormat};

pub use build_info::{version_info, version_short};

// ============================================================================
// Core Types
// ============================================================================

/// Shared application state wrapper.
///
/// Handlers receive this by value; cloning only bumps a reference count.
///
/// ```
/// use kav::State;
///
/// struct AppState {
///     context: String,
/// }
///
/// let state = State::new(AppState {
///     context: "kind-dev".to_string(),
/// });
/// assert_eq!(state.get().context, "kind-dev");
/// ```
pub struct State<T>(Arc<T>);

impl<T> State<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn get(&self) -> &T {
        &self.0
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

/// Result type returned by handlers
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Error Types
// ============================================================================

/// Top-level error type for CLI operations.
///
/// User errors exit with code 1, system failures with code 101.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    User(#[from] UserError),

    #[error(transparent)]
    System(#[from] SystemError),
}

impl CliError {
    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::User(_) => 1,
            CliError::System(_) => 101,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        CliError::System(SystemError::Internal(message.into()))
    }

    pub fn invalid_argument(arg: impl Into<String>, reason: impl Into<String>) -> Self {
        CliError::User(UserError::InvalidArgument {
            arg: arg.into(),
            reason: reason.into(),
        })
    }
}

/// User-fixable errors (exit code 1)
#[derive(Debug, Error)]
pub enum UserError {
    #[error("Error: Invalid argument '{arg}'\n\n{reason}")]
    InvalidArgument { arg: String, reason: String },

    #[error("Error: Missing dependency '{tool}'\n\nHint: {install_hint}")]
    MissingDependency { tool: String, install_hint: String },

    #[error("Error: {tool} failed\n\n{details}")]
    ToolFailed { tool: String, details: String },

    #[error("Error: Validation failed\n\n{}", .details.join("\n"))]
    ValidationFailed { details: Vec<String> },
}

/// System-level failures (exit code 101)
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Internal Error: {0}\n\nThis is likely a bug.")]
    Internal(String),

    #[error("Internal Error: I/O operation failed\n\n{0}")]
    Io(#[from] std::io::Error),

    #[error("Internal Error: Config parse failed\n\n{0}")]
    ConfigParse(String),
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        CliError::System(SystemError::Io(e))
    }
}

fn install_hint(tool: &str) -> String {
    let plugin = match tool {
        "rakkess" => "access-matrix",
        "kubectl-who-can" => "who-can",
        other => other,
    };
    format!(
        "Install it with `kubectl krew install {plugin}`, or point `{tool}-path` in the kav config at the binary"
    )
}

impl From<ToolError> for CliError {
    fn from(e: ToolError) -> Self {
        if e.is_not_found() {
            return CliError::User(UserError::MissingDependency {
                tool: e.tool().to_string(),
                install_hint: install_hint(e.tool()),
            });
        }
        match e {
            ToolError::Spawn { source, .. } => CliError::System(SystemError::Io(source)),
            ToolError::Failed {
                tool,
                status,
                stderr,
            } => CliError::User(UserError::ToolFailed {
                tool,
                details: if stderr.is_empty() {
                    status
                } else {
                    format!("{stderr} ({status})")
                },
            }),
            other @ ToolError::InvalidOutput { .. } => CliError::system(other.to_string()),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Read { path, source } if source.kind() == std::io::ErrorKind::NotFound => {
                CliError::invalid_argument("--config", format!("{} does not exist", path.display()))
            }
            ConfigError::Read { source, .. } => CliError::System(SystemError::Io(source)),
            parse @ ConfigError::Parse { .. } => {
                CliError::System(SystemError::ConfigParse(parse.to_string()))
            }
            ConfigError::InvalidVerbs(details) => CliError::User(UserError::ValidationFailed {
                details: vec![format!("verbs: {details}")],
            }),
        }
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::system(e.to_string())
    }
}

// ============================================================================
// Response Types
// ============================================================================

/// What a handler produced: an exit code and the output to print
#[derive(Debug)]
pub struct Response {
    /// 0 on success, otherwise [`CliError::exit_code`]
    pub exit_code: i32,
    pub output: Output,
}

impl Response {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Text(content.into()),
        }
    }

    pub fn json(content: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            output: Output::Json(content.into()),
        }
    }

    pub fn silent() -> Self {
        Self {
            exit_code: 0,
            output: Output::Silent,
        }
    }

    pub fn error(exit_code: i32, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            output: Output::Error(message.into()),
        }
    }

    /// Print the output: results to stdout, errors to stderr
    pub fn emit(&self) {
        match &self.output {
            Output::Silent => {}
            Output::Text(s) | Output::Json(s) => println!("{s}"),
            Output::Error(s) => eprintln!("{s}"),
        }
    }
}

/// Output type for responses
#[derive(Debug, PartialEq, Eq)]
pub enum Output {
    Silent,
    /// Markdown or other text for stdout
    Text(String),
    /// Machine-readable output for stdout
    Json(String),
    /// Error message for stderr
    Error(String),
}

impl Output {
    pub fn is_empty(&self) -> bool {
        matches!(self, Output::Silent)
    }
}

impl std::fmt::Display for Output {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Silent => Ok(()),
            Output::Text(s) | Output::Json(s) | Output::Error(s) => write!(f, "{}", s),
        }
    }
}

/// Pretty-printed JSON response body
pub struct Json<T>(pub T);

// ============================================================================
// Response Conversion Trait
// ============================================================================

/// Converts handler return values into responses
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(self)
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::silent()
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_string_pretty(&self.0) {
            Ok(json) => Response::json(json),
            Err(e) => CliError::system(format!("Failed to serialize output: {e}")).into_response(),
        }
    }
}

impl IntoResponse for CliError {
    fn into_response(self) -> Response {
        Response::error(self.exit_code(), self.to_string())
    }
}

impl<T: IntoResponse> IntoResponse for CliResult<T> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(e) => e.into_response(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
