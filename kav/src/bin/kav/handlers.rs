//! Command handlers
//!
//! Markdown output goes through the loading viewer, exactly like a preview
//! would pull it: the placeholder is shown on stderr until the document
//! resolves, and a failing tool becomes the document text. JSON output runs
//! the tool directly and reports failures as errors.

use kav::{CliError, CliResult, IntoResponse, Json, Response, State};
use kav_host::{DocumentProvider, KavConfig, KubeContentSource, Selector, Target, Viewer};
use serde::Serialize;
use std::path::Path;

use crate::app::AppState;
use crate::cli::{AccessArgs, OutputFormat, ViewArgs, WhoCanArgs};

pub async fn access(state: State<AppState>, args: AccessArgs) -> CliResult<Response> {
    let selector = match args.namespace {
        Some(namespace) => Selector::Namespace(namespace),
        None => Selector::Cluster,
    };
    show(state.get(), selector).await
}

pub async fn who_can(state: State<AppState>, args: WhoCanArgs) -> CliResult<Response> {
    show(state.get(), Selector::who_can(args.verb, args.resource)).await
}

pub async fn view(state: State<AppState>, args: ViewArgs) -> CliResult<Response> {
    let selector = match Target::parse(&args.target) {
        Target::Resource(resource) => Target::Resource(resource.clone())
            .selector(args.verb.as_deref())
            .ok_or_else(|| {
                CliError::invalid_argument(
                    "--verb",
                    format!("'{resource}' is a resource; pass --verb to ask who can act on it"),
                )
            })?,
        target => target.selector(None).ok_or_else(|| {
            CliError::invalid_argument(
                "target",
                "expected `cluster`, `namespace/<name>` or a resource",
            )
        })?,
    };
    show(state.get(), selector).await
}

#[derive(Serialize)]
struct EffectiveConfig<'a> {
    path: &'a Path,
    #[serde(flatten)]
    config: &'a KavConfig,
}

pub async fn config(state: State<AppState>) -> CliResult<Response> {
    let app = state.get();
    Ok(Json(EffectiveConfig {
        path: &app.config_path,
        config: app.config(),
    })
    .into_response())
}

pub async fn version(_state: State<AppState>) -> CliResult<String> {
    Ok(kav::version_info())
}

async fn show(app: &AppState, selector: Selector) -> CliResult<Response> {
    tracing::info!(selector = %selector, output = ?app.output, "Showing");
    match app.output {
        OutputFormat::Json => fetch_json(&app.source, &selector).await,
        OutputFormat::Markdown => {
            let (provider, events) = DocumentProvider::new(app.source.clone())?;
            let mut viewer = Viewer::new(provider, events);
            let text = viewer
                .open(selector, |placeholder| eprintln!("{placeholder}"))
                .await;
            Ok(Response::text(text))
        }
    }
}

async fn fetch_json(source: &KubeContentSource, selector: &Selector) -> CliResult<Response> {
    let response = match selector {
        Selector::Cluster => Json(source.permission_matrix(None).await?).into_response(),
        Selector::Namespace(namespace) => {
            Json(source.permission_matrix(Some(namespace.as_str())).await?).into_response()
        }
        Selector::WhoCan { verb, resource } => {
            Json(source.who_can(verb, resource).await?).into_response()
        }
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use kav::Output;
    use kav_host::{ToolError, ToolInvocation, ToolRunner};
    use std::path::PathBuf;
    use std::sync::Arc;

    struct CannedRunner(&'static str);

    #[async_trait]
    impl ToolRunner for CannedRunner {
        async fn run(&self, _invocation: &ToolInvocation) -> Result<String, ToolError> {
            Ok(self.0.to_string())
        }
    }

    struct MissingRunner;

    #[async_trait]
    impl ToolRunner for MissingRunner {
        async fn run(&self, invocation: &ToolInvocation) -> Result<String, ToolError> {
            Err(ToolError::Spawn {
                tool: invocation.tool.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            })
        }
    }

    fn state(runner: Arc<dyn ToolRunner>, output: OutputFormat) -> State<AppState> {
        State::new(AppState::with_runner(
            PathBuf::from("/tmp/kav/config.json"),
            KavConfig::default(),
            runner,
            output,
        ))
    }

    const REPORT: &str = "ROLEBINDING\tNAMESPACE\tSUBJECT\tTYPE\tSA-NAMESPACE\n\
                          dev-read\tdev\talice\tUser\t\n\
                          \n\
                          CLUSTERROLEBINDING\tSUBJECT\tTYPE\tSA-NAMESPACE\n\
                          admins\tops\tGroup\t\n";

    #[tokio::test]
    async fn test_access_markdown() {
        let state = state(
            Arc::new(CannedRunner("NAME GET\npods yes\n")),
            OutputFormat::Markdown,
        );
        let response = access(state, AccessArgs { namespace: None }).await.unwrap();
        assert_eq!(
            response.output,
            Output::Text("| Resource Type | get |\n|---|---|\n| `pods` | yes |".to_string())
        );
    }

    #[tokio::test]
    async fn test_who_can_json() {
        let state = state(Arc::new(CannedRunner(REPORT)), OutputFormat::Json);
        let response = who_can(
            state,
            WhoCanArgs {
                verb: "get".into(),
                resource: "pods".into(),
            },
        )
        .await
        .unwrap();

        let Output::Json(json) = response.output else {
            panic!("Expected JSON output");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["role_bindings"][0]["subject_name"], "alice");
        assert_eq!(value["cluster_role_bindings"][0]["binding_name"], "admins");
    }

    #[tokio::test]
    async fn test_missing_tool_markdown_is_document() {
        let state = state(Arc::new(MissingRunner), OutputFormat::Markdown);
        let response = access(state, AccessArgs { namespace: Some("dev".into()) })
            .await
            .unwrap();
        let Output::Text(text) = response.output else {
            panic!("Expected text output");
        };
        assert!(text.starts_with("Error loading access information: rakkess could not be started"));
    }

    #[tokio::test]
    async fn test_missing_tool_json_is_error() {
        let state = state(Arc::new(MissingRunner), OutputFormat::Json);
        let err = access(state, AccessArgs { namespace: None })
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 1);
        assert!(err.to_string().contains("Missing dependency 'rakkess'"));
    }

    #[tokio::test]
    async fn test_view_resource_needs_verb() {
        let state = state(Arc::new(CannedRunner("")), OutputFormat::Markdown);
        let err = view(
            state,
            ViewArgs {
                target: "pods".into(),
                verb: None,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Invalid argument '--verb'"));
    }

    #[tokio::test]
    async fn test_view_resource_with_verb() {
        let state = state(Arc::new(CannedRunner("")), OutputFormat::Markdown);
        let response = view(
            state,
            ViewArgs {
                target: "secrets".into(),
                verb: Some("get".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            response.output,
            Output::Text(
                "**No subjects have permissions to get secrets through either role or cluster role bindings**"
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_view_unresolved_target() {
        let state = state(Arc::new(CannedRunner("")), OutputFormat::Markdown);
        let err = view(
            state,
            ViewArgs {
                target: "ns/".into(),
                verb: None,
            },
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("Invalid argument 'target'"));
    }

    #[tokio::test]
    async fn test_config_includes_path() {
        let state = state(Arc::new(CannedRunner("")), OutputFormat::Markdown);
        let response = config(state).await.unwrap();
        let Output::Json(json) = response.output else {
            panic!("Expected JSON output");
        };
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["path"], "/tmp/kav/config.json");
        assert_eq!(value["verbs"][0], "get");
    }
}
