//! Content source backed by `rakkess` and `kubectl-who-can`

use async_trait::async_trait;
use kav_api::{
    parse_binding_report, parse_permission_table, render_permission_matrix_with,
    render_who_can_result, PermissionMatrix, WhoCanResult,
};
use std::sync::Arc;

use crate::address::Selector;
use crate::config::{KavConfig, RAKKESS_TOOL, WHO_CAN_TOOL};
use crate::provider::ContentSource;
use crate::tool::{ToolError, ToolInvocation, ToolRunner};

/// Runs the RBAC tools for a selector and renders their output as markdown
#[derive(Clone)]
pub struct KubeContentSource {
    runner: Arc<dyn ToolRunner>,
    config: KavConfig,
}

impl KubeContentSource {
    pub fn new(runner: Arc<dyn ToolRunner>, config: KavConfig) -> Self {
        Self { runner, config }
    }

    pub fn config(&self) -> &KavConfig {
        &self.config
    }

    /// Command line that fetches `selector`
    pub fn invocation(&self, selector: &Selector) -> ToolInvocation {
        match selector {
            Selector::Cluster => self.rakkess(None),
            Selector::Namespace(namespace) => self.rakkess(Some(namespace.as_str())),
            Selector::WhoCan { verb, resource } => {
                ToolInvocation::new(WHO_CAN_TOOL, self.config.who_can_program())
                    .arg(verb.as_str())
                    .arg(resource.as_str())
            }
        }
    }

    fn rakkess(&self, namespace: Option<&str>) -> ToolInvocation {
        let mut invocation = ToolInvocation::new(RAKKESS_TOOL, self.config.rakkess_program());
        if let Some(namespace) = namespace {
            invocation = invocation.args(["--namespace", namespace]);
        }
        invocation
            .args(["--verbs".to_string(), self.config.verbs.join(",")])
            .args(["--output", "ascii-table"])
    }

    /// Fetch the permission matrix, cluster-wide or for one namespace
    pub async fn permission_matrix(
        &self,
        namespace: Option<&str>,
    ) -> Result<PermissionMatrix, ToolError> {
        let stdout = self.runner.run(&self.rakkess(namespace)).await?;
        let matrix = parse_permission_table(&stdout);
        tracing::debug!(
            namespace = namespace.unwrap_or("<cluster>"),
            kinds = matrix.len(),
            "Parsed permission matrix"
        );
        Ok(matrix)
    }

    /// Fetch the subjects allowed to perform `verb` on `resource`
    pub async fn who_can(&self, verb: &str, resource: &str) -> Result<WhoCanResult, ToolError> {
        let selector = Selector::who_can(verb, resource);
        let stdout = self.runner.run(&self.invocation(&selector)).await?;
        let result = parse_binding_report(&stdout);
        tracing::debug!(
            verb,
            resource,
            role_bindings = result.role_bindings.len(),
            cluster_role_bindings = result.cluster_role_bindings.len(),
            "Parsed who-can report"
        );
        Ok(result)
    }
}

#[async_trait]
impl ContentSource for KubeContentSource {
    type Error = ToolError;

    async fn produce(&self, selector: &Selector) -> Result<String, ToolError> {
        match selector {
            Selector::Cluster => {
                let matrix = self.permission_matrix(None).await?;
                Ok(render_permission_matrix_with(&matrix, self.config.cell_style()))
            }
            Selector::Namespace(namespace) => {
                let matrix = self.permission_matrix(Some(namespace.as_str())).await?;
                Ok(render_permission_matrix_with(&matrix, self.config.cell_style()))
            }
            Selector::WhoCan { verb, resource } => {
                let result = self.who_can(verb, resource).await?;
                Ok(render_who_can_result(&result, verb, resource))
            }
        }
    }

    fn failure_text(&self, selector: &Selector, message: &str) -> String {
        match selector {
            Selector::Cluster | Selector::Namespace(_) => {
                format!("Error loading access information: {message}")
            }
            Selector::WhoCan { .. } => format!("Error loading permissions information: {message}"),
        }
    }
}
