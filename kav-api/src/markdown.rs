//! Markdown rendering of parsed tool output
//!
//! Output is pipe-delimited markdown tables with a `---` separator row,
//! ready for any markdown preview.

use crate::access::{PermissionMatrix, PermissionState};
use crate::whocan::WhoCanResult;

/// Shown instead of a table when no binding grants `verb` on `resource`
pub fn no_subjects_message(verb: &str, resource: &str) -> String {
    format!(
        "**No subjects have permissions to {verb} {resource} through either role or cluster role bindings**"
    )
}

const RESOURCE_TYPE_COLUMN: &str = "Resource Type";
const BINDING_COLUMNS: [&str; 4] = ["Binding Type", "Binding", "Subject", "Subject Type"];

/// How permission cells are decorated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CellStyle {
    /// `yes`, `no`, `n/a`, `error`
    #[default]
    Plain,
    /// Colored HTML spans for previews that render inline HTML
    Styled,
}

impl CellStyle {
    fn cell(&self, state: PermissionState) -> &'static str {
        match (*self, state) {
            (Self::Plain, state) => state.as_str(),
            (Self::Styled, PermissionState::Allowed) => "<span style='color: lime'>yes</span>",
            (Self::Styled, PermissionState::Denied) => {
                "<span style='color: palevioletred'>no</span>"
            }
            (Self::Styled, PermissionState::NotApplicable) => {
                "<span style='color: silver'>_n/a_</span>"
            }
            (Self::Styled, PermissionState::Error) => "**error**",
        }
    }
}

/// Render a permission matrix with plain cells
pub fn render_permission_matrix(matrix: &PermissionMatrix) -> String {
    render_permission_matrix_with(matrix, CellStyle::Plain)
}

/// Render a permission matrix.
///
/// Columns follow the parsed verb order and rows the parsed kind order.
/// Unset cells render empty.
pub fn render_permission_matrix_with(matrix: &PermissionMatrix, style: CellStyle) -> String {
    let mut header = vec![RESOURCE_TYPE_COLUMN.to_string()];
    header.extend(matrix.verbs().iter().map(|v| escape_cell(v)));

    let mut lines = vec![table_row(&header), separator_row(header.len())];
    for row in matrix.kinds() {
        let mut cells = vec![format!("`{}`", escape_cell(&row.kind))];
        cells.extend(matrix.verbs().iter().map(|verb| {
            row.permissions
                .get(verb)
                .map(|state| style.cell(*state).to_string())
                .unwrap_or_default()
        }));
        lines.push(table_row(&cells));
    }

    lines.join("\n")
}

/// Render who-can results for `verb` on `resource` as one table of role
/// and cluster role bindings, sorted by row text.
pub fn render_who_can_result(result: &WhoCanResult, verb: &str, resource: &str) -> String {
    if result.is_empty() {
        return no_subjects_message(verb, resource);
    }

    let role_rows = result.role_bindings.iter().map(|b| {
        table_row(&[
            "Role".to_string(),
            qualified(Some(b.binding_namespace.as_str()), &b.binding_name),
            qualified(b.subject_namespace.as_deref(), &b.subject_name),
            escape_cell(&b.subject_type),
        ])
    });
    let cluster_rows = result.cluster_role_bindings.iter().map(|b| {
        table_row(&[
            "Cluster Role".to_string(),
            escape_cell(&b.binding_name),
            qualified(b.subject_namespace.as_deref(), &b.subject_name),
            escape_cell(&b.subject_type),
        ])
    });
    let mut rows: Vec<String> = role_rows.chain(cluster_rows).collect();
    rows.sort();

    let header: Vec<String> = BINDING_COLUMNS.iter().map(|c| c.to_string()).collect();
    let mut lines = vec![table_row(&header), separator_row(header.len())];
    lines.extend(rows);
    lines.join("\n")
}

fn table_row(cells: &[String]) -> String {
    format!("| {} |", cells.join(" | "))
}

fn separator_row(columns: usize) -> String {
    format!("|{}|", vec!["---"; columns].join("|"))
}

/// `namespace/name`, or just `name` when there is no namespace
fn qualified(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{}/{}", escape_cell(ns), escape_cell(name)),
        _ => escape_cell(name),
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|")
}
