//! Binding model and the `kubectl-who-can` report parser
//!
//! The report has two blank-line separated sections, each a title line
//! followed by tab-separated records:
//!
//! ```text
//! ROLEBINDING	NAMESPACE	SUBJECT	TYPE	SA-NAMESPACE
//! view-pods	dev	alice	User
//!
//! CLUSTERROLEBINDING	SUBJECT	TYPE	SA-NAMESPACE
//! cluster-admin	system:masters	Group
//! ```

use serde::Serialize;

use crate::tranche::split_on;

/// A subject granted access through a namespaced role binding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleBindingGrant {
    pub binding_name: String,
    pub binding_namespace: String,
    pub subject_name: String,
    pub subject_type: String,
    /// Namespace of the subject (service accounts); `None` when not reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_namespace: Option<String>,
}

/// A subject granted access through a cluster role binding
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClusterRoleBindingGrant {
    pub binding_name: String,
    pub subject_name: String,
    pub subject_type: String,
    /// Namespace of the subject (service accounts); `None` when not reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_namespace: Option<String>,
}

/// Everything `kubectl-who-can` reported for one verb and resource
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WhoCanResult {
    pub role_bindings: Vec<RoleBindingGrant>,
    pub cluster_role_bindings: Vec<ClusterRoleBindingGrant>,
}

impl WhoCanResult {
    /// True when neither kind of binding grants access
    pub fn is_empty(&self) -> bool {
        self.role_bindings.is_empty() && self.cluster_role_bindings.is_empty()
    }
}

/// Parse `kubectl-who-can` output into a [`WhoCanResult`].
///
/// The first section holds role bindings, the second cluster role bindings.
/// Further sections are ignored.
pub fn parse_binding_report(text: &str) -> WhoCanResult {
    let lines = text.split('\n').map(str::trim);
    let tranches = split_on(lines, |line| line.is_empty());

    WhoCanResult {
        role_bindings: parse_tranche(tranches.first(), parse_role_binding),
        cluster_role_bindings: parse_tranche(tranches.get(1), parse_cluster_role_binding),
    }
}

fn parse_tranche<T>(lines: Option<&Vec<&str>>, parse_line: fn(&str) -> T) -> Vec<T> {
    match lines {
        // first line is the section title
        Some(lines) if lines.len() >= 2 => lines[1..].iter().map(|l| parse_line(l)).collect(),
        _ => Vec::new(),
    }
}

fn parse_role_binding(line: &str) -> RoleBindingGrant {
    let mut fields = Fields::new(line);
    RoleBindingGrant {
        binding_name: fields.next_or_empty(),
        binding_namespace: fields.next_or_empty(),
        subject_name: fields.next_or_empty(),
        subject_type: fields.next_or_empty(),
        subject_namespace: fields.next_non_empty(),
    }
}

fn parse_cluster_role_binding(line: &str) -> ClusterRoleBindingGrant {
    let mut fields = Fields::new(line);
    ClusterRoleBindingGrant {
        binding_name: fields.next_or_empty(),
        subject_name: fields.next_or_empty(),
        subject_type: fields.next_or_empty(),
        subject_namespace: fields.next_non_empty(),
    }
}

/// Tab-separated fields of a record; missing fields read as empty
struct Fields<'a> {
    inner: std::str::Split<'a, char>,
}

impl<'a> Fields<'a> {
    fn new(line: &'a str) -> Self {
        Self {
            inner: line.split('\t'),
        }
    }

    fn next_or_empty(&mut self) -> String {
        self.inner.next().unwrap_or_default().to_string()
    }

    fn next_non_empty(&mut self) -> Option<String> {
        self.inner
            .next()
            .filter(|field| !field.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_tranches() {
        let text = "Title\nb1\tns1\tsubj1\tUser\t\n\nTitle2\ncb1\tsubj2\tGroup\tns2\n";
        let result = parse_binding_report(text);

        assert_eq!(
            result.role_bindings,
            vec![RoleBindingGrant {
                binding_name: "b1".into(),
                binding_namespace: "ns1".into(),
                subject_name: "subj1".into(),
                subject_type: "User".into(),
                subject_namespace: None,
            }]
        );
        assert_eq!(
            result.cluster_role_bindings,
            vec![ClusterRoleBindingGrant {
                binding_name: "cb1".into(),
                subject_name: "subj2".into(),
                subject_type: "Group".into(),
                subject_namespace: Some("ns2".into()),
            }]
        );
    }

    #[test]
    fn test_parse_service_account_subject() {
        let text = "ROLEBINDING\tNAMESPACE\tSUBJECT\tTYPE\tSA-NAMESPACE\n\
                    deployer\tci\tbuilder\tServiceAccount\tci\n";
        let result = parse_binding_report(text);

        assert_eq!(result.role_bindings.len(), 1);
        assert_eq!(result.role_bindings[0].subject_namespace.as_deref(), Some("ci"));
        assert!(result.cluster_role_bindings.is_empty());
    }

    #[test]
    fn test_parse_empty_input() {
        let result = parse_binding_report("");
        assert!(result.is_empty());
    }

    #[test]
    fn test_title_only_tranches_are_empty() {
        let result = parse_binding_report("ROLEBINDING\tNAMESPACE\n\nCLUSTERROLEBINDING\tSUBJECT\n");
        assert!(result.is_empty());
    }

    #[test]
    fn test_only_cluster_role_bindings() {
        let text = "No role bindings\n\nCLUSTERROLEBINDING\tSUBJECT\tTYPE\tSA-NAMESPACE\n\
                    cluster-admin\tsystem:masters\tGroup\t\n";
        let result = parse_binding_report(text);

        assert!(result.role_bindings.is_empty());
        assert_eq!(result.cluster_role_bindings.len(), 1);
        assert_eq!(result.cluster_role_bindings[0].binding_name, "cluster-admin");
        assert_eq!(result.cluster_role_bindings[0].subject_namespace, None);
    }

    #[test]
    fn test_extra_tranches_are_ignored() {
        let text = "T1\na\tb\tc\td\te\n\nT2\nf\tg\th\ti\n\nT3\nx\ty\tz\n";
        let result = parse_binding_report(text);
        assert_eq!(result.role_bindings.len(), 1);
        assert_eq!(result.cluster_role_bindings.len(), 1);
    }

    #[test]
    fn test_short_record_fills_missing_fields() {
        let result = parse_binding_report("Title\nonly-name\n\nTitle\ncrb\tsubject\n");

        let rb = &result.role_bindings[0];
        assert_eq!(rb.binding_name, "only-name");
        assert_eq!(rb.binding_namespace, "");
        assert_eq!(rb.subject_type, "");
        assert_eq!(rb.subject_namespace, None);

        let crb = &result.cluster_role_bindings[0];
        assert_eq!(crb.subject_name, "subject");
        assert_eq!(crb.subject_type, "");
        assert_eq!(crb.subject_namespace, None);
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let result = parse_binding_report("Title\na\tb\tc\td\te\tf\tg\n");
        assert_eq!(result.role_bindings[0].subject_namespace.as_deref(), Some("e"));
    }

    #[test]
    fn test_crlf_lines() {
        let result = parse_binding_report("Title\r\nrb\tns\tbob\tUser\tdev\r\n\r\nTitle\r\n");
        assert_eq!(result.role_bindings.len(), 1);
        assert_eq!(result.role_bindings[0].subject_namespace.as_deref(), Some("dev"));
        assert!(result.cluster_role_bindings.is_empty());
    }

    #[test]
    fn test_result_serialization_omits_absent_namespace() {
        let result = parse_binding_report("Title\nrb\tns\tbob\tUser\t\n");
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"binding_namespace\":\"ns\""));
        assert!(!json.contains("subject_namespace"));
    }
}
