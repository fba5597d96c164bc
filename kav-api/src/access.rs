//! Permission matrix model and the `rakkess` ascii-table parser
//!
//! `rakkess --output ascii-table` prints a header line followed by one line
//! per resource kind:
//!
//! ```text
//! NAME          GET  LIST  WATCH
//! pods          yes  yes   no
//! nodes         no   n/a   no
//! ```

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Access state of a single (kind, verb) cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// The verb is allowed
    Allowed,
    /// The verb is denied
    Denied,
    /// The verb does not apply to this kind
    NotApplicable,
    /// The tool reported something unreadable for this cell
    Error,
}

impl PermissionState {
    /// Map a raw permission token, case-insensitively.
    ///
    /// Anything other than `yes`, `no` or `n/a` is an [`PermissionState::Error`].
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("yes") {
            Self::Allowed
        } else if token.eq_ignore_ascii_case("no") {
            Self::Denied
        } else if token.eq_ignore_ascii_case("n/a") {
            Self::NotApplicable
        } else {
            Self::Error
        }
    }

    /// Plain text form used in rendered tables
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Allowed => "yes",
            Self::Denied => "no",
            Self::NotApplicable => "n/a",
            Self::Error => "error",
        }
    }
}

/// Verb (lower-cased) to permission state for one resource kind.
///
/// Verbs the tool printed no cell for are absent.
pub type VerbPermissions = BTreeMap<String, PermissionState>;

/// One row of the matrix
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KindPermissions {
    /// Resource kind, verbatim from the tool
    pub kind: String,

    /// Permissions for this kind
    pub permissions: VerbPermissions,
}

/// Resource kind to verb permissions, in first-seen kind order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionMatrix {
    verbs: Vec<String>,
    kinds: Vec<KindPermissions>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl PermissionMatrix {
    /// Create an empty matrix with the given verb columns
    pub fn new(verbs: Vec<String>) -> Self {
        Self {
            verbs,
            kinds: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Insert a row.
    ///
    /// A repeated kind replaces the earlier permissions but keeps the
    /// position where the kind was first seen.
    pub fn insert(&mut self, kind: impl Into<String>, permissions: VerbPermissions) {
        let kind = kind.into();
        match self.index.get(&kind) {
            Some(&position) => self.kinds[position].permissions = permissions,
            None => {
                self.index.insert(kind.clone(), self.kinds.len());
                self.kinds.push(KindPermissions { kind, permissions });
            }
        }
    }

    /// Verb columns in header order
    pub fn verbs(&self) -> &[String] {
        &self.verbs
    }

    /// Rows in first-seen order
    pub fn kinds(&self) -> &[KindPermissions] {
        &self.kinds
    }

    /// Permissions for a kind
    pub fn get(&self, kind: &str) -> Option<&VerbPermissions> {
        self.index
            .get(kind)
            .map(|&position| &self.kinds[position].permissions)
    }

    /// State of a single cell, `None` if the kind is unknown or the cell unset
    pub fn permission(&self, kind: &str, verb: &str) -> Option<PermissionState> {
        self.get(kind).and_then(|p| p.get(verb)).copied()
    }

    /// Number of kinds
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    /// True when no kinds were parsed
    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// Parse `rakkess` ascii-table output into a [`PermissionMatrix`].
///
/// Returns an empty matrix when there is no header with at least one verb
/// or no data line after it.
pub fn parse_permission_table(text: &str) -> PermissionMatrix {
    let lines: Vec<Vec<&str>> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split_whitespace().collect())
        .collect();

    let Some((header, rows)) = lines.split_first() else {
        return PermissionMatrix::default();
    };
    if rows.is_empty() || header.len() < 2 {
        return PermissionMatrix::default();
    }

    let verbs: Vec<String> = header[1..].iter().map(|v| v.to_lowercase()).collect();
    let mut matrix = PermissionMatrix::new(verbs);

    for row in rows {
        let Some((kind, cells)) = row.split_first() else {
            continue;
        };
        // zip stops at the shorter side: missing cells stay unset, extra cells are dropped
        let permissions = matrix
            .verbs()
            .iter()
            .zip(cells)
            .map(|(verb, cell)| (verb.clone(), PermissionState::from_token(cell)))
            .collect();
        matrix.insert(*kind, permissions);
    }

    matrix
}
