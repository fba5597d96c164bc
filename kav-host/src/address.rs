//! Document addresses and request tokens
//!
//! An address has the form `scheme://authority/path?token`:
//!
//! ```text
//! rakkess://cluster/?<token>
//! rakkess://namespace/<namespace>?<token>
//! whocan://verb/<verb>/<resource>?<token>
//! ```
//!
//! The token is minted fresh for every logical request and is the only key
//! the document provider uses, so two requests for the same selector never
//! see each other's results.

use std::fmt;
use uuid::Uuid;

/// Scheme for `rakkess` permission matrices
pub const ACCESS_SCHEME: &str = "rakkess";

/// Scheme for `kubectl-who-can` listings
pub const WHOCAN_SCHEME: &str = "whocan";

const CLUSTER_AUTHORITY: &str = "cluster";
const NAMESPACE_AUTHORITY: &str = "namespace";
const VERB_AUTHORITY: &str = "verb";

/// What a request fetches
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    /// Cluster-wide permission matrix
    Cluster,
    /// Permission matrix scoped to one namespace
    Namespace(String),
    /// Subjects allowed to perform `verb` on `resource`
    WhoCan { verb: String, resource: String },
}

impl Selector {
    /// Build a who-can selector
    pub fn who_can(verb: impl Into<String>, resource: impl Into<String>) -> Self {
        Self::WhoCan {
            verb: verb.into(),
            resource: resource.into(),
        }
    }

    /// URI scheme, which tells the two source tools apart
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Cluster | Self::Namespace(_) => ACCESS_SCHEME,
            Self::WhoCan { .. } => WHOCAN_SCHEME,
        }
    }

    fn authority(&self) -> &'static str {
        match self {
            Self::Cluster => CLUSTER_AUTHORITY,
            Self::Namespace(_) => NAMESPACE_AUTHORITY,
            Self::WhoCan { .. } => VERB_AUTHORITY,
        }
    }

    fn path(&self) -> String {
        match self {
            Self::Cluster => "/".to_string(),
            Self::Namespace(namespace) => format!("/{namespace}"),
            Self::WhoCan { verb, resource } => format!("/{verb}/{resource}"),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cluster => write!(f, "cluster access"),
            Self::Namespace(namespace) => write!(f, "access in namespace {namespace}"),
            Self::WhoCan { verb, resource } => write!(f, "who can {verb} {resource}"),
        }
    }
}

/// Single-use identifier of one logical request.
///
/// Tokens only need to be unique, not secret; a random v4 UUID is plenty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(Uuid);

impl RequestToken {
    /// Mint a fresh token
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RequestToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// A selector plus the token of the request it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    selector: Selector,
    token: RequestToken,
}

impl Address {
    /// Address a new request for `selector`
    pub fn new(selector: Selector) -> Self {
        Self {
            selector,
            token: RequestToken::new(),
        }
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{}?{}",
            self.selector.scheme(),
            self.selector.authority(),
            self.selector.path(),
            self.token
        )
    }
}

/// Invocation context as the command line sees it, before it is known
/// whether it names something the viewer can fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// The whole cluster
    Cluster,
    /// A namespace
    Namespace(String),
    /// A resource kind or `kind/name`; needs a verb to become a who-can request
    Resource(String),
    /// Nothing usable
    Unresolved,
}

impl Target {
    /// Interpret `cluster`, `namespace/<ns>` (or `ns/<ns>`), or any other
    /// non-empty text as a resource.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return Self::Unresolved;
        }
        if text == CLUSTER_AUTHORITY {
            return Self::Cluster;
        }
        match text
            .strip_prefix("namespace/")
            .or_else(|| text.strip_prefix("ns/"))
        {
            Some("") => Self::Unresolved,
            Some(namespace) => Self::Namespace(namespace.to_string()),
            None => Self::Resource(text.to_string()),
        }
    }

    /// Resolve to a selector; resources need a verb.
    pub fn selector(self, verb: Option<&str>) -> Option<Selector> {
        match self {
            Self::Cluster => Some(Selector::Cluster),
            Self::Namespace(namespace) => Some(Selector::Namespace(namespace)),
            Self::Resource(resource) => verb
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|verb| Selector::who_can(verb, resource)),
            Self::Unresolved => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_address_display() {
        let token = RequestToken(Uuid::from_u128(0x67e5504410b1426f9247bb680e5fe0c8));
        let at = |selector| Address { selector, token };

        let cluster = at(Selector::Cluster);
        assert_eq!(
            cluster.to_string(),
            "rakkess://cluster/?67e5504410b1426f9247bb680e5fe0c8"
        );

        let namespace = at(Selector::Namespace("dev".into()));
        assert_eq!(
            namespace.to_string(),
            "rakkess://namespace/dev?67e5504410b1426f9247bb680e5fe0c8"
        );

        let who_can = at(Selector::who_can("get", "pods"));
        assert_eq!(
            who_can.to_string(),
            "whocan://verb/get/pods?67e5504410b1426f9247bb680e5fe0c8"
        );
    }

    #[test]
    fn test_tokens_are_unique() {
        let tokens: HashSet<RequestToken> = (0..10_000)
            .map(|_| Address::new(Selector::Cluster).token())
            .collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_same_selector_gets_distinct_tokens() {
        let a = Address::new(Selector::Namespace("dev".into()));
        let b = Address::new(Selector::Namespace("dev".into()));
        assert_eq!(a.selector(), b.selector());
        assert_ne!(a.token(), b.token());
        assert_ne!(a, b);
    }

    #[test]
    fn test_target_parse() {
        assert_eq!(Target::parse("cluster"), Target::Cluster);
        assert_eq!(Target::parse("namespace/dev"), Target::Namespace("dev".into()));
        assert_eq!(Target::parse("ns/kube-system"), Target::Namespace("kube-system".into()));
        assert_eq!(Target::parse("ns/"), Target::Unresolved);
        assert_eq!(Target::parse("  "), Target::Unresolved);
        assert_eq!(Target::parse("pods/web-0"), Target::Resource("pods/web-0".into()));
    }

    #[test]
    fn test_target_selector() {
        assert_eq!(Target::Cluster.selector(Some("get")), Some(Selector::Cluster));
        assert_eq!(
            Target::Namespace("dev".into()).selector(None),
            Some(Selector::Namespace("dev".into()))
        );
        assert_eq!(
            Target::Resource("pods".into()).selector(Some("list")),
            Some(Selector::who_can("list", "pods"))
        );
        assert_eq!(Target::Resource("pods".into()).selector(None), None);
        assert_eq!(Target::Resource("pods".into()).selector(Some(" ")), None);
        assert_eq!(Target::Unresolved.selector(Some("get")), None);
    }
}
