//! Pull-based document provider
//!
//! The display surface can only *pull* text for an address, synchronously.
//! Producing the text means running an external tool, so the provider
//! splits every request into two phases:
//!
//! ```text
//! pull(address)            -> placeholder, resolution scheduled
//! resolution completes     -> text stored under address.token
//!                          -> changed(address) sent
//! pull(address)            -> text, entry removed
//! ```
//!
//! The change signal is sent only after the entry is stored, so the pull
//! it triggers always finds the entry. A resolution never fails: source
//! errors, and even a panicking source, are turned into failure text and
//! delivered through the same path.
//!
//! A token is resolved and delivered once. Pulling a token whose document
//! was already handed out returns the placeholder and schedules nothing; a
//! new request needs a freshly minted address.

use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tokio::runtime::{Handle, TryCurrentError};
use tokio::sync::mpsc;

use crate::address::{Address, RequestToken, Selector};
use crate::store::ResultStore;

/// Text returned while a document is being resolved
pub const PLACEHOLDER: &str = "## Loading...";

/// Produces document text for a selector
#[async_trait]
pub trait ContentSource: Send + Sync + 'static {
    /// Error produced when the content cannot be fetched
    type Error: fmt::Display + Send + 'static;

    /// Fetch and render the document for `selector`
    async fn produce(&self, selector: &Selector) -> Result<String, Self::Error>;

    /// Document shown when `produce` failed
    fn failure_text(&self, selector: &Selector, message: &str) -> String {
        format!("Error loading {selector}: {message}")
    }
}

/// Errors that can occur when creating a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Document provider needs a Tokio runtime: {0}")]
    NoRuntime(#[from] TryCurrentError),
}

/// Result of a single pull
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    /// Resolution is running; a change signal will follow
    Loading,
    /// The resolved text; the entry has been consumed
    Ready(String),
}

impl Document {
    /// Text to show for this pull
    pub fn into_text(self) -> String {
        match self {
            Self::Loading => PLACEHOLDER.to_string(),
            Self::Ready(text) => text,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Receives `changed(address)` signals
#[derive(Debug)]
pub struct ChangeEvents {
    rx: mpsc::UnboundedReceiver<Address>,
}

impl ChangeEvents {
    /// Wait for the next changed address
    pub async fn next(&mut self) -> Option<Address> {
        self.rx.recv().await
    }

    /// Wait until `address` changes, skipping signals for other addresses.
    ///
    /// Returns false if the provider is gone.
    pub async fn wait_for(&mut self, address: &Address) -> bool {
        while let Some(changed) = self.rx.recv().await {
            if &changed == address {
                return true;
            }
            tracing::trace!(changed = %changed, "Skipping change for another address");
        }
        false
    }
}

/// Where a token is in its single resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    /// Resolution task running
    Pending,
    /// Text stored, waiting for a pull
    Stored,
    /// Text handed out; the token is spent
    Delivered,
}

/// Pull-based provider over a [`ContentSource`]
pub struct DocumentProvider<S> {
    inner: Arc<ProviderInner<S>>,
}

struct ProviderInner<S> {
    source: Arc<S>,
    store: ResultStore,
    /// Lock order: `resolutions` before `store`
    resolutions: Mutex<HashMap<RequestToken, Resolution>>,
    changed: mpsc::UnboundedSender<Address>,
    runtime: Handle,
}

impl<S> Clone for DocumentProvider<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ContentSource> DocumentProvider<S> {
    /// Create a provider that resolves on the current Tokio runtime
    pub fn new(source: S) -> Result<(Self, ChangeEvents), ProviderError> {
        let runtime = Handle::try_current()?;
        Ok(Self::with_runtime(source, runtime))
    }

    /// Create a provider that resolves on the given runtime
    pub fn with_runtime(source: S, runtime: Handle) -> (Self, ChangeEvents) {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = Self {
            inner: Arc::new(ProviderInner {
                source: Arc::new(source),
                store: ResultStore::new(),
                resolutions: Mutex::new(HashMap::new()),
                changed: tx,
                runtime,
            }),
        };
        (provider, ChangeEvents { rx })
    }

    /// Build the address for a new logical request
    pub fn mint_address(&self, selector: Selector) -> Address {
        let address = Address::new(selector);
        tracing::debug!(address = %address, "Minted document address");
        address
    }

    /// Pull the text for `address`: the resolved document if it is waiting,
    /// otherwise [`PLACEHOLDER`].
    pub fn pull(&self, address: &Address) -> String {
        self.pull_document(address).into_text()
    }

    /// Pull, telling the placeholder apart from resolved text.
    ///
    /// A resolved document is handed out once. The first pull of a token
    /// schedules its resolution; later pulls never schedule another one,
    /// including pulls after the document was delivered.
    pub fn pull_document(&self, address: &Address) -> Document {
        let token = address.token();
        let mut resolutions = self.inner.resolutions();

        if let Some(text) = self.inner.store.take(token) {
            resolutions.insert(token, Resolution::Delivered);
            tracing::debug!(address = %address, "Delivering resolved document");
            return Document::Ready(text);
        }

        let first_pull = match resolutions.entry(token) {
            Entry::Vacant(entry) => {
                entry.insert(Resolution::Pending);
                true
            }
            Entry::Occupied(entry) => {
                tracing::trace!(address = %address, state = ?entry.get(), "Not rescheduling");
                false
            }
        };
        drop(resolutions);

        if first_pull {
            self.spawn_resolution(address);
        }
        Document::Loading
    }

    /// Check whether a resolution is running for a token
    pub fn is_resolving(&self, token: RequestToken) -> bool {
        self.inner.resolutions().get(&token) == Some(&Resolution::Pending)
    }

    /// Check whether the document for a token was already handed out
    pub fn is_delivered(&self, token: RequestToken) -> bool {
        self.inner.resolutions().get(&token) == Some(&Resolution::Delivered)
    }

    /// Documents resolved but not yet pulled
    pub fn pending(&self) -> usize {
        self.inner.store.len()
    }

    /// The content source this provider resolves with
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    fn spawn_resolution(&self, address: &Address) {
        tracing::debug!(address = %address, selector = %address.selector(), "Scheduling resolution");
        let inner = Arc::clone(&self.inner);
        let address = address.clone();
        self.inner.runtime.spawn(async move {
            inner.resolve(address).await;
        });
    }
}

impl<S: ContentSource> ProviderInner<S> {
    async fn resolve(&self, address: Address) {
        let source = Arc::clone(&self.source);
        let selector = address.selector().clone();

        // Run the source as its own task so a panic surfaces as a JoinError
        let produced = self
            .runtime
            .spawn(async move { source.produce(&selector).await.map_err(|e| e.to_string()) })
            .await;

        let text = match produced {
            Ok(Ok(text)) => text,
            Ok(Err(message)) => {
                tracing::warn!(address = %address, error = %message, "Resolution failed");
                self.source.failure_text(address.selector(), &message)
            }
            Err(join_error) => {
                tracing::error!(address = %address, error = %join_error, "Resolution task aborted");
                self.source
                    .failure_text(address.selector(), &join_error.to_string())
            }
        };

        {
            let mut resolutions = self.resolutions();
            if self.store.insert(address.token(), text).is_some() {
                tracing::warn!(address = %address, "Replaced a document that was never pulled");
            }
            resolutions.insert(address.token(), Resolution::Stored);
        }

        tracing::debug!(address = %address, "Document resolved");
        if self.changed.send(address).is_err() {
            tracing::debug!("No listener for change signals");
        }
    }

    fn resolutions(&self) -> MutexGuard<'_, HashMap<RequestToken, Resolution>> {
        self.resolutions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoSource {
        calls: AtomicUsize,
    }

    impl EchoSource {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ContentSource for EchoSource {
        type Error = String;

        async fn produce(&self, selector: &Selector) -> Result<String, String> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::task::yield_now().await;
            Ok(format!("{selector} #{call}"))
        }
    }

    #[tokio::test]
    async fn test_first_pull_is_placeholder() {
        let (provider, _events) = DocumentProvider::new(EchoSource::new()).unwrap();
        let address = provider.mint_address(Selector::Cluster);

        assert_eq!(provider.pull(&address), PLACEHOLDER);
        assert!(provider.is_resolving(address.token()));
    }

    #[tokio::test]
    async fn test_repeated_pulls_schedule_once() {
        let (provider, mut events) = DocumentProvider::new(EchoSource::new()).unwrap();
        let address = provider.mint_address(Selector::Cluster);

        assert_eq!(provider.pull_document(&address), Document::Loading);
        assert_eq!(provider.pull_document(&address), Document::Loading);
        assert!(events.wait_for(&address).await);

        assert_eq!(provider.source().calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.pull(&address), "cluster access #1");
    }

    #[tokio::test]
    async fn test_spent_token_is_never_resolved_again() {
        let (provider, mut events) = DocumentProvider::new(EchoSource::new()).unwrap();
        let address = provider.mint_address(Selector::Cluster);

        assert_eq!(provider.pull(&address), PLACEHOLDER);
        assert!(events.wait_for(&address).await);
        assert_eq!(provider.pull(&address), "cluster access #1");
        assert!(provider.is_delivered(address.token()));

        assert_eq!(provider.pull(&address), PLACEHOLDER);
        assert_eq!(provider.pull(&address), PLACEHOLDER);
        assert!(!provider.is_resolving(address.token()));
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }

        assert_eq!(provider.pull(&address), PLACEHOLDER);
        assert_eq!(provider.pending(), 0);
        assert_eq!(provider.source().calls.load(Ordering::SeqCst), 1);
        assert!(events.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_minted_tokens_are_unique() {
        let (provider, _events) = DocumentProvider::new(EchoSource::new()).unwrap();
        let tokens: std::collections::HashSet<RequestToken> = (0..10_000)
            .map(|_| provider.mint_address(Selector::Cluster).token())
            .collect();
        assert_eq!(tokens.len(), 10_000);
    }

    #[test]
    fn test_no_runtime_is_an_error() {
        let result = std::thread::spawn(|| DocumentProvider::new(EchoSource::new()).is_err())
            .join()
            .unwrap();
        assert!(result);
    }

    #[test]
    fn test_document_into_text() {
        assert_eq!(Document::Loading.into_text(), PLACEHOLDER);
        assert_eq!(Document::Ready("x".into()).into_text(), "x");
        assert!(!Document::Loading.is_ready());
    }
}
