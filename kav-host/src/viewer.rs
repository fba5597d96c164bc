//! A display surface that drives the pull protocol
//!
//! The viewer behaves like a markdown preview: it pulls an address, shows
//! whatever it gets, and pulls again whenever the provider signals that the
//! address changed.

use crate::address::{Address, Selector};
use crate::provider::{ChangeEvents, ContentSource, Document, DocumentProvider, PLACEHOLDER};

/// Pull-only consumer of a [`DocumentProvider`]
pub struct Viewer<S> {
    provider: DocumentProvider<S>,
    events: ChangeEvents,
}

impl<S: ContentSource> Viewer<S> {
    pub fn new(provider: DocumentProvider<S>, events: ChangeEvents) -> Self {
        Self { provider, events }
    }

    pub fn provider(&self) -> &DocumentProvider<S> {
        &self.provider
    }

    /// Open a new request for `selector` and wait for its document.
    pub async fn open(&mut self, selector: Selector, on_loading: impl FnMut(&str)) -> String {
        let address = self.provider.mint_address(selector);
        self.show(&address, on_loading).await
    }

    /// Show `address`: pull, and while the placeholder comes back, report it
    /// through `on_loading` and pull again after the next change signal.
    pub async fn show(&mut self, address: &Address, mut on_loading: impl FnMut(&str)) -> String {
        loop {
            match self.provider.pull_document(address) {
                Document::Ready(text) => return text,
                Document::Loading => on_loading(PLACEHOLDER),
            }
            if !self.events.wait_for(address).await {
                tracing::warn!(address = %address, "Change signals closed before the document resolved");
                return PLACEHOLDER.to_string();
            }
        }
    }
}
