use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use crate::errors::ChatError;
use crate::model::ProviderId;
use crate::provider::ProviderAdapter;
use crate::session::{Session, SessionConfig};
use crate::transport::{HttpTransport, Transport};
use crate::vendors::compatible::CompatibleProvider;
use crate::vendors::dashscope::DashScopeProvider;

pub(crate) struct HarnessInner {
    providers: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
    transport: Arc<dyn Transport>,
}

impl HarnessInner {
    pub(crate) fn provider(&self, id: &ProviderId) -> Option<Arc<dyn ProviderAdapter>> {
        self.providers.get(id).cloned()
    }

    pub(crate) fn transport(&self) -> Arc<dyn Transport> {
        self.transport.clone()
    }
}

/// Registered providers plus the transport they share.
///
/// Cheap to clone; every clone sees the same registry.
#[derive(Clone)]
pub struct Harness {
    pub(crate) inner: Arc<HarnessInner>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Harness with both DashScope protocols registered (`bailian` and
    /// `deepseek`) and credentials read from the environment per request.
    pub fn from_env() -> Result<Self, ChatError> {
        Self::builder()
            .register_provider(Arc::new(DashScopeProvider::from_env()))
            .register_provider(Arc::new(CompatibleProvider::from_env()))
            .build()
    }

    pub fn session(&self, config: SessionConfig) -> Session {
        Session::new(self.inner.clone(), config)
    }

    /// Returns `true` when a provider with this id is registered.
    pub fn has_provider(&self, id: &ProviderId) -> bool {
        self.inner.providers.contains_key(id)
    }

    /// Generates a short conversation title for `message`.
    ///
    /// Never fails; see [`crate::title::generate_title`].
    pub async fn generate_title(&self, message: &str) -> String {
        crate::title::generate_title(self, message).await
    }
}

/// Collects adapters and an optional transport override.
#[derive(Default)]
pub struct HarnessBuilder {
    providers: Vec<Arc<dyn ProviderAdapter>>,
    transport: Option<Arc<dyn Transport>>,
}

impl HarnessBuilder {
    /// Adds an adapter under its own provider id.
    pub fn register_provider(mut self, provider: Arc<dyn ProviderAdapter>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Replaces the default `reqwest` transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Fails when two adapters share a provider id.
    pub fn build(self) -> Result<Harness, ChatError> {
        let mut providers = HashMap::with_capacity(self.providers.len());
        for provider in self.providers {
            match providers.entry(provider.id()) {
                Entry::Occupied(slot) => {
                    return Err(ChatError::Config(format!(
                        "duplicate provider registration: {}",
                        slot.key()
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert(provider);
                }
            }
        }
        let transport = self
            .transport
            .unwrap_or_else(|| Arc::new(HttpTransport::new()) as Arc<dyn Transport>);
        Ok(Harness {
            inner: Arc::new(HarnessInner {
                providers,
                transport,
            }),
        })
    }
}
