/// Strategy Registry
///
/// Holds the verifiers enabled in configuration, keyed by method, together
/// with the "last used" marker shown on the login page.
use crate::auth::config::AuthenticationConfig;
use crate::auth::error::AuthError;
use crate::auth::providers::{Method, ProviderFactory, Verifier};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::{debug, info};

const NONE_USED: u8 = u8::MAX;

pub struct Registry {
    verifiers: BTreeMap<Method, Arc<dyn Verifier>>,
    // Index into Method::ALL of the last successful method, or NONE_USED
    last_used: AtomicU8,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            verifiers: BTreeMap::new(),
            last_used: AtomicU8::new(NONE_USED),
        }
    }

    /// Validate configuration and register every enabled method
    pub fn from_config(
        config: &AuthenticationConfig,
        callback_base: &str,
    ) -> Result<Self, AuthError> {
        config.validate()?;

        let mut registry = Self::new();
        for method in config.enabled_methods() {
            registry.register(ProviderFactory::create_verifier(
                method,
                config,
                callback_base,
            )?);
            info!("Registered {} authentication", method);
        }

        Ok(registry)
    }

    pub fn register(&mut self, verifier: Arc<dyn Verifier>) {
        self.verifiers.insert(verifier.method(), verifier);
    }

    pub fn get(&self, method: Method) -> Option<Arc<dyn Verifier>> {
        self.verifiers.get(&method).cloned()
    }

    pub fn methods(&self) -> Vec<Method> {
        self.verifiers.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.verifiers.is_empty()
    }

    pub fn is_exempt(&self, method: Method) -> bool {
        method.is_exempt()
    }

    /// Mark `method` as the one that last succeeded, clearing every other
    pub fn record_success(&self, method: Method) {
        if let Some(index) = Method::ALL.iter().position(|m| *m == method) {
            self.last_used.store(index as u8, Ordering::Relaxed);
            debug!("Marked {} as last used authentication", method);
        }
    }

    pub fn last_used(&self) -> Option<Method> {
        Method::ALL
            .get(self.last_used.load(Ordering::Relaxed) as usize)
            .copied()
    }

    pub fn used(&self, method: Method) -> bool {
        self.last_used() == Some(method)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
