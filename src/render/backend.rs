use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::{ChartError, ChartResult};
use crate::render::device::{BackendPreference, RenderBackend, RenderDevice};
use crate::render::headless::HeadlessDevice;

/// Default priority for providers that do not override
/// [`BackendProvider::priority`].
pub const DEFAULT_PROVIDER_PRIORITY: i32 = 50;

/// Factory for one backend kind.
///
/// `is_available` must be a cheap host check (library present, feature
/// compiled in); it must not create a GPU context.
pub trait BackendProvider {
    fn backend(&self) -> RenderBackend;

    fn is_available(&self) -> bool;

    /// Higher wins when resolving [`BackendPreference::Auto`].
    fn priority(&self) -> i32 {
        DEFAULT_PROVIDER_PRIORITY
    }

    fn create_device(&self, width: u32, height: u32) -> ChartResult<Box<dyn RenderDevice>>;
}

/// Provider for [`HeadlessDevice`]; always available, lowest priority.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeadlessProvider;

impl BackendProvider for HeadlessProvider {
    fn backend(&self) -> RenderBackend {
        RenderBackend::Headless
    }

    fn is_available(&self) -> bool {
        true
    }

    fn priority(&self) -> i32 {
        0
    }

    fn create_device(&self, _width: u32, _height: u32) -> ChartResult<Box<dyn RenderDevice>> {
        Ok(Box::new(HeadlessDevice::new()))
    }
}

/// Backends known to the application, built explicitly at startup.
pub struct BackendRegistry {
    providers: IndexMap<RenderBackend, Box<dyn BackendProvider>>,
}

impl BackendRegistry {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            providers: IndexMap::new(),
        }
    }

    /// Registry holding the providers compiled into this crate.
    #[must_use]
    pub fn with_builtin_providers() -> Self {
        let mut registry = Self::empty();
        registry.register(HeadlessProvider);
        #[cfg(feature = "cairo-backend")]
        registry.register(crate::render::cairo_backend::CairoProvider);
        registry
    }

    /// Adds `provider`, replacing any provider for the same backend.
    pub fn register(&mut self, provider: impl BackendProvider + 'static) {
        let backend = provider.backend();
        debug!(
            backend = %backend,
            priority = provider.priority(),
            "registered backend provider"
        );
        self.providers.insert(backend, Box::new(provider));
    }

    #[must_use]
    pub fn is_registered(&self, backend: RenderBackend) -> bool {
        self.providers.contains_key(&backend)
    }

    #[must_use]
    pub fn is_available(&self, backend: RenderBackend) -> bool {
        self.providers
            .get(&backend)
            .is_some_and(|provider| provider.is_available())
    }

    /// Available backends in registration order.
    #[must_use]
    pub fn available_backends(&self) -> Vec<RenderBackend> {
        self.providers
            .values()
            .filter(|provider| provider.is_available())
            .map(|provider| provider.backend())
            .collect()
    }

    /// Highest-priority available backend. Ties keep the earlier
    /// registration.
    pub fn detect_best(&self) -> ChartResult<RenderBackend> {
        let mut best: Option<&dyn BackendProvider> = None;
        for provider in self.providers.values() {
            if !provider.is_available() {
                continue;
            }
            if best.is_none_or(|current| provider.priority() > current.priority()) {
                best = Some(provider.as_ref());
            }
        }

        let best = best.ok_or_else(|| ChartError::BackendUnavailable {
            backend: "auto".to_owned(),
            available: Vec::new(),
        })?;
        debug!(
            backend = %best.backend(),
            priority = best.priority(),
            "auto-selected backend"
        );
        Ok(best.backend())
    }

    /// Resolves `preference` and builds an uninitialized device.
    pub fn create_device(
        &self,
        preference: BackendPreference,
        width: u32,
        height: u32,
    ) -> ChartResult<Box<dyn RenderDevice>> {
        let backend = match preference {
            BackendPreference::Auto => self.detect_best()?,
            BackendPreference::Specific(backend) => backend,
        };

        let provider = self
            .providers
            .get(&backend)
            .filter(|provider| provider.is_available())
            .ok_or_else(|| ChartError::BackendUnavailable {
                backend: backend.name().to_owned(),
                available: self
                    .available_backends()
                    .into_iter()
                    .map(|b| b.name().to_owned())
                    .collect(),
            })?;

        debug!(backend = %backend, width, height, "creating render device");
        provider.create_device(width, height)
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::with_builtin_providers()
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendRegistry")
            .field("registered", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}
