//! Patient Context Core Library
//!
//! Decides which patient record is "in focus" for a clinic app tab and keeps
//! that choice consistent across reloads and sibling tabs.
//!
//! # Architecture
//!
//! ```text
//!   Navigation (route ready, ?id=...)        Other tab writes a slot
//!                 │                                    │
//!                 ▼                                    ▼
//!   ┌───────────────────────────┐        ┌───────────────────────────┐
//!   │     ContextResolver       │◄───────│   CrossTabSynchronizer    │
//!   │  query id > known slots   │        │  known slot? new value?   │
//!   └─────────────┬─────────────┘        └───────────────────────────┘
//!                 │ adopt (only if changed)
//!                 ▼
//!   ┌───────────────────────────┐
//!   │  Mirror to every slot     │──► OriginStorage ──► StorageEvent to other tabs
//!   │  Notify observers / body  │
//!   └───────────────────────────┘
//! ```
//!
//! # Core Principle
//!
//! **Storage is a cache, never a system of record.** Nothing in the resolve
//! path fails; storage problems degrade to "nothing stored".
//!
//! # Modules
//!
//! - [`models`]: Domain types (PatientId, ContextState, RouteState, etc.)
//! - [`normalizer`]: Identifier parsing, UUID validation and storage encoding
//! - [`store`]: Best-effort slot storage shared by the tabs of an origin
//! - [`resolver`]: Active patient resolution and slot mirroring
//! - [`sync`]: Cross-tab synchronization
//! - [`config`]: Slot layout and resolver settings

pub mod config;
pub mod models;
pub mod normalizer;
pub mod resolver;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use config::{ContextConfig, SlotSet};
pub use models::{ContextState, PatientId, QueryValue, RouteState, StorageEvent, ViewTarget};
pub use normalizer::{encode_for_store, is_valid_uuid, parse_stored, Normalizer};
pub use resolver::{BodyAttributes, ContextResolver, ObserverId};
pub use store::{KeyStore, MemoryBackend, OriginStorage, SqliteBackend};
pub use sync::CrossTabSynchronizer;

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

use tracing_subscriber::EnvFilter;

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum PatientContextError {
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<store::StoreError> for PatientContextError {
    fn from(e: store::StoreError) -> Self {
        PatientContextError::StorageError(e.to_string())
    }
}

impl From<config::ConfigError> for PatientContextError {
    fn from(e: config::ConfigError) -> Self {
        PatientContextError::ConfigError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for PatientContextError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        PatientContextError::LockPoisoned(e.to_string())
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `filter`; both fall back to
/// [`config::DEFAULT_LOG_FILTER`]. Returns `false` if a subscriber was
/// already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    let fallback = filter.unwrap_or_else(|| config::DEFAULT_LOG_FILTER.to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .try_init()
        .is_ok()
}

/// Check a value against the canonical UUID v1-v5 shape.
#[uniffi::export]
pub fn is_valid_patient_uuid(value: String) -> bool {
    is_valid_uuid(&value)
}

/// Open a context whose slots live in memory only.
#[uniffi::export]
pub fn open_context_in_memory(
    config_json: Option<String>,
) -> Result<Arc<PatientContextCore>, PatientContextError> {
    let config = parse_config(config_json)?;
    let store = OriginStorage::in_memory().open_tab();
    Ok(Arc::new(PatientContextCore::new(store, config)))
}

/// Open a context whose slots persist in a SQLite file.
#[uniffi::export]
pub fn open_context(
    path: String,
    config_json: Option<String>,
) -> Result<Arc<PatientContextCore>, PatientContextError> {
    let config = parse_config(config_json)?;
    let backend = SqliteBackend::open(&path)?;
    let store = OriginStorage::new(backend).open_tab();
    tracing::info!(path = path.as_str(), "Opened persistent patient context");
    Ok(Arc::new(PatientContextCore::new(store, config)))
}

fn saturating_count(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}

fn parse_config(config_json: Option<String>) -> Result<ContextConfig, PatientContextError> {
    match config_json {
        Some(json) => Ok(ContextConfig::from_json_str(&json)?),
        None => Ok(ContextConfig::default()),
    }
}

// =========================================================================
// Main API Object
// =========================================================================

/// One tab's patient context, thread-safe for FFI.
#[derive(uniffi::Object)]
pub struct PatientContextCore {
    config: ContextConfig,
    resolver: Mutex<ContextResolver>,
    sync: Mutex<CrossTabSynchronizer>,
}

impl PatientContextCore {
    fn new(store: KeyStore, config: ContextConfig) -> Self {
        let sync = CrossTabSynchronizer::attach(&store);
        let resolver = ContextResolver::new(store, &config);
        Self {
            config,
            resolver: Mutex::new(resolver),
            sync: Mutex::new(sync),
        }
    }
}

#[uniffi::export]
impl PatientContextCore {
    // =========================================================================
    // Tabs
    // =========================================================================

    /// Open another tab sharing this tab's storage origin.
    pub fn open_tab(&self) -> Result<Arc<PatientContextCore>, PatientContextError> {
        let resolver = self.resolver.lock()?;
        let store = resolver.store().open_sibling_tab();
        Ok(Arc::new(PatientContextCore::new(store, self.config.clone())))
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the active patient for a navigation event.
    pub fn navigate(&self, route: FfiRoute) -> Result<Option<String>, PatientContextError> {
        let mut resolver = self.resolver.lock()?;
        resolver.on_navigation(&route.into());
        Ok(resolver.active().map(PatientId::to_string))
    }

    /// Adopt a patient picked elsewhere in the UI.
    pub fn select_patient(&self, patient_id: String) -> Result<bool, PatientContextError> {
        let mut resolver = self.resolver.lock()?;
        Ok(resolver.select_patient(&patient_id))
    }

    /// Clear the selection and every stored slot.
    pub fn clear_selection(&self) -> Result<(), PatientContextError> {
        let mut resolver = self.resolver.lock()?;
        resolver.clear();
        Ok(())
    }

    /// Currently active patient id.
    pub fn active_patient_id(&self) -> Result<Option<String>, PatientContextError> {
        let resolver = self.resolver.lock()?;
        Ok(resolver.active().map(PatientId::to_string))
    }

    /// Whether routing information has been seen yet.
    pub fn is_resolved(&self) -> Result<bool, PatientContextError> {
        let resolver = self.resolver.lock()?;
        Ok(resolver.state().is_resolved())
    }

    // =========================================================================
    // Cross-tab
    // =========================================================================

    /// Fold a storage change reported by the host into this tab.
    pub fn handle_storage_event(
        &self,
        key: String,
        new_value: Option<String>,
    ) -> Result<bool, PatientContextError> {
        let mut resolver = self.resolver.lock()?;
        let event = StorageEvent { key, new_value };
        Ok(CrossTabSynchronizer::handle_event(&mut resolver, &event))
    }

    /// Process storage changes made by sibling tabs.
    pub fn pump_storage_events(&self) -> Result<u32, PatientContextError> {
        let sync = self.sync.lock()?;
        let mut resolver = self.resolver.lock()?;
        Ok(saturating_count(sync.pump(&mut resolver)))
    }

    // =========================================================================
    // View outputs
    // =========================================================================

    /// Body attribute mirroring the active patient.
    pub fn body_attribute(&self) -> Result<FfiBodyAttribute, PatientContextError> {
        let resolver = self.resolver.lock()?;
        let (name, value) = resolver.body_attribute();
        Ok(FfiBodyAttribute {
            name: name.to_string(),
            value: value.map(str::to_string),
        })
    }

    /// What a patient-scoped view should render.
    pub fn view_target(
        &self,
        signed_in_user_id: String,
    ) -> Result<FfiViewTarget, PatientContextError> {
        let resolver = self.resolver.lock()?;
        Ok(resolver.view_target(&signed_in_user_id).into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe query parameter; one value for scalars, several for repeats.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiQueryParam {
    pub key: String,
    pub values: Vec<String>,
}

/// FFI-safe route state.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiRoute {
    pub ready: bool,
    pub query: Vec<FfiQueryParam>,
}

impl From<FfiRoute> for RouteState {
    fn from(route: FfiRoute) -> Self {
        let query = route
            .query
            .into_iter()
            .map(|param| {
                let value = match <[String; 1]>::try_from(param.values) {
                    Ok([single]) => QueryValue::Single(single),
                    Err(values) => QueryValue::Many(values),
                };
                (param.key, value)
            })
            .collect();
        RouteState {
            ready: route.ready,
            query,
        }
    }
}

/// FFI-safe body attribute.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiBodyAttribute {
    pub name: String,
    pub value: Option<String>,
}

/// FFI-safe view target.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum FfiViewTarget {
    Patient { patient_id: String },
    SelfProfile { user_id: String },
}

impl From<ViewTarget> for FfiViewTarget {
    fn from(target: ViewTarget) -> Self {
        match target {
            ViewTarget::Patient { id } => FfiViewTarget::Patient {
                patient_id: id.into_inner(),
            },
            ViewTarget::SelfProfile { user_id } => FfiViewTarget::SelfProfile { user_id },
        }
    }
}
