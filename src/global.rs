//! Process-wide registry with reference-counted lifetime.
//!
//! The first [`initialise`] builds the registry, every [`deinitialise`] drops
//! a reference, and the last one tears the registry down, unloading any
//! plugin modules it owns. Lookups and dispatch share a read lock, so any
//! number of threads can use the registry at once; lifetime changes and
//! [`with_registry_mut`] take the write lock.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::ImageError;
use crate::registry::PluginRegistry;

struct Shared {
    refs: usize,
    registry: PluginRegistry,
}

static GLOBAL: RwLock<Option<Shared>> = RwLock::new(None);

fn read() -> RwLockReadGuard<'static, Option<Shared>> {
    GLOBAL.read().unwrap_or_else(PoisonError::into_inner)
}

fn write() -> RwLockWriteGuard<'static, Option<Shared>> {
    GLOBAL.write().unwrap_or_else(PoisonError::into_inner)
}

/// Take a reference on the global registry, creating it if needed.
///
/// Returns the new reference count.
pub fn initialise() -> usize {
    initialise_with(|_| {})
}

/// Like [`initialise`], running `setup` on the fresh registry when this call
/// creates it. Later calls only bump the count.
pub fn initialise_with(setup: impl FnOnce(&mut PluginRegistry)) -> usize {
    let mut global = write();
    match global.as_mut() {
        Some(shared) => {
            shared.refs += 1;
            shared.refs
        }
        None => {
            let mut registry = PluginRegistry::new();
            setup(&mut registry);
            tracing::debug!(formats = registry.len(), "global plugin registry created");
            *global = Some(Shared { refs: 1, registry });
            1
        }
    }
}

/// Release a reference. Returns the remaining count; 0 means the registry
/// is gone (or never existed).
pub fn deinitialise() -> usize {
    let mut global = write();
    let Some(shared) = global.as_mut() else {
        return 0;
    };
    shared.refs -= 1;
    let refs = shared.refs;
    if refs == 0 {
        if let Some(shared) = global.take() {
            tracing::debug!(formats = shared.registry.len(), "global plugin registry destroyed");
        }
    }
    refs
}

/// Whether the global registry currently exists.
pub fn is_initialised() -> bool {
    read().is_some()
}

/// Run `f` against the global registry under the shared read lock.
///
/// Other readers proceed while `f` runs. `f` must not call
/// [`initialise`], [`deinitialise`] or [`with_registry_mut`], which wait for
/// every reader to leave.
pub fn with_registry<R>(f: impl FnOnce(&PluginRegistry) -> R) -> Result<R, ImageError> {
    let global = read();
    let shared = global.as_ref().ok_or(ImageError::NotInitialised)?;
    Ok(f(&shared.registry))
}

/// Run `f` with mutable access to the global registry, excluding all
/// readers.
pub fn with_registry_mut<R>(f: impl FnOnce(&mut PluginRegistry) -> R) -> Result<R, ImageError> {
    let mut global = write();
    let shared = global.as_mut().ok_or(ImageError::NotInitialised)?;
    Ok(f(&mut shared.registry))
}
