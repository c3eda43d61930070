//! Process-wide bypass manager.
//!
//! These free functions wrap a lazily created `BypassManager` with default
//! configuration so that independent subsystems (device drivers and guest
//! interrupt injectors) can meet without sharing a handle. All of them go
//! through the same manager and therefore the same lock.

use std::sync::{Arc, LazyLock};

use crate::error::BypassResult;
use crate::manager::{BypassManager, BypassStats};
use crate::participant::{BypassConsumer, BypassProducer};
use crate::token::Token;

static GLOBAL_MANAGER: LazyLock<BypassManager> = LazyLock::new(BypassManager::new);

/// The process-wide manager.
pub fn global() -> &'static BypassManager {
    &GLOBAL_MANAGER
}

/// Register a producer with the process-wide manager.
///
/// See [`BypassManager::register_producer`].
pub fn register_producer(producer: Arc<dyn BypassProducer>) -> BypassResult<()> {
    GLOBAL_MANAGER.register_producer(producer)
}

/// Unregister a producer from the process-wide manager.
pub fn unregister_producer(producer: &dyn BypassProducer) {
    GLOBAL_MANAGER.unregister_producer(producer)
}

/// Register a consumer with the process-wide manager.
///
/// See [`BypassManager::register_consumer`].
pub fn register_consumer(consumer: Arc<dyn BypassConsumer>) -> BypassResult<()> {
    GLOBAL_MANAGER.register_consumer(consumer)
}

/// Unregister a consumer from the process-wide manager.
pub fn unregister_consumer(consumer: &dyn BypassConsumer) {
    GLOBAL_MANAGER.unregister_consumer(consumer)
}

/// Whether `token` is connected in the process-wide manager.
pub fn is_connected(token: Token) -> bool {
    GLOBAL_MANAGER.is_connected(token)
}

/// Statistics of the process-wide manager.
pub fn stats() -> BypassStats {
    GLOBAL_MANAGER.stats()
}
