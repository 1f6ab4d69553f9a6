//! Permanently-Denied Probe
//!
//! Combines platform signals with the decision store to answer the
//! orchestrator's `is_permanently_denied` question. From API level 30 a
//! single recorded denial means the system dialog will not show again, so
//! the store's flag is authoritative; on older levels the platform's
//! should-show-rationale signal is.

use permflow_core::platform::StatusProbe;

use crate::flags::DecisionFlag;
use crate::store::DecisionStore;

/// First API level where one denial implies "don't ask again".
pub const API_LEVEL_DENY_IS_FINAL: u32 = 30;

/// Signals the probe needs from the hosting platform.
pub trait PlatformSignals {
    /// True when the permission is currently granted.
    fn is_granted(&self, permission: &str) -> bool;

    /// The platform's should-show-rationale signal for the permission.
    fn should_show_rationale(&self, permission: &str) -> bool;

    /// Platform API level.
    fn api_level(&self) -> u32;
}

/// [`StatusProbe`] backed by platform signals plus the decision store.
pub struct CachedProbe<P> {
    platform: P,
    store: DecisionStore,
}

impl<P: PlatformSignals> CachedProbe<P> {
    /// Combine platform signals with a decision store.
    pub fn new(platform: P, store: DecisionStore) -> Self {
        Self { platform, store }
    }
}

impl<P: PlatformSignals> StatusProbe for CachedProbe<P> {
    fn is_granted(&self, permission: &str) -> bool {
        self.platform.is_granted(permission)
    }

    fn is_permanently_denied(&self, permission: &str) -> bool {
        if self.platform.is_granted(permission) {
            return false;
        }
        if self.platform.api_level() >= API_LEVEL_DENY_IS_FINAL {
            self.store.flag(permission) == DecisionFlag::Denied
        } else {
            !self.platform.should_show_rationale(permission)
        }
    }
}
