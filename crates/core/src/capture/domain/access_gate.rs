use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared camera-permission flag.
///
/// The host grants access once the platform has authorized it; sources
/// consult the gate before opening and before each capture. Clones observe
/// the same flag.
#[derive(Clone, Debug, Default)]
pub struct AccessGate {
    granted: Arc<AtomicBool>,
}

impl AccessGate {
    /// A gate that starts closed.
    pub fn new() -> Self {
        Self::default()
    }

    /// A gate that starts open, for hosts without a permission model.
    pub fn granted() -> Self {
        let gate = Self::new();
        gate.grant();
        gate
    }

    pub fn grant(&self) {
        self.granted.store(true, Ordering::Release);
    }

    pub fn revoke(&self) {
        self.granted.store(false, Ordering::Release);
    }

    pub fn is_granted(&self) -> bool {
        self.granted.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_closed() {
        assert!(!AccessGate::new().is_granted());
    }

    #[test]
    fn test_clones_share_state() {
        let gate = AccessGate::new();
        let observer = gate.clone();
        gate.grant();
        assert!(observer.is_granted());
        observer.revoke();
        assert!(!gate.is_granted());
    }

    #[test]
    fn test_granted_constructor() {
        assert!(AccessGate::granted().is_granted());
    }
}
