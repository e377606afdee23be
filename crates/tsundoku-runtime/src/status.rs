//! Busy flags for the long-running background services.
//!
//! Each service owns its flag and raises it for as long as it holds a
//! [`BusyGuard`]. Everyone else only reads through [`ServiceStatus`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Background services whose activity the settings screen cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    /// Library import / refresh / storage folder change.
    Import,
    /// Download of an application update.
    UpdateDownload,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::UpdateDownload => "update-download",
        }
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait ServiceStatus: Send + Sync {
    fn is_running(&self, service: Service) -> bool;
}

/// Shared registry of busy flags.
#[derive(Debug, Clone, Default)]
pub struct ServiceFlags {
    import: Arc<AtomicBool>,
    update_download: Arc<AtomicBool>,
}

impl ServiceFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `service` as running until the returned guard is dropped.
    ///
    /// Returns `None` when the service is already running.
    pub fn try_start(&self, service: Service) -> Option<BusyGuard> {
        let flag = self.flag(service);
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        tracing::debug!(service = %service, "Service started");
        Some(BusyGuard {
            flag: Arc::clone(flag),
            service,
        })
    }

    fn flag(&self, service: Service) -> &Arc<AtomicBool> {
        match service {
            Service::Import => &self.import,
            Service::UpdateDownload => &self.update_download,
        }
    }
}

impl ServiceStatus for ServiceFlags {
    fn is_running(&self, service: Service) -> bool {
        self.flag(service).load(Ordering::Acquire)
    }
}

/// Clears the service's busy flag on drop.
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
    service: Service,
}

impl BusyGuard {
    pub fn service(&self) -> Service {
        self.service
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        tracing::debug!(service = %self.service, "Service finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_raises_and_clears_flag() {
        let flags = ServiceFlags::new();
        assert!(!flags.is_running(Service::Import));

        let guard = flags.try_start(Service::Import).unwrap();
        assert_eq!(guard.service(), Service::Import);
        assert!(flags.is_running(Service::Import));
        assert!(!flags.is_running(Service::UpdateDownload));

        drop(guard);
        assert!(!flags.is_running(Service::Import));
    }

    #[test]
    fn test_second_start_is_refused() {
        let flags = ServiceFlags::new();
        let _guard = flags.try_start(Service::UpdateDownload).unwrap();
        assert!(flags.try_start(Service::UpdateDownload).is_none());
    }

    #[test]
    fn test_clones_share_flags() {
        let flags = ServiceFlags::new();
        let observer = flags.clone();
        let _guard = flags.try_start(Service::Import).unwrap();
        assert!(observer.is_running(Service::Import));
    }
}
