//! RAII ownership of a per-request Tab
//!
//! The guard is the only handle to its Tab, so no other request can observe
//! it. Normal paths call [`TabGuard::close`]; if the owning future is dropped
//! instead (caller cancelled, outer timeout), `Drop` spawns the close so the
//! Tab never outlives its request.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, trace};

use super::backend::Tab;

pub struct TabGuard<T: Tab> {
    tab: Option<T>,
    open_tabs: Arc<AtomicUsize>,
    label: String,
}

impl<T: Tab> TabGuard<T> {
    /// Take ownership of a freshly opened Tab and count it as open
    pub(crate) fn new(tab: T, open_tabs: Arc<AtomicUsize>, label: impl Into<String>) -> Self {
        open_tabs.fetch_add(1, Ordering::SeqCst);
        Self {
            tab: Some(tab),
            open_tabs,
            label: label.into(),
        }
    }

    pub(crate) fn tab(&self) -> Option<&T> {
        self.tab.as_ref()
    }

    /// Close the Tab and wait for it
    pub async fn close(mut self) {
        if let Some(tab) = self.tab.take() {
            tab.close().await;
            self.open_tabs.fetch_sub(1, Ordering::SeqCst);
            trace!("Closed tab [{}]", self.label);
        }
    }
}

impl<T: Tab> Drop for TabGuard<T> {
    fn drop(&mut self) {
        let Some(tab) = self.tab.take() else {
            return;
        };

        debug!("Tab [{}] dropped before close - closing in background", self.label);
        let open_tabs = Arc::clone(&self.open_tabs);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    tab.close().await;
                    open_tabs.fetch_sub(1, Ordering::SeqCst);
                });
            }
            Err(_) => {
                // No runtime left; the Tab dies with its Process
                drop(tab);
                open_tabs.fetch_sub(1, Ordering::SeqCst);
            }
        }
    }
}
