#![allow(dead_code)]

use async_trait::async_trait;
use luminist_core::model::project::ProjectStateUpdate;
use luminist_core::persist::store::{ProjectStore, StoreError};
use luminist_core::scene::loader::{ImageLoader, LoadError, LoadedImage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::oneshot;

/// Loader answering from a size table, recording every requested locator.
#[derive(Default)]
pub struct FakeLoader {
    fallback: Option<(u32, u32)>,
    sizes: HashMap<String, (u32, u32)>,
    requests: Mutex<Vec<String>>,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl FakeLoader {
    /// Every locator resolves to `width` x `height`.
    pub fn uniform(width: u32, height: u32) -> Self {
        Self {
            fallback: Some((width, height)),
            ..Self::default()
        }
    }

    /// Every load fails.
    pub fn failing() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, locator: &str, width: u32, height: u32) -> Self {
        self.sizes.insert(locator.to_string(), (width, height));
        self
    }

    /// The next load waits until the returned sender fires.
    pub fn gated(mut self) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        self.gate = Mutex::new(Some(rx));
        (self, tx)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageLoader for FakeLoader {
    async fn load(&self, locator: &str) -> Result<LoadedImage, LoadError> {
        self.requests.lock().unwrap().push(locator.to_string());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let (width, height) = self
            .sizes
            .get(locator)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| LoadError::Unavailable(format!("no fixture for {locator}")))?;
        Ok(LoadedImage {
            locator: locator.to_string(),
            width,
            height,
        })
    }
}

/// Store that records accepted updates and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    updates: Mutex<Vec<ProjectStateUpdate>>,
    failures_left: AtomicUsize,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `count` writes fail.
    pub fn failing(count: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(count),
            ..Self::default()
        }
    }

    /// The next write waits until the returned sender fires.
    pub fn gated(mut self) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        self.gate = Mutex::new(Some(rx));
        (self, tx)
    }

    pub fn updates(&self) -> Vec<ProjectStateUpdate> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProjectStore for RecordingStore {
    async fn replace_state(&self, update: &ProjectStateUpdate) -> Result<(), StoreError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if failing {
            return Err(StoreError::Unavailable("write rejected".to_string()));
        }
        self.updates.lock().unwrap().push(update.clone());
        Ok(())
    }
}
