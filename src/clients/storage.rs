use std::{
    collections::HashMap,
    future::Future,
    sync::{Arc, Mutex},
};

use anyhow::{Error, Result, anyhow};

/// String key-value storage whose contents live as long as one client session.
pub trait SessionStorage: Send + 'static {
    fn get(&mut self, key: &str) -> impl Future<Output = Result<Option<String>, Error>> + Send;

    fn set(&mut self, key: &str, value: String) -> impl Future<Output = Result<(), Error>> + Send;

    fn health_check(&mut self) -> impl Future<Output = Result<(), Error>> + Send;
}

/// Process-local storage. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(key).cloned())
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl SessionStorage for MemoryStorage {
    async fn get(&mut self, key: &str) -> Result<Option<String>, Error> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("Session storage lock poisoned"))?;

        Ok(entries.get(key).cloned())
    }

    async fn set(&mut self, key: &str, value: String) -> Result<(), Error> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| anyhow!("Session storage lock poisoned"))?;

        entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn health_check(&mut self) -> Result<(), Error> {
        self.entries
            .lock()
            .map(|_| ())
            .map_err(|_| anyhow!("Session storage lock poisoned"))
    }
}
