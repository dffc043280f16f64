// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, bail};
use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::MessagingConfig;

pub const LISTINGS_KEY: &str = "inventory.listings";
pub const MESSAGING_KEY: &str = "messaging.config";

/// Key/value persistence for the catalog. Values are JSON documents.
pub trait DurableStorage {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&self, key: &str, value: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RefCell<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(key: &str, value: &str) -> Self {
        let storage = Self::new();
        storage
            .entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        storage
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }
}

impl DurableStorage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.raw(key))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }
}

impl<S: DurableStorage + ?Sized> DurableStorage for &S {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        (**self).save(key, value)
    }
}

/// Reads the stored messaging config. Missing or unreadable data yields
/// `None` so the caller can fall back to its configured default.
pub fn load_messaging_config<S: DurableStorage + ?Sized>(storage: &S) -> Option<MessagingConfig> {
    let raw = match storage.load(MESSAGING_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return None,
        Err(error) => {
            tracing::warn!(error = ?error, "messaging config unreadable");
            return None;
        }
    };
    match serde_json::from_str::<MessagingConfig>(&raw) {
        Ok(config) if !config.destination.trim().is_empty() => Some(config),
        Ok(_) => None,
        Err(error) => {
            tracing::warn!(%error, "messaging config corrupt; using default");
            None
        }
    }
}

pub fn save_messaging_config<S: DurableStorage + ?Sized>(
    storage: &S,
    config: &MessagingConfig,
) -> Result<()> {
    if config.destination.trim().is_empty() {
        bail!("messaging destination must not be empty -- enter a phone number and retry");
    }
    let encoded = serde_json::to_string(config).context("encode messaging config")?;
    storage.save(MESSAGING_KEY, &encoded)
}
