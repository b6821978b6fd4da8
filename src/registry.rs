use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::classifier::Cascade;
use crate::error::{Error, Result};

/// Caller-owned collection of named cascades ("face", "eye", "mouth", ...).
///
/// Each entry is an `Arc`, so handing a cascade to several detectors or
/// threads never copies it.
#[derive(Debug, Default, Clone)]
pub struct ClassifierRegistry {
    classifiers: BTreeMap<String, Arc<Cascade>>,
}

impl ClassifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `cascade` under `name`, returning any cascade it replaces.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        cascade: impl Into<Arc<Cascade>>,
    ) -> Option<Arc<Cascade>> {
        self.classifiers.insert(name.into(), cascade.into())
    }

    /// Load a classifier file (see [`Cascade::load`]) and register it.
    pub fn load<P: AsRef<Path>>(&mut self, name: impl Into<String>, path: P) -> Result<Arc<Cascade>> {
        let cascade = Arc::new(Cascade::load(path)?);
        self.classifiers.insert(name.into(), Arc::clone(&cascade));
        Ok(cascade)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Cascade>> {
        self.classifiers.get(name).cloned()
    }

    /// Like [`ClassifierRegistry::get`], but an unknown name is an error.
    pub fn require(&self, name: &str) -> Result<Arc<Cascade>> {
        self.get(name)
            .ok_or_else(|| Error::InvalidClassifier(format!("no classifier named `{}`", name)))
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<Cascade>> {
        self.classifiers.remove(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classifiers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classifiers.is_empty()
    }
}
