// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Access to the store owning the topology objects

use crate::errors::TopologyError;
use crate::forwarder::ServiceFunctionForwarder;
use crate::function::ServiceFunction;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Read access to service functions and forwarders by name.
///
/// Implementations may block (e.g. on a remote data store).
pub trait TopologyStore: Send + Sync {
    fn function(&self, name: &str) -> Option<Arc<ServiceFunction>>;
    fn forwarder(&self, name: &str) -> Option<Arc<ServiceFunctionForwarder>>;
}

#[derive(Default)]
struct Objects {
    functions: BTreeMap<String, Arc<ServiceFunction>>,
    forwarders: BTreeMap<String, Arc<ServiceFunctionForwarder>>,
}

/// An in-memory [`TopologyStore`].
#[derive(Default)]
pub struct TopologyDb {
    objects: RwLock<Objects>,
    lookups: AtomicUsize,
}

impl TopologyDb {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a service function. Names must be unique.
    pub fn add_function(&self, function: ServiceFunction) -> Result<(), TopologyError> {
        if function.name.is_empty() {
            return Err(TopologyError::EmptyName("service function"));
        }
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        if objects.functions.contains_key(&function.name) {
            return Err(TopologyError::DuplicateFunction(function.name));
        }
        debug!("Adding service function {}", function.name);
        objects
            .functions
            .insert(function.name.clone(), Arc::new(function));
        Ok(())
    }

    /// Add a forwarder. Names must be unique and the forwarder must validate.
    pub fn add_forwarder(&self, forwarder: ServiceFunctionForwarder) -> Result<(), TopologyError> {
        forwarder.validate()?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        if objects.forwarders.contains_key(&forwarder.name) {
            return Err(TopologyError::DuplicateForwarder(forwarder.name));
        }
        debug!("Adding forwarder {}", forwarder.name);
        objects
            .forwarders
            .insert(forwarder.name.clone(), Arc::new(forwarder));
        Ok(())
    }

    /// Replace an existing forwarder.
    pub fn update_forwarder(
        &self,
        forwarder: ServiceFunctionForwarder,
    ) -> Result<(), TopologyError> {
        forwarder.validate()?;
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        match objects.forwarders.get_mut(&forwarder.name) {
            Some(existing) => {
                debug!("Updating forwarder {}", forwarder.name);
                *existing = Arc::new(forwarder);
                Ok(())
            }
            None => Err(TopologyError::NoSuchForwarder(forwarder.name)),
        }
    }

    pub fn remove_function(&self, name: &str) -> Result<(), TopologyError> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        if objects.functions.remove(name).is_none() {
            return Err(TopologyError::NoSuchFunction(name.to_owned()));
        }
        debug!("Removed service function {name}");
        Ok(())
    }

    pub fn remove_forwarder(&self, name: &str) -> Result<(), TopologyError> {
        let mut objects = self.objects.write().unwrap_or_else(PoisonError::into_inner);
        if objects.forwarders.remove(name).is_none() {
            return Err(TopologyError::NoSuchForwarder(name.to_owned()));
        }
        debug!("Removed forwarder {name}");
        Ok(())
    }

    /// Number of lookups served so far.
    #[must_use]
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::Relaxed)
    }
}

impl TopologyStore for TopologyDb {
    fn function(&self, name: &str) -> Option<Arc<ServiceFunction>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects.functions.get(name).cloned()
    }
    fn forwarder(&self, name: &str) -> Option<Arc<ServiceFunctionForwarder>> {
        self.lookups.fetch_add(1, Ordering::Relaxed);
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        objects.forwarders.get(name).cloned()
    }
}
