// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Read-through access to the topology store, cached for the duration of one compile.

use crate::errors::ResolutionError;
use std::collections::HashMap;
use std::sync::Arc;
use topology::{ServiceFunction, ServiceFunctionForwarder, TopologyStore};
use tracing::trace;

/// Resolves forwarder and function names for one compile.
///
/// Objects looked up once are kept until the accessor is dropped, so a forwarder used by
/// several hops is fetched from the store only once. A new accessor is created for every
/// compile: nothing is shared between compiles.
pub struct TopologyAccessor<'a> {
    store: &'a dyn TopologyStore,
    functions: HashMap<String, Arc<ServiceFunction>>,
    forwarders: HashMap<String, Arc<ServiceFunctionForwarder>>,
}

impl<'a> TopologyAccessor<'a> {
    #[must_use]
    pub fn new(store: &'a dyn TopologyStore) -> Self {
        Self {
            store,
            functions: HashMap::new(),
            forwarders: HashMap::new(),
        }
    }

    pub fn get_function(&mut self, name: &str) -> Result<Arc<ServiceFunction>, ResolutionError> {
        if let Some(function) = self.functions.get(name) {
            return Ok(function.clone());
        }
        trace!("Fetching service function {name}");
        let function = self
            .store
            .function(name)
            .ok_or_else(|| ResolutionError::NoSuchFunction(name.to_owned()))?;
        self.functions.insert(name.to_owned(), function.clone());
        Ok(function)
    }

    pub fn get_forwarder(
        &mut self,
        name: &str,
    ) -> Result<Arc<ServiceFunctionForwarder>, ResolutionError> {
        if let Some(forwarder) = self.forwarders.get(name) {
            return Ok(forwarder.clone());
        }
        trace!("Fetching forwarder {name}");
        let forwarder = self
            .store
            .forwarder(name)
            .ok_or_else(|| ResolutionError::NoSuchForwarder(name.to_owned()))?;
        self.forwarders.insert(name.to_owned(), forwarder.clone());
        Ok(forwarder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use topology::PathTransport;
    use topology::testing::topology;

    #[test]
    fn lookups_are_cached() {
        let db = topology(PathTransport::Vlan);
        let mut accessor = TopologyAccessor::new(&db);
        for _ in 0..3 {
            accessor.get_forwarder("SFF-A").unwrap();
            accessor.get_function("fw1").unwrap();
        }
        assert_eq!(db.lookups(), 2);

        // a new accessor starts from scratch
        let mut accessor = TopologyAccessor::new(&db);
        accessor.get_forwarder("SFF-A").unwrap();
        assert_eq!(db.lookups(), 3);
    }

    #[test]
    fn unknown_names() {
        let db = topology(PathTransport::Vlan);
        let mut accessor = TopologyAccessor::new(&db);
        assert_eq!(
            accessor.get_forwarder("SFF-Z").unwrap_err(),
            ResolutionError::NoSuchForwarder("SFF-Z".to_string())
        );
        assert_eq!(
            accessor.get_function("fw9").unwrap_err(),
            ResolutionError::NoSuchFunction("fw9".to_string())
        );
    }
}
