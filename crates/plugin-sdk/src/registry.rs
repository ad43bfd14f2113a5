//! Service registry: which services a plugin can deploy and which are live.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use pw_protocol::{services, ServingStatus};

use crate::service::Service;

/// Outcome of [`ServiceRegistry::deploy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// Newly registered on the listener.
    Registered,
    /// Already live; nothing changed.
    AlreadyLive,
    /// No deployable service has that name.
    Unsupported,
    /// The listener has been torn down.
    TornDown,
}

/// Maps service names to handlers.
///
/// `deployable` is fixed when the plugin is built.  `live` only grows: a
/// Deploy moves an entry from one to the other under the write lock, and
/// teardown retires the whole registry at once.  Lookups take the read lock
/// only long enough to clone the `Arc`; callers invoke the handler after the
/// guard is dropped.
pub struct ServiceRegistry {
    deployable: BTreeMap<String, Arc<dyn Service>>,
    live: RwLock<HashMap<String, Arc<dyn Service>>>,
    torn_down: AtomicBool,
}

impl ServiceRegistry {
    pub fn new(deployable: BTreeMap<String, Arc<dyn Service>>) -> Self {
        Self {
            deployable,
            live: RwLock::new(HashMap::new()),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Register `name` on the live listener if it is deployable.
    pub fn deploy(&self, name: &str) -> Deployment {
        let Some(service) = self.deployable.get(name) else {
            return Deployment::Unsupported;
        };

        let mut live = self.live.write();
        // Checked under the write lock so a concurrent teardown cannot race
        // a registration in.
        if self.is_torn_down() {
            return Deployment::TornDown;
        }
        if live.contains_key(name) {
            return Deployment::AlreadyLive;
        }
        live.insert(name.to_string(), Arc::clone(service));
        tracing::info!(service = %name, "service deployed");
        Deployment::Registered
    }

    /// The live handler for `name`, if deployed and not torn down.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        if self.is_torn_down() {
            return None;
        }
        self.live.read().get(name).cloned()
    }

    pub fn is_live(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_deployable(&self, name: &str) -> bool {
        self.deployable.contains_key(name)
    }

    /// Live service names, sorted.
    pub fn live_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.live.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn deployable_names(&self) -> Vec<String> {
        self.deployable.keys().cloned().collect()
    }

    pub fn tear_down(&self) {
        let _live = self.live.write();
        if !self.torn_down.swap(true, Ordering::SeqCst) {
            tracing::info!("service registry torn down");
        }
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    /// Serving status for a health query.
    ///
    /// The empty name and the built-in services are serving from the start.
    /// Deployable names report `NotServing` until deployed; names the plugin
    /// does not know at all report `ServiceUnknown`.  Everything reports
    /// `NotServing` after teardown.
    pub fn status(&self, name: &str) -> ServingStatus {
        if self.is_torn_down() {
            return ServingStatus::NotServing;
        }
        if name.is_empty() || name == services::LIFECYCLE || name == services::HEALTH {
            return ServingStatus::Serving;
        }
        if self.live.read().contains_key(name) {
            ServingStatus::Serving
        } else if self.is_deployable(name) {
            ServingStatus::NotServing
        } else {
            ServingStatus::ServiceUnknown
        }
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("deployable", &self.deployable_names())
            .field("live", &self.live_names())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use pw_protocol::Fault;
    use serde_json::Value;

    use super::*;

    struct Echo;

    #[async_trait::async_trait]
    impl Service for Echo {
        async fn call(&self, _method: &str, params: Value) -> Result<Value, Fault> {
            Ok(params)
        }
    }

    fn registry() -> ServiceRegistry {
        let mut deployable: BTreeMap<String, Arc<dyn Service>> = BTreeMap::new();
        deployable.insert("command".into(), Arc::new(Echo));
        ServiceRegistry::new(deployable)
    }

    #[test]
    fn deploy_moves_service_live() {
        let reg = registry();
        assert!(!reg.is_live("command"));
        assert_eq!(reg.deploy("command"), Deployment::Registered);
        assert!(reg.is_live("command"));
        assert_eq!(reg.status("command"), ServingStatus::Serving);
    }

    #[test]
    fn second_deploy_is_a_no_op() {
        let reg = registry();
        reg.deploy("command");
        assert_eq!(reg.deploy("command"), Deployment::AlreadyLive);
        assert_eq!(reg.live_names(), vec!["command".to_string()]);
    }

    #[test]
    fn unknown_name_changes_nothing() {
        let reg = registry();
        assert_eq!(reg.deploy("unknown"), Deployment::Unsupported);
        assert!(reg.live_names().is_empty());
        assert_eq!(reg.status("command"), ServingStatus::NotServing);
        assert_eq!(reg.status("unknown"), ServingStatus::ServiceUnknown);
    }

    #[test]
    fn teardown_retires_everything() {
        let reg = registry();
        reg.deploy("command");
        reg.tear_down();
        assert!(reg.get("command").is_none());
        assert_eq!(reg.status("command"), ServingStatus::NotServing);
        assert_eq!(reg.status(""), ServingStatus::NotServing);
        assert_eq!(reg.deploy("command"), Deployment::TornDown);
    }

    #[test]
    fn builtins_serve_before_deploy() {
        let reg = registry();
        assert_eq!(reg.status(""), ServingStatus::Serving);
        assert_eq!(reg.status(services::LIFECYCLE), ServingStatus::Serving);
    }
}
