//! Initialize / Deploy / Uninitialize.
//!
//! ```text
//! Uninitialized ──Initialize──▶ Ready ──Deploy(known)──▶ ServiceDeployed
//!                                 │                          │   ▲
//!                                 │                          └───┘ Deploy
//!                                 └──────UnInitialization────────┴──▶ TornDown
//! ```

use std::sync::Arc;

use parking_lot::Mutex;
use pw_protocol::{methods, DeployRequest, ErrorStatus, Fault};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::registry::{Deployment, ServiceRegistry};
use crate::service::{decode_params, encode_result, Service};

/// Reply message for a Deploy target the plugin does not provide.
pub const PLUGIN_NOT_SUPPORTED: &str = "Plugin not supported";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Ready,
    ServiceDeployed,
    TornDown,
}

pub struct LifecycleService {
    state: Mutex<LifecycleState>,
    registry: Arc<ServiceRegistry>,
    shutdown: CancellationToken,
}

impl LifecycleService {
    pub fn new(registry: Arc<ServiceRegistry>, shutdown: CancellationToken) -> Self {
        Self {
            state: Mutex::new(LifecycleState::Uninitialized),
            registry,
            shutdown,
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn initialize(&self) -> ErrorStatus {
        let mut state = self.state.lock();
        match *state {
            LifecycleState::Uninitialized => {
                *state = LifecycleState::Ready;
                tracing::info!("plugin initialized");
                ErrorStatus::ok()
            }
            LifecycleState::Ready | LifecycleState::ServiceDeployed => ErrorStatus::ok(),
            LifecycleState::TornDown => ErrorStatus::new("plugin has been uninitialized"),
        }
    }

    /// Register `name` on the running listener.  Unknown names are
    /// declined in the reply and leave every registration untouched.
    pub fn deploy(&self, name: &str) -> ErrorStatus {
        let mut state = self.state.lock();
        match *state {
            LifecycleState::Uninitialized => {
                return ErrorStatus::new("plugin is not initialized");
            }
            LifecycleState::TornDown => {
                return ErrorStatus::new("plugin has been uninitialized");
            }
            LifecycleState::Ready | LifecycleState::ServiceDeployed => {}
        }

        match self.registry.deploy(name) {
            Deployment::Registered | Deployment::AlreadyLive => {
                *state = LifecycleState::ServiceDeployed;
                ErrorStatus::ok()
            }
            Deployment::Unsupported => {
                tracing::warn!(service = %name, "deploy target not supported");
                ErrorStatus::new(PLUGIN_NOT_SUPPORTED).with_detail(name.as_bytes().to_vec())
            }
            Deployment::TornDown => ErrorStatus::new("plugin has been uninitialized"),
        }
    }

    /// Stop accepting new calls.  Calls already running finish normally.
    pub fn uninitialize(&self) -> ErrorStatus {
        let mut state = self.state.lock();
        if *state != LifecycleState::TornDown {
            *state = LifecycleState::TornDown;
            self.registry.tear_down();
            self.shutdown.cancel();
            tracing::info!("plugin uninitialized");
        }
        ErrorStatus::ok()
    }
}

#[async_trait::async_trait]
impl Service for LifecycleService {
    async fn call(&self, method: &str, params: Value) -> Result<Value, Fault> {
        let status = match method {
            methods::INITIALIZATION => self.initialize(),
            methods::DEPLOY => {
                let req: DeployRequest = decode_params(params)?;
                self.deploy(&req.name)
            }
            methods::UNINITIALIZATION => self.uninitialize(),
            other => return Err(Fault::unknown_method(pw_protocol::services::LIFECYCLE, other)),
        };
        encode_result(&status)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pw_protocol::FaultCode;
    use serde_json::json;

    use super::*;

    struct Nop;

    #[async_trait::async_trait]
    impl Service for Nop {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value, Fault> {
            Ok(Value::Null)
        }
    }

    fn lifecycle() -> (LifecycleService, Arc<ServiceRegistry>, CancellationToken) {
        let mut deployable: BTreeMap<String, Arc<dyn Service>> = BTreeMap::new();
        deployable.insert("command".into(), Arc::new(Nop));
        let registry = Arc::new(ServiceRegistry::new(deployable));
        let token = CancellationToken::new();
        (
            LifecycleService::new(Arc::clone(&registry), token.clone()),
            registry,
            token,
        )
    }

    #[test]
    fn happy_path_transitions() {
        let (lc, registry, _) = lifecycle();
        assert_eq!(lc.state(), LifecycleState::Uninitialized);
        assert!(lc.initialize().is_ok());
        assert_eq!(lc.state(), LifecycleState::Ready);
        assert!(lc.deploy("command").is_ok());
        assert_eq!(lc.state(), LifecycleState::ServiceDeployed);
        assert!(registry.is_live("command"));
    }

    #[test]
    fn deploy_before_initialize_is_declined() {
        let (lc, registry, _) = lifecycle();
        assert!(!lc.deploy("command").is_ok());
        assert!(!registry.is_live("command"));
    }

    #[test]
    fn unsupported_target_keeps_state() {
        let (lc, registry, _) = lifecycle();
        lc.initialize();
        let status = lc.deploy("unknown");
        assert_eq!(status.message, PLUGIN_NOT_SUPPORTED);
        assert_eq!(lc.state(), LifecycleState::Ready);
        assert!(registry.live_names().is_empty());
    }

    #[test]
    fn deploy_twice_succeeds_both_times() {
        let (lc, registry, _) = lifecycle();
        lc.initialize();
        assert!(lc.deploy("command").is_ok());
        assert!(lc.deploy("command").is_ok());
        assert_eq!(registry.live_names().len(), 1);
    }

    #[test]
    fn uninitialize_cancels_and_tears_down() {
        let (lc, registry, token) = lifecycle();
        lc.initialize();
        lc.deploy("command");
        assert!(lc.uninitialize().is_ok());
        assert!(token.is_cancelled());
        assert!(registry.is_torn_down());
        assert!(!lc.deploy("command").is_ok());
        assert!(lc.uninitialize().is_ok());
    }

    #[tokio::test]
    async fn call_surface() {
        let (lc, _, _) = lifecycle();
        let init = lc.call(methods::INITIALIZATION, Value::Null).await.unwrap();
        assert_eq!(init, json!({"message": ""}));

        let deploy = lc
            .call(methods::DEPLOY, json!({"name": "nope"}))
            .await
            .unwrap();
        assert_eq!(deploy["message"], PLUGIN_NOT_SUPPORTED);

        let bad = lc.call(methods::DEPLOY, json!(42)).await.unwrap_err();
        assert_eq!(bad.code, FaultCode::InvalidParams);

        let unknown = lc.call("Reboot", Value::Null).await.unwrap_err();
        assert_eq!(unknown.code, FaultCode::UnknownMethod);
    }
}
