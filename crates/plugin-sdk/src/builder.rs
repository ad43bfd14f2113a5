//! Builder pattern for constructing a [`Plugin`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use pw_protocol::services;
use semver::Version;

use crate::command::CommandService;
use crate::environment::NegotiatedEnvironment;
use crate::handler::CommandHandler;
use crate::negotiation::negotiate;
use crate::plugin::Plugin;
use crate::service::Service;
use crate::transport::TransportSettings;
use crate::types::PluginError;

/// Fluent builder for [`Plugin`].
///
/// `build` reads and validates the negotiated environment and checks the
/// version, so every fatal startup error surfaces here, before any socket
/// is opened.
///
/// # Example
///
/// ```rust,no_run
/// # use pw_plugin_sdk::{CommandHandler, CommandOutcome, PluginBuilder, PluginInfo};
/// # struct Hello;
/// # #[async_trait::async_trait]
/// # impl CommandHandler for Hello {
/// #     async fn command(&self, _: &str, _: Vec<serde_json::Value>) -> CommandOutcome { None }
/// #     fn get_help(&self, _: &str) -> String { String::new() }
/// #     fn list_command(&self) -> Vec<String> { Vec::new() }
/// #     fn get_plugin_info(&self) -> PluginInfo { PluginInfo { name: "hello".into(), version: "1.0.0".into() } }
/// # }
/// let plugin = PluginBuilder::new(Hello)
///     .version(env!("CARGO_PKG_VERSION"))
///     .max_concurrent_calls(32)
///     .build()
///     .unwrap();
/// ```
pub struct PluginBuilder {
    handler: Arc<dyn CommandHandler>,
    version: String,
    environment: Option<NegotiatedEnvironment>,
    services: BTreeMap<String, Arc<dyn Service>>,
    settings: TransportSettings,
}

impl PluginBuilder {
    pub fn new(handler: impl CommandHandler) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    pub fn from_arc(handler: Arc<dyn CommandHandler>) -> Self {
        Self {
            handler,
            version: "0.0.0".into(),
            environment: None,
            services: BTreeMap::new(),
            settings: TransportSettings::default(),
        }
    }

    // ── Identity ─────────────────────────────────────────────────────

    /// Compiled-in plugin version; must equal the version the host asks for.
    pub fn version(mut self, v: impl Into<String>) -> Self {
        self.version = v.into();
        self
    }

    /// Use this environment instead of reading the process environment.
    pub fn environment(mut self, env: NegotiatedEnvironment) -> Self {
        self.environment = Some(env);
        self
    }

    // ── Services ─────────────────────────────────────────────────────

    /// Offer another service for `Deploy`.  The `command` service is
    /// always offered.
    pub fn register_service(mut self, name: impl Into<String>, service: impl Service) -> Self {
        self.services.insert(name.into(), Arc::new(service));
        self
    }

    // ── Behavior ─────────────────────────────────────────────────────

    /// Worker-pool size for the binary transport (default 16).
    pub fn max_concurrent_calls(mut self, n: usize) -> Self {
        self.settings.max_concurrent_calls = n;
        self
    }

    /// Bound on dialling the host (default 10s).  JSON-RPC only.
    pub fn connect_timeout(mut self, d: Duration) -> Self {
        self.settings.connect_timeout = d;
        self
    }

    /// Largest inbound frame accepted (default 4 MiB).
    pub fn max_frame_bytes(mut self, n: usize) -> Self {
        self.settings.max_frame_bytes = n;
        self
    }

    /// Path appended when dialling a `tcp` address (default `/plugin`).
    pub fn json_path(mut self, path: impl Into<String>) -> Self {
        self.settings.json_path = path.into();
        self
    }

    /// Validate everything and produce a [`Plugin`] ready to run.
    pub fn build(self) -> Result<Plugin, PluginError> {
        let compiled = Version::parse(&self.version).map_err(|e| {
            PluginError::config(format!("plugin version {:?}: {e}", self.version))
        })?;

        let env = match self.environment {
            Some(env) => env,
            None => NegotiatedEnvironment::from_process_env()?,
        };
        let handler = Arc::clone(&self.handler);
        let negotiated = negotiate(&env, &compiled, |supported| handler.config(supported))?;

        let mut deployable = self.services;
        deployable.insert(
            services::COMMAND.to_string(),
            Arc::new(CommandService::new(Arc::clone(&self.handler))),
        );

        tracing::info!(
            role = ?negotiated.role,
            protocol = %negotiated.protocol,
            address = %negotiated.address.uri(),
            version = %negotiated.version,
            "plugin negotiated"
        );

        Ok(Plugin::new(negotiated, self.settings, deployable))
    }
}
