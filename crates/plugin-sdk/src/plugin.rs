//! A negotiated plugin, ready to open its transport.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use pw_protocol::{HandshakeLine, CORE_PROTOCOL_VERSION};
use semver::Version;
use tokio_util::sync::CancellationToken;

use crate::dispatch::Dispatcher;
use crate::lifecycle::LifecycleService;
use crate::negotiation::Negotiated;
use crate::registry::ServiceRegistry;
use crate::service::Service;
use crate::startup::StartupContext;
use crate::transport::{Transport, TransportSettings};
use crate::types::PluginError;

/// Create via [`PluginBuilder`](crate::builder::PluginBuilder).
pub struct Plugin {
    negotiated: Negotiated,
    settings: TransportSettings,
    registry: Arc<ServiceRegistry>,
    shutdown: CancellationToken,
    exit_code: Arc<AtomicI32>,
}

impl Plugin {
    pub fn builder(handler: impl crate::CommandHandler) -> crate::builder::PluginBuilder {
        crate::builder::PluginBuilder::new(handler)
    }

    pub(crate) fn new(
        negotiated: Negotiated,
        settings: TransportSettings,
        deployable: BTreeMap<String, Arc<dyn Service>>,
    ) -> Self {
        Self {
            negotiated,
            settings,
            registry: Arc::new(ServiceRegistry::new(deployable)),
            shutdown: CancellationToken::new(),
            exit_code: Arc::new(AtomicI32::new(0)),
        }
    }

    pub fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            shutdown: self.shutdown.clone(),
            registry: Arc::clone(&self.registry),
            exit_code: Arc::clone(&self.exit_code),
        }
    }

    /// Open the transport, emit the handshake, then serve until
    /// `UnInitialization`, a [`StopHandle::stop`], or (JSON-RPC) the host
    /// closing the connection.
    ///
    /// Returns the exit status the process should use.
    pub async fn run(self, startup: StartupContext) -> Result<i32, PluginError> {
        let core_version = Version::parse(CORE_PROTOCOL_VERSION)
            .map_err(|e| PluginError::config(format!("core protocol version: {e}")))?;

        let transport = Transport::open(&self.negotiated, self.settings.clone()).await?;
        let address = transport.address()?;

        let lifecycle = Arc::new(LifecycleService::new(
            Arc::clone(&self.registry),
            self.shutdown.clone(),
        ));
        let dispatcher = Arc::new(Dispatcher::new(lifecycle, Arc::clone(&self.registry)));

        startup.emit(&HandshakeLine {
            core_version,
            version: self.negotiated.version.clone(),
            address,
            protocol: transport.protocol(),
        })?;

        transport.serve(dispatcher, self.shutdown.clone()).await?;

        let code = self.exit_code.load(Ordering::SeqCst);
        tracing::info!(code, "plugin stopped");
        Ok(code)
    }
}

/// Ends [`Plugin::run`] from outside the RPC surface.
#[derive(Clone)]
pub struct StopHandle {
    shutdown: CancellationToken,
    registry: Arc<ServiceRegistry>,
    exit_code: Arc<AtomicI32>,
}

impl StopHandle {
    /// Stop serving; `run` returns `code` once in-flight calls finish.
    pub fn stop(&self, code: i32) {
        self.exit_code.store(code, Ordering::SeqCst);
        self.registry.tear_down();
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}
