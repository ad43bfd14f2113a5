//! Routes `(service, method, params)` to the right handler.
//!
//! Both transports funnel every inbound call through one [`Dispatcher`].
//! The lifecycle and health services are always present; everything else
//! comes from the registry once deployed.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use pw_protocol::{methods, services, Fault, FaultCode, PONG};
use serde_json::Value;

use crate::health::HealthService;
use crate::lifecycle::LifecycleService;
use crate::registry::ServiceRegistry;
use crate::service::Service;

pub struct Dispatcher {
    lifecycle: Arc<LifecycleService>,
    health: HealthService,
    registry: Arc<ServiceRegistry>,
}

impl Dispatcher {
    pub fn new(lifecycle: Arc<LifecycleService>, registry: Arc<ServiceRegistry>) -> Self {
        Self {
            lifecycle,
            health: HealthService::new(Arc::clone(&registry)),
            registry,
        }
    }

    pub fn lifecycle(&self) -> &LifecycleService {
        &self.lifecycle
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, service: &str, method: &str, params: Value) -> Result<Value, Fault> {
        tracing::debug!(service = %service, method = %method, "dispatch");

        if method == methods::PING {
            return Ok(Value::from(PONG));
        }

        match service {
            services::LIFECYCLE => self.lifecycle.call(method, params).await,
            services::HEALTH => self.health.call(method, params).await,
            _ => {
                if self.registry.is_torn_down() {
                    return Err(Fault::unavailable());
                }
                // The registry lock is released before the handler runs.
                let handler = self
                    .registry
                    .get(service)
                    .ok_or_else(|| Fault::unknown_service(service))?;

                match AssertUnwindSafe(handler.call(method, params))
                    .catch_unwind()
                    .await
                {
                    Ok(result) => result,
                    Err(_panic) => {
                        tracing::error!(service = %service, method = %method, "service handler panicked");
                        Err(Fault::new(FaultCode::Internal, "service handler panicked"))
                    }
                }
            }
        }
    }
}
