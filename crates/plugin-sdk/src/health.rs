use std::sync::Arc;

use pw_protocol::{methods, services, Fault, HealthCheckRequest, HealthCheckResponse};
use serde_json::Value;

use crate::registry::ServiceRegistry;
use crate::service::{decode_params, encode_result, Service};

/// Per-service serving status, answered from the registry.
pub struct HealthService {
    registry: Arc<ServiceRegistry>,
}

impl HealthService {
    pub fn new(registry: Arc<ServiceRegistry>) -> Self {
        Self { registry }
    }

    pub fn check(&self, req: &HealthCheckRequest) -> HealthCheckResponse {
        HealthCheckResponse {
            status: self.registry.status(&req.service),
        }
    }
}

#[async_trait::async_trait]
impl Service for HealthService {
    async fn call(&self, method: &str, params: Value) -> Result<Value, Fault> {
        match method {
            methods::CHECK => {
                // `Check` with no params asks about the listener as a whole.
                let req: HealthCheckRequest = if params.is_null() {
                    HealthCheckRequest::default()
                } else {
                    decode_params(params)?
                };
                encode_result(&self.check(&req))
            }
            other => Err(Fault::unknown_method(services::HEALTH, other)),
        }
    }
}
