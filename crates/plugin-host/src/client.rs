//! Typed calls over either transport.

use pw_protocol::{
    methods, services, Address, CommandReply, CommandRequest, DeployRequest, ErrorStatus,
    HealthCheckRequest, HealthCheckResponse, PluginInfo, ServingStatus, PONG,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::binary::BinaryRpcClient;
use crate::error::HostError;
use crate::json::JsonRpcPeer;

/// The wire a [`PluginClient`] talks over.
pub enum Channel {
    Binary(BinaryRpcClient),
    Json(JsonRpcPeer),
}

impl Channel {
    pub async fn call(&self, service: &str, method: &str, params: Value) -> Result<Value, HostError> {
        match self {
            Channel::Binary(c) => c.call(service, method, params).await,
            Channel::Json(p) => p.call(service, method, params).await,
        }
    }
}

pub struct PluginClient {
    channel: Channel,
}

impl PluginClient {
    pub fn new(channel: Channel) -> Self {
        Self { channel }
    }

    pub async fn connect_binary(address: &Address) -> Result<Self, HostError> {
        Ok(Self::new(Channel::Binary(BinaryRpcClient::connect(address).await?)))
    }

    pub fn over_json(peer: JsonRpcPeer) -> Self {
        Self::new(Channel::Json(peer))
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    async fn typed<P: Serialize, R: DeserializeOwned>(
        &self,
        service: &str,
        method: &str,
        params: &P,
    ) -> Result<R, HostError> {
        let value = self
            .channel
            .call(service, method, serde_json::to_value(params)?)
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn lifecycle(&self, method: &str, params: Value) -> Result<(), HostError> {
        let status: ErrorStatus = self.typed(services::LIFECYCLE, method, &params).await?;
        status.into_result().map_err(HostError::Status)
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    pub async fn initialize(&self) -> Result<(), HostError> {
        self.lifecycle(methods::INITIALIZATION, Value::Null).await
    }

    pub async fn deploy(&self, name: &str) -> Result<(), HostError> {
        let params = serde_json::to_value(DeployRequest { name: name.into() })?;
        self.lifecycle(methods::DEPLOY, params).await
    }

    pub async fn uninitialize(&self) -> Result<(), HostError> {
        self.lifecycle(methods::UNINITIALIZATION, Value::Null).await
    }

    // ── Command service ──────────────────────────────────────────────

    /// `Unrecognized` and `Failed` come back as replies, not errors.
    pub async fn command(&self, name: &str, params: Vec<Value>) -> Result<CommandReply, HostError> {
        let req = CommandRequest {
            name: name.into(),
            params,
        };
        self.typed(services::COMMAND, methods::COMMAND, &req).await
    }

    pub async fn get_help(&self, subcommand: &str) -> Result<String, HostError> {
        self.typed(services::COMMAND, methods::GET_HELP, &subcommand).await
    }

    pub async fn list_command(&self) -> Result<Vec<String>, HostError> {
        self.typed(services::COMMAND, methods::LIST_COMMAND, &Value::Null)
            .await
    }

    pub async fn get_plugin_info(&self) -> Result<PluginInfo, HostError> {
        self.typed(services::COMMAND, methods::GET_PLUGIN_INFO, &Value::Null)
            .await
    }

    pub async fn ping(&self) -> Result<(), HostError> {
        let reply: String = self
            .typed(services::COMMAND, methods::PING, &Value::Null)
            .await?;
        if reply == PONG {
            Ok(())
        } else {
            Err(HostError::UnexpectedReply(reply))
        }
    }

    // ── Health ───────────────────────────────────────────────────────

    pub async fn health_check(&self, service: &str) -> Result<ServingStatus, HostError> {
        let req = HealthCheckRequest {
            service: service.into(),
        };
        let resp: HealthCheckResponse = self.typed(services::HEALTH, methods::CHECK, &req).await?;
        Ok(resp.status)
    }
}
