//! Shared fixtures: a Hello/World handler and an in-process handshake pipe.

#![allow(dead_code)]

use std::collections::HashMap;
use std::time::Duration;

use pw_plugin_sdk::{
    CommandError, CommandHandler, CommandOutcome, NegotiatedEnvironment, PluginInfo,
    StartupContext,
};
use serde_json::Value;
use tokio::io::BufReader;
use tokio::net::UnixStream;

pub const VERSION: &str = "1.0.0";

// ── Test handler ────────────────────────────────────────────────────────

pub struct HelloHandler;

#[async_trait::async_trait]
impl CommandHandler for HelloHandler {
    async fn command(&self, name: &str, params: Vec<Value>) -> CommandOutcome {
        match name {
            "Hello" => Some(Ok(Value::from("World"))),
            "Echo" => Some(Ok(Value::Array(params))),
            "Slow" => {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Some(Ok(Value::from("done")))
            }
            "Fail" => Some(Err(CommandError::new("refused"))),
            _ => None,
        }
    }

    fn get_help(&self, subcommand: &str) -> String {
        format!("usage: {subcommand}")
    }

    fn list_command(&self) -> Vec<String> {
        vec!["Hello".into(), "Echo".into(), "Slow".into(), "Fail".into()]
    }

    fn get_plugin_info(&self) -> PluginInfo {
        PluginInfo {
            name: "hello".into(),
            version: VERSION.into(),
        }
    }
}

// ── Environment ─────────────────────────────────────────────────────────

pub fn env_from(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

pub fn server_env(listen: &str) -> NegotiatedEnvironment {
    NegotiatedEnvironment::from_map(&env_from(&[
        ("ENV_PLUGIN_LISTENER_ADDRESS", listen),
        ("ENV_ALLOW_PLUGIN_RPC_PROTOCOL", "1"),
        ("ENV_REQUEST_VERSION", VERSION),
    ]))
    .unwrap()
}

pub fn client_env(connect_json: &str, supported: &str) -> NegotiatedEnvironment {
    NegotiatedEnvironment::from_map(&env_from(&[
        ("ENV_PLUGIN_CONNECT_ADDRESS", connect_json),
        ("ENV_SUPPORT_RPC_PROTOCOL", supported),
        ("ENV_INSTALLED_VERSION", VERSION),
    ]))
    .unwrap()
}

// ── Handshake pipe ──────────────────────────────────────────────────────

/// A startup context whose handshake can be read back in the test, the
/// way a host reads descriptor 3.
pub fn handshake_pipe() -> (StartupContext, BufReader<UnixStream>) {
    let (writer, reader) = std::os::unix::net::UnixStream::pair().unwrap();
    reader.set_nonblocking(true).unwrap();
    let reader = UnixStream::from_std(reader).unwrap();
    (StartupContext::with_writer(writer), BufReader::new(reader))
}
