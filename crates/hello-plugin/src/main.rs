//! Reference "hello-world" plugin.
//!
//! Launched by a host, never by hand: the host sets the negotiated
//! environment and reads the handshake from descriptor 3.  Once the host
//! deploys the `command` service it answers:
//!
//! - `Hello` — replies `"World"`
//! - `Echo`  — replies with its parameters
//!
//! Env vars (server role):
//!   ENV_PLUGIN_LISTENER_ADDRESS   — e.g. `tcp://127.0.0.1:0`
//!   ENV_ALLOW_PLUGIN_RPC_PROTOCOL — e.g. `1`
//!   ENV_REQUEST_VERSION           — must equal this binary's version
//!
//! Env vars (client role):
//!   ENV_PLUGIN_CONNECT_ADDRESS    — `{"JsonRPCProtocol": "ws://…/plugin"}`
//!   ENV_SUPPORT_RPC_PROTOCOL      — e.g. `JsonRPCProtocol`
//!   ENV_INSTALLED_VERSION         — must equal this binary's version
//!
//! Logs go to stderr (`RUST_LOG`, default `info`).

use pw_plugin_sdk::{CommandHandler, CommandOutcome, PluginBuilder, PluginInfo, StartupContext};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const NAME: &str = "hello";

struct HelloCommands;

#[async_trait::async_trait]
impl CommandHandler for HelloCommands {
    async fn command(&self, name: &str, params: Vec<Value>) -> CommandOutcome {
        match name {
            "Hello" => Some(Ok(Value::from("World"))),
            "Echo" => Some(Ok(Value::Array(params))),
            _ => None,
        }
    }

    fn get_help(&self, subcommand: &str) -> String {
        match subcommand {
            "Hello" => "Hello: replies World".into(),
            "Echo" => "Echo [args...]: replies with its arguments".into(),
            "" => "commands: Hello, Echo".into(),
            other => format!("no such command: {other}"),
        }
    }

    fn list_command(&self) -> Vec<String> {
        vec!["Hello".into(), "Echo".into()]
    }

    fn get_plugin_info(&self) -> PluginInfo {
        PluginInfo {
            name: NAME.into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{NAME}: {e:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> anyhow::Result<i32> {
    // Environment and version are checked before anything is opened.
    let plugin = PluginBuilder::new(HelloCommands)
        .version(env!("CARGO_PKG_VERSION"))
        .build()?;

    let negotiated = plugin.negotiated();
    tracing::info!(
        plugin = NAME,
        version = %negotiated.version,
        role = ?negotiated.role,
        protocol = %negotiated.protocol,
        address = %negotiated.address.uri(),
        "starting plugin"
    );

    // Claim descriptor 3 before the runtime can allocate it.
    let startup = StartupContext::from_reserved_fd()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let code = runtime.block_on(plugin.run(startup))?;
    tracing::info!(plugin = NAME, code, "plugin exiting");
    Ok(code)
}
