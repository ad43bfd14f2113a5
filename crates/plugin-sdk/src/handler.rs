//! The callbacks a plugin author supplies.

use pw_protocol::{PluginInfo, ProtocolId, ProtocolSet};
use serde_json::Value;

use crate::types::CommandError;

/// Result of [`CommandHandler::command`].
///
/// `None` means the plugin has no command by that name, which the host
/// sees as an `unrecognized` reply rather than a failure.
pub type CommandOutcome = Option<Result<Value, CommandError>>;

/// Implement this to back the `command` service.
///
/// # Example
///
/// ```rust,no_run
/// use pw_plugin_sdk::{CommandHandler, CommandOutcome, PluginInfo};
/// use serde_json::Value;
///
/// struct Hello;
///
/// #[async_trait::async_trait]
/// impl CommandHandler for Hello {
///     async fn command(&self, name: &str, _params: Vec<Value>) -> CommandOutcome {
///         (name == "Hello").then(|| Ok(Value::from("World")))
///     }
///
///     fn get_help(&self, _subcommand: &str) -> String {
///         "Hello: replies World".into()
///     }
///
///     fn list_command(&self) -> Vec<String> {
///         vec!["Hello".into()]
///     }
///
///     fn get_plugin_info(&self) -> PluginInfo {
///         PluginInfo { name: "hello".into(), version: "1.0.0".into() }
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    async fn command(&self, name: &str, params: Vec<Value>) -> CommandOutcome;

    fn get_help(&self, subcommand: &str) -> String;

    fn list_command(&self) -> Vec<String>;

    fn get_plugin_info(&self) -> PluginInfo;

    /// Pick a protocol when the host offers a choice (client role).
    /// Defaults to JSON-RPC when available.
    fn config(&self, supported: &ProtocolSet) -> Option<ProtocolId> {
        if supported.contains(ProtocolId::JsonRpc) {
            Some(ProtocolId::JsonRpc)
        } else {
            supported.iter().next()
        }
    }
}
