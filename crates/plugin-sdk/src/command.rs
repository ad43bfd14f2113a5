//! The `command` application service: forwards to a [`CommandHandler`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use pw_protocol::{methods, services, CommandReply, CommandRequest, ErrorStatus, Fault, HelpRequest};
use serde_json::Value;

use crate::handler::CommandHandler;
use crate::service::{decode_params, encode_result, Service};

pub struct CommandService {
    handler: Arc<dyn CommandHandler>,
}

impl CommandService {
    pub fn new(handler: Arc<dyn CommandHandler>) -> Self {
        Self { handler }
    }

    /// Run one command.  A panicking handler yields a `failed` reply.
    pub async fn command(&self, req: CommandRequest) -> CommandReply {
        let outcome = AssertUnwindSafe(self.handler.command(&req.name, req.params))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Some(Ok(value))) => CommandReply::Output { value },
            Ok(Some(Err(e))) => CommandReply::Failed { status: e.into() },
            Ok(None) => {
                tracing::debug!(command = %req.name, "command not recognized");
                CommandReply::Unrecognized
            }
            Err(_panic) => {
                tracing::error!(command = %req.name, "command handler panicked");
                CommandReply::Failed {
                    status: ErrorStatus::new("command handler panicked"),
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Service for CommandService {
    async fn call(&self, method: &str, params: Value) -> Result<Value, Fault> {
        match method {
            methods::COMMAND => {
                let req: CommandRequest = decode_params(params)?;
                encode_result(&self.command(req).await)
            }
            methods::GET_HELP => {
                let req: HelpRequest = decode_params(params)?;
                encode_result(&self.handler.get_help(req.subcommand()))
            }
            methods::LIST_COMMAND => encode_result(&self.handler.list_command()),
            methods::GET_PLUGIN_INFO => encode_result(&self.handler.get_plugin_info()),
            other => Err(Fault::unknown_method(services::COMMAND, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use pw_protocol::{FaultCode, PluginInfo};
    use serde_json::json;

    use super::*;
    use crate::handler::CommandOutcome;
    use crate::types::CommandError;

    struct Fixture;

    #[async_trait::async_trait]
    impl CommandHandler for Fixture {
        async fn command(&self, name: &str, params: Vec<Value>) -> CommandOutcome {
            match name {
                "Hello" => Some(Ok(json!("World"))),
                "Echo" => Some(Ok(Value::Array(params))),
                "Nothing" => Some(Ok(Value::Null)),
                "Fail" => Some(Err(CommandError::new("nope"))),
                "Boom" => panic!("boom"),
                _ => None,
            }
        }

        fn get_help(&self, subcommand: &str) -> String {
            format!("help for {subcommand}")
        }

        fn list_command(&self) -> Vec<String> {
            vec!["Hello".into(), "Echo".into()]
        }

        fn get_plugin_info(&self) -> PluginInfo {
            PluginInfo {
                name: "fixture".into(),
                version: "1.0.0".into(),
            }
        }
    }

    fn service() -> CommandService {
        CommandService::new(Arc::new(Fixture))
    }

    #[tokio::test]
    async fn forwards_command_output() {
        let reply = service()
            .call(methods::COMMAND, json!({"name": "Hello", "params": []}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"outcome": "output", "value": "World"}));
    }

    #[tokio::test]
    async fn params_default_to_empty() {
        let reply = service()
            .call(methods::COMMAND, json!({"name": "Echo"}))
            .await
            .unwrap();
        assert_eq!(reply["value"], json!([]));
    }

    #[tokio::test]
    async fn unknown_command_is_unrecognized_not_fault() {
        let reply = service()
            .call(methods::COMMAND, json!({"name": "Missing"}))
            .await
            .unwrap();
        assert_eq!(reply, json!({"outcome": "unrecognized"}));
    }

    #[tokio::test]
    async fn explicit_null_is_output() {
        let reply = service()
            .command(CommandRequest {
                name: "Nothing".into(),
                params: vec![],
            })
            .await;
        assert_eq!(reply, CommandReply::Output { value: Value::Null });
    }

    #[tokio::test]
    async fn handler_error_and_panic_become_failed() {
        let svc = service();
        let failed = svc
            .command(CommandRequest {
                name: "Fail".into(),
                params: vec![],
            })
            .await;
        assert!(matches!(failed, CommandReply::Failed { status } if status.message == "nope"));

        let panicked = svc
            .command(CommandRequest {
                name: "Boom".into(),
                params: vec![],
            })
            .await;
        assert!(matches!(panicked, CommandReply::Failed { .. }));
    }

    #[tokio::test]
    async fn help_list_and_info() {
        let svc = service();
        assert_eq!(
            svc.call(methods::GET_HELP, json!("Hello")).await.unwrap(),
            json!("help for Hello")
        );
        assert_eq!(
            svc.call(methods::GET_HELP, json!({"name": "Echo"})).await.unwrap(),
            json!("help for Echo")
        );
        assert_eq!(
            svc.call(methods::LIST_COMMAND, Value::Null).await.unwrap(),
            json!(["Hello", "Echo"])
        );
        assert_eq!(
            svc.call(methods::GET_PLUGIN_INFO, Value::Null).await.unwrap()["name"],
            "fixture"
        );
    }

    #[tokio::test]
    async fn bad_params_and_unknown_method() {
        let svc = service();
        let err = svc.call(methods::COMMAND, json!([1, 2])).await.unwrap_err();
        assert_eq!(err.code, FaultCode::InvalidParams);
        let err = svc.call("Explode", Value::Null).await.unwrap_err();
        assert_eq!(err.code, FaultCode::UnknownMethod);
    }
}
