use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::elements_rpc::{ElementsRpc, RpcError};

/// In-memory node answering from canned responses and recording calls.
#[derive(Default)]
pub struct MockRpc {
    responses: HashMap<String, Result<Value, (i64, String)>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, method: &str, result: Value) -> Self {
        self.responses.insert(method.to_string(), Ok(result));
        self
    }

    pub fn with_error(mut self, method: &str, code: i64, message: &str) -> Self {
        self.responses
            .insert(method.to_string(), Err((code, message.to_string())));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(method, _)| method.clone())
            .collect()
    }

    pub fn params_for(&self, method: &str) -> Option<Value> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(m, _)| m == method)
            .map(|(_, params)| params.clone())
    }
}

#[async_trait]
impl ElementsRpc for MockRpc {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((method.to_string(), params));
        match self.responses.get(method) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err((code, message))) => Err(RpcError::Node {
                code: *code,
                message: message.clone(),
            }),
            None => Err(RpcError::Node {
                code: -32601,
                message: "Method not found".to_string(),
            }),
        }
    }
}
