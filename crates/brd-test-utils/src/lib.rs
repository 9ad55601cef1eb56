//! Testing utilities for the BRD workspace
//!
//! Stub structuring oracles and document fixtures.

#![allow(missing_docs)]

pub mod fixtures;

use async_trait::async_trait;
use brd_oracle::{OracleError, OracleRequest, StructuringOracle};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Encode a contract-shaped oracle reply
pub fn reply_json<S: AsRef<str>>(source_texts: &[S], requirement_text: &str) -> String {
    let sources: Vec<&str> = source_texts.iter().map(AsRef::as_ref).collect();
    serde_json::json!({
        "source_texts": sources,
        "requirement_text": requirement_text,
    })
    .to_string()
}

/// Conforming reply that cites every fragment and joins them with spaces
pub fn echo_reply(request: &OracleRequest) -> String {
    reply_json(&request.fragment_texts, &request.fragment_texts.join(" "))
}

/// Oracle that always returns a conforming echo of its input
#[derive(Debug, Default)]
pub struct EchoOracle {
    calls: AtomicUsize,
}

impl EchoOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StructuringOracle for EchoOracle {
    async fn structure(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(echo_reply(request))
    }

    fn name(&self) -> &str {
        "echo"
    }
}

#[derive(Debug, Clone)]
enum Script {
    Reply(String),
    Fail(String),
}

/// Oracle with fixed replies keyed by fragment text
///
/// The first rule whose needle occurs in any fragment text of the request
/// decides the reply. Requests matching no rule get the echo reply.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    rules: Vec<(String, Script)>,
    requests: Mutex<Vec<OracleRequest>>,
}

impl ScriptedOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reply with `reply` for clusters containing `needle`
    #[must_use]
    pub fn with_reply(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Script::Reply(reply.into())));
        self
    }

    /// Fail the call for clusters containing `needle`
    #[must_use]
    pub fn failing_on(mut self, needle: impl Into<String>, message: impl Into<String>) -> Self {
        self.rules.push((needle.into(), Script::Fail(message.into())));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<OracleRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl StructuringOracle for ScriptedOracle {
    async fn structure(&self, request: &OracleRequest) -> Result<String, OracleError> {
        self.requests.lock().push(request.clone());

        let script = self.rules.iter().find_map(|(needle, script)| {
            request
                .fragment_texts
                .iter()
                .any(|text| text.contains(needle.as_str()))
                .then_some(script)
        });

        match script {
            Some(Script::Reply(reply)) => Ok(reply.clone()),
            Some(Script::Fail(message)) => Err(OracleError::Unavailable(message.clone())),
            None => Ok(echo_reply(request)),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Oracle whose every call fails at the transport level
#[derive(Debug, Default)]
pub struct FailingOracle;

impl FailingOracle {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StructuringOracle for FailingOracle {
    async fn structure(&self, _request: &OracleRequest) -> Result<String, OracleError> {
        Err(OracleError::Unavailable("scripted outage".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
