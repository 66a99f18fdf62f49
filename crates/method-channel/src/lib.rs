//! # Mapframe Method Channel
//!
//! Named method channels between the embedder runtime and plugin code.
//! A [`Messenger`] routes each incoming [`MethodCall`] to whichever
//! [`MethodHandler`] is bound to the channel name; the handler answers
//! with a [`MethodReply`].

pub mod handler;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

pub use handler::{FnHandler, MethodHandler};

/// Channel routing error
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChannelError {
    #[error("No handler bound to channel: {0}")]
    NoHandler(String),
}

/// A single invocation arriving over a named channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    /// Method name, interpreted by the bound handler.
    pub method: String,
    /// Call arguments; `Null` when the caller passed none.
    #[serde(default)]
    pub args: serde_json::Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: serde_json::Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    pub fn no_args(method: impl Into<String>) -> Self {
        Self::new(method, serde_json::Value::Null)
    }
}

/// Outcome of a method call, reported back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MethodReply {
    /// The call ran to completion. The payload may be `Null`.
    Success(serde_json::Value),
    /// The call ran and failed.
    Error {
        code: String,
        message: String,
        details: Option<serde_json::Value>,
    },
    /// The handler does not recognize the method name.
    NotImplemented,
}

impl MethodReply {
    /// Success with no payload.
    pub fn ok() -> Self {
        MethodReply::Success(serde_json::Value::Null)
    }

    pub fn error(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        MethodReply::Error {
            code: code.into(),
            message: message.into(),
            details,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, MethodReply::Success(_))
    }
}

/// Routes calls to per-channel handlers.
///
/// At most one handler is bound per channel name; binding again replaces
/// the previous handler, and clearing an unbound name is a no-op.
pub struct Messenger {
    handlers: RwLock<HashMap<String, Arc<dyn MethodHandler>>>,
}

impl Messenger {
    pub fn new() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }

    pub fn bind(&self, channel: &str, handler: Arc<dyn MethodHandler>) {
        self.handlers.write().insert(channel.to_string(), handler);
    }

    pub fn clear(&self, channel: &str) {
        self.handlers.write().remove(channel);
    }

    pub fn has_handler(&self, channel: &str) -> bool {
        self.handlers.read().contains_key(channel)
    }

    /// Dispatch a call to the handler bound to `channel`.
    pub async fn invoke(&self, channel: &str, call: MethodCall) -> Result<MethodReply, ChannelError> {
        let handler = self.handlers.read().get(channel).cloned();
        match handler {
            Some(handler) => Ok(handler.handle(call).await),
            None => Err(ChannelError::NoHandler(channel.to_string())),
        }
    }
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

/// A named channel on a shared [`Messenger`].
///
/// Thin handle pairing the channel name with the messenger it routes
/// through; cloning is cheap and clones address the same binding.
#[derive(Clone)]
pub struct MethodChannel {
    name: String,
    messenger: Arc<Messenger>,
}

impl MethodChannel {
    pub fn new(messenger: Arc<Messenger>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messenger,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind `handler` as the channel's sole handler, replacing any
    /// previous one.
    pub fn set_handler(&self, handler: Arc<dyn MethodHandler>) {
        self.messenger.bind(&self.name, handler);
    }

    /// Unbind the channel's handler, if any.
    pub fn clear_handler(&self) {
        self.messenger.clear(&self.name);
    }

    pub fn has_handler(&self) -> bool {
        self.messenger.has_handler(&self.name)
    }

    pub async fn invoke(&self, call: MethodCall) -> Result<MethodReply, ChannelError> {
        self.messenger.invoke(&self.name, call).await
    }
}
