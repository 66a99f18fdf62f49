//! Method handlers

use crate::{MethodCall, MethodReply};
use async_trait::async_trait;

/// Receiver side of a method channel.
#[async_trait]
pub trait MethodHandler: Send + Sync {
    /// Handle one call. Unrecognized methods answer
    /// [`MethodReply::NotImplemented`].
    async fn handle(&self, call: MethodCall) -> MethodReply;
}

/// Simple function-based handler
pub struct FnHandler<F>
where
    F: Fn(MethodCall) -> MethodReply + Send + Sync,
{
    handler: F,
}

impl<F> FnHandler<F>
where
    F: Fn(MethodCall) -> MethodReply + Send + Sync,
{
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

#[async_trait]
impl<F> MethodHandler for FnHandler<F>
where
    F: Fn(MethodCall) -> MethodReply + Send + Sync,
{
    async fn handle(&self, call: MethodCall) -> MethodReply {
        (self.handler)(call)
    }
}
