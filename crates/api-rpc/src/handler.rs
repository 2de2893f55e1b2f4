//! RPC Method Handlers
//!
//! Implements the business logic for each JSON-RPC method.

use crate::error::{throttled, to_rpc_error};
use crate::rate_limiter::RateLimiter;
use crate::types::{PublishRequest, PublishResponse};
use courier_core::application::{Hub, InMemoryQueue};
use courier_core::domain::{HubStats, JobPayload, MessageType, QueueStats};
use courier_core::error::AppError;
use courier_core::port::MessagePublisher;
use jsonrpsee::types::ErrorObjectOwned;
use std::sync::Arc;
use tracing::{debug, info};

/// RPC Handler with injected dependencies
pub struct RpcHandler {
    queue: Arc<InMemoryQueue>,
    hub: Arc<Hub>,
    rate_limiter: RateLimiter,
}

impl RpcHandler {
    pub fn new(queue: Arc<InMemoryQueue>, hub: Arc<Hub>, rate_limiter: RateLimiter) -> Self {
        Self {
            queue,
            hub,
            rate_limiter,
        }
    }

    /// queue.publish.v1
    pub async fn publish(&self, params: PublishRequest) -> Result<PublishResponse, ErrorObjectOwned> {
        // Rate limiting check (DoS protection)
        if !self.rate_limiter.check() {
            return Err(throttled());
        }

        let message_type = MessageType::parse(params.message_type)
            .map_err(|e| to_rpc_error(AppError::from(e)))?;
        let message_id = self
            .queue
            .publish(&message_type, JobPayload::new(params.payload))
            .map_err(|e| to_rpc_error(AppError::from(e)))?;

        info!(message_id = %message_id, message_type = %message_type, "Message published via RPC");

        Ok(PublishResponse {
            message_id,
            message_type: message_type.as_str().to_string(),
        })
    }

    /// queue.stats.v1
    pub async fn queue_stats(&self) -> Result<QueueStats, ErrorObjectOwned> {
        debug!("queue.stats.v1");
        Ok(self.queue.stats())
    }

    /// hub.stats.v1
    pub async fn hub_stats(&self) -> Result<HubStats, ErrorObjectOwned> {
        debug!("hub.stats.v1");
        Ok(self.hub.stats())
    }
}
