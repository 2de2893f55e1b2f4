//! RPC Request/Response Types

use serde::{Deserialize, Serialize};

/// queue.publish.v1 - Publish a message to the task queue
#[derive(Debug, Deserialize)]
pub struct PublishRequest {
    pub message_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishResponse {
    pub message_id: String,
    pub message_type: String,
}

// queue.stats.v1 and hub.stats.v1 take no parameters and return
// `QueueStats` / `HubStats` from courier-core as-is.
