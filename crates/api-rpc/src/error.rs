//! RPC Error Types
//!
//! Maps application errors to JSON-RPC error codes.

use courier_core::error::{AppError, QueueError};
use courier_core::port::ChatError;
use jsonrpsee::types::ErrorObjectOwned;

/// RPC Error Codes
pub mod code {
    pub const VALIDATION_ERROR: i32 = 4000;
    pub const THROTTLED: i32 = 4003;
    pub const NO_HANDLER: i32 = 4004;
    pub const QUEUE_FULL: i32 = 4029;
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const NOT_RUNNING: i32 = 5003;
}

/// Convert AppError to JSON-RPC ErrorObject
pub fn to_rpc_error(err: AppError) -> ErrorObjectOwned {
    let message = err.to_string();
    let code = match &err {
        AppError::Queue(e) => queue_code(e),
        AppError::Validation(_) | AppError::Domain(_) | AppError::Auth(_) => code::VALIDATION_ERROR,
        AppError::Chat(ChatError::Validation(_)) => code::VALIDATION_ERROR,
        AppError::Chat(ChatError::RoomLimit(_)) | AppError::Config(_) => code::INTERNAL_ERROR,
    };
    ErrorObjectOwned::owned(code, message, None::<()>)
}

fn queue_code(err: &QueueError) -> i32 {
    match err {
        QueueError::NoHandlerRegistered(_) => code::NO_HANDLER,
        QueueError::QueueFull(_) => code::QUEUE_FULL,
        QueueError::NotRunning | QueueError::Stopped => code::NOT_RUNNING,
        QueueError::AlreadyRunning | QueueError::Cancelled | QueueError::ShutdownTimeout(_) => {
            code::INTERNAL_ERROR
        }
    }
}

pub fn throttled() -> ErrorObjectOwned {
    ErrorObjectOwned::owned(
        code::THROTTLED,
        "Rate limit exceeded. Please slow down.",
        None::<()>,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_core::domain::MessageType;

    #[test]
    fn test_queue_errors_map_to_distinct_codes() {
        let cases = [
            (QueueError::NoHandlerRegistered(MessageType::new("x")), code::NO_HANDLER),
            (QueueError::QueueFull(10), code::QUEUE_FULL),
            (QueueError::NotRunning, code::NOT_RUNNING),
            (QueueError::Stopped, code::NOT_RUNNING),
            (QueueError::Cancelled, code::INTERNAL_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(to_rpc_error(AppError::from(err)).code(), expected);
        }
    }

    #[test]
    fn test_validation_errors() {
        let err = to_rpc_error(AppError::Validation("bad".to_string()));
        assert_eq!(err.code(), code::VALIDATION_ERROR);
        assert!(err.message().contains("bad"));

        let err = to_rpc_error(AppError::Config("boom".to_string()));
        assert_eq!(err.code(), code::INTERNAL_ERROR);

        let err = to_rpc_error(AppError::Chat(ChatError::RoomLimit(10)));
        assert_eq!(err.code(), code::INTERNAL_ERROR);
    }
}
