// Real-time constants (ADR: No magic values)
use std::time::Duration;

/// Per-connection outbound buffer (frames). A full buffer drops broadcasts
/// for that recipient only.
pub const OUTBOUND_BUFFER_CAPACITY: usize = 256;

/// How long a closing connection's writer may flush before it is aborted (2s)
pub const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);
