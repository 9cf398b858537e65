use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, truncated to the 32-bit RTMP clock.
pub fn current_timestamp() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u32)
        .unwrap_or(0)
}

/// Milliseconds from `start` to `end` on the wrapping 32-bit clock.
pub fn elapsed_ms(start: u32, end: u32) -> u32 {
    end.wrapping_sub(start)
}
