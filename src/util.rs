use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, saturating to 0 on clock error.
pub fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

/// Convert `now()` to an NTP timestamp (seconds since 1900) split into (msw, lsw),
/// full 64-bit precision used by RTCP Sender Reports.
pub fn ntp_now() -> (u32, u32) {
    const NTP_UNIX_EPOCH_DIFF: u64 = 2_208_988_800;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0));
    let secs = now.as_secs() + NTP_UNIX_EPOCH_DIFF;
    let frac = ((u64::from(now.subsec_nanos())) << 32) / 1_000_000_000u64;
    (secs as u32, frac as u32)
}

/// Compact 32-bit NTP form used by LSR/DLSR (RFC3550 ยง4, A.3): (MSW<<16)|(LSW>>16).
#[inline]
#[must_use]
pub fn ntp_to_compact(msw: u32, lsw: u32) -> u32 {
    (msw << 16) | (lsw >> 16)
}

/// Current monotonic wall-clock time in microseconds, used for AU presentation
/// timestamps. Not tied to the Unix epoch; only deltas are meaningful.
pub fn now_micros() -> i64 {
    use std::sync::OnceLock;
    use std::time::Instant;
    static START: OnceLock<Instant> = OnceLock::new();
    let start = START.get_or_init(Instant::now);
    start.elapsed().as_micros() as i64
}
