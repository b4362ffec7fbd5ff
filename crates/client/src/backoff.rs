//! Cancellable sleeps and jittered exponential backoff for long-lived loops.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Sleep for `dur` unless `token` is cancelled first. Returns true on cancellation.
pub(crate) async fn sleep_or_cancel(token: &CancellationToken, dur: Duration) -> bool {
    tokio::select! {
        () = token.cancelled() => true,
        () = sleep(dur) => false,
    }
}

/// Double `current`, clamp to `max`, then add up to 10% jitter (still clamped).
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn next_backoff(current: Duration, max: Duration) -> Duration {
    let cur = current.as_millis().min(u128::from(u64::MAX)) as u64;
    let max = max.as_millis().min(u128::from(u64::MAX)) as u64;

    let base = cur.saturating_mul(2).min(max);
    if base == 0 {
        return Duration::ZERO;
    }

    let jitter = base / 10;
    let add = if jitter > 0 {
        rand::random::<u64>() % (jitter + 1)
    } else {
        0
    };

    Duration::from_millis(base.saturating_add(add).min(max))
}
