//! Export poll backoff

use super::types::PollConfig;
use rand::Rng;
use std::time::Duration;

/// Next sleep between export status checks.
///
/// The first interval (`previous == 0`) is exactly `min_interval`. After that
/// each interval is drawn uniformly from `[previous, 2 * previous]` and capped
/// at `max_interval`.
pub fn next_poll_interval(previous: Duration, poll: &PollConfig) -> Duration {
    if previous.is_zero() {
        return poll.min_interval.min(poll.max_interval);
    }

    let low = previous.as_millis() as u64;
    let high = low.saturating_mul(2);
    let sampled = Duration::from_millis(rand::thread_rng().gen_range(low..=high));
    sampled.min(poll.max_interval)
}
