use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use rand::Rng;

/// Current time at microsecond precision, the resolution `TIMESTAMPTZ` keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Uniformly random pause in `[min, max]`. A collapsed window yields `min`.
pub fn jittered(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    rand::thread_rng().gen_range(min..=max)
}
