/// Markers written into an episode's variant map instead of a locator.
pub mod markers {

    pub const INVALID: &str = "invalid";

    pub const UNREACHABLE: &str = "unreachable";

    pub const SWITCH_FAILED: &str = "switch-failed";
}

pub mod variants {

    /// Label assumed for the active variant when the selector cannot be read.
    pub const FALLBACK_LABEL: &str = "Japanese (SUB)";
}

pub mod intervals {
    use std::time::Duration;

    /// Pause between polls while waiting for an element to appear.
    pub const ELEMENT_POLL: Duration = Duration::from_millis(250);

    pub const SESSION_SHUTDOWN: Duration = Duration::from_secs(2);

    /// Pause between reads of a poster that has not loaded yet.
    pub const POSTER_RETRY: Duration = Duration::from_millis(300);
}

pub mod limits {

    pub const DEFAULT_EPISODE_BUDGET: usize = 5;

    pub const DEFAULT_MAX_SHOWS: usize = 36;

    /// Attempts made at reading a lazily loaded poster before giving up.
    pub const POSTER_ATTEMPTS: u32 = 5;
}
