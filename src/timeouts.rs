pub mod ms {
    pub const POLL_INTERVAL: u64 = 100;
    pub const ACTION: u64 = 10_000;
    pub const REMOTE_REQUEST: u64 = 5_000;
}

pub mod secs {
    pub const ENGINE_LAUNCH: u64 = 30;
    pub const NAVIGATION: u64 = 30;
    pub const CDP_REQUEST: u64 = 120;
}
