// Integration timing
pub const DEFAULT_AUTO_RESET_INTERVAL_US: u64 = 4000; // 250 Hz publish rate
pub const US_IN_SECOND: f32 = 1_000_000.0_f32;
