pub mod achievements {

    pub const DETECTION_MASTER_TARGET: i32 = 10;

    pub const DAILY_LOGIN_TARGET: i32 = 5;
}

pub mod auth {

    pub const DEFAULT_TOKEN_TTL_HOURS: u64 = 24;

    /// Upper bound applied to configured token lifetimes (ten years).
    pub const MAX_TOKEN_TTL_HOURS: u64 = 87_600;

    pub const MIN_PASSWORD_LENGTH: usize = 8;

    /// Length in bytes of the secret generated when none is configured.
    pub const GENERATED_SECRET_BYTES: usize = 32;
}

pub mod limits {

    /// Request body cap; analysis uploads arrive as base64 data URLs.
    pub const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;
}
