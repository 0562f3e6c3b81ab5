pub mod network {
    pub const POSTGRES_DEFAULT_PORT: u16 = 5432;
    pub const HTTP_DEFAULT_PORT: u16 = 80;
    pub const TIMEOUT_PROBE_MS: u64 = 11_000;
    pub const TIMEOUT_CONNECTION_MS: u64 = 5_000;
}

pub mod probe {
    pub const TELEMETRY_PATH: &str = "fulldata.dat";
    pub const TELEMETRY_QUERY: &str = "a=100&b=100&c=0&d=100&e=0&f=en";
    /// Built-in logins tried after whatever the panel record supplies.
    pub const DEFAULT_LOGINS: &[(&str, &str)] = &[
        ("agri", "7008"),
        ("agri", "stor"),
        ("btu", "7564"),
        ("frontdoor", "backdoor"),
        ("backdoor", "frontdoor"),
    ];
}

pub mod scan {
    pub const SENTINEL_BYTE: u8 = 0x0c;
    pub const TERMINATOR_BYTE: u8 = 0x03;
    /// The sentinel only counts when it sits strictly past this offset.
    pub const DATA_START_MIN_OFFSET: usize = 900;
    pub const MAX_SCAN_OFFSET: usize = 1_450;
    pub const MIN_TOKEN_LEN: usize = 4;
    pub const MAX_TOKEN_LEN: usize = 18;
    pub const MAX_REJECTIONS: usize = 3;
    pub const MAX_CREDENTIALS: usize = 3;
}

pub mod persistence {
    pub const PANEL_LIST_SQL: &str = "SELECT storage_name, storage_id, storage_code, url, logins, panel_id FROM storage_monitor_list";
    pub const INSERT_RESULT_SQL: &str = "INSERT INTO storage_monitor (storage_id, storage_code, query_time, response_bytes, latency, result) VALUES ($1, $2, $3, $4, $5, $6)";
    pub const POOL_MAX_SIZE: u32 = 1;
}
