// src/lib.rs

pub mod config;
pub mod error;

pub mod entities {
    pub mod prelude;
    pub mod site_readings;
}

pub mod models {
    pub mod record;
    pub mod telemetry;
}

pub mod services {
    pub mod audit_log;
    pub mod normalizer;
    pub mod recorder;
    pub mod telemetry_client;
    pub mod token_cache;
}

pub mod jobs {
    pub mod telemetry_sync;
}
