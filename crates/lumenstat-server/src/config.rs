/// Re-export `Config` from `lumenstat-core` for use within this crate.
///
/// Environment parsing lives in `lumenstat-core` so integration tests can
/// build a config without going through the server binary.
pub use lumenstat_core::config::Config;
