//! Vendor-facing services: API client, list fetcher and row normalizers

pub mod list_fetcher;
pub mod normalizer;
pub mod sky_client;

pub use list_fetcher::{fetch_list, fetch_lists, FetchReport, ListColumn, ListPageSource, ListRow};
pub use normalizer::{attendance_table, normalize_parents, normalize_transcripts};
pub use sky_client::SkyClient;
