pub mod cpm_scraper;
pub mod db;
pub mod fetch;
pub mod geocoding;
pub mod jsm_scraper;
pub mod models;
pub mod paging;
pub mod parse;
pub mod pipeline;
pub mod sources;
