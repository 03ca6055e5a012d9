//! Configuration module for Shop-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shop_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Settle delay: {:?}", config.crawler.settle_delay());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    BrowserConfig, CacheBackend, CacheConfig, Config, CrawlerConfig, OutputConfig, SiteConfig,
};

pub use parser::{load_config, load_config_or_default, parse_config};
pub use validation::validate;
