mod config;

pub use config::{SiteConfig, SiteConfigProvider, SiteTable};
