//! Access service configuration.

use serde::Deserialize;

/// Configuration shared by the access services.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Pixel size of one QR module in rendered credentials.
    pub qr_module_size: u32,
    /// How many fresh tokens to try when a minted token collides.
    pub token_retry_limit: u32,
    /// Access log page size when the caller does not pick one.
    pub default_page_size: u64,
    /// Upper bound applied to any requested access log page size.
    pub max_page_size: u64,
    /// Re-check the creator's floor permissions when a visitor
    /// credential is used, not only when it is issued.
    pub recheck_permissions_on_use: bool,
    /// Seconds between background status sweeps.
    pub sweep_interval_secs: u64,
    /// Optional pepper prepended to passwords before verification.
    pub pepper: Option<String>,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            qr_module_size: 20,
            token_retry_limit: 3,
            default_page_size: 50,
            max_page_size: 200,
            recheck_permissions_on_use: false,
            sweep_interval_secs: 60,
            pepper: None,
        }
    }
}
