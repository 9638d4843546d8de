//! Ranking oracle configuration.

use serde::{Deserialize, Serialize};

const fn default_timeout_secs() -> u64 {
    5
}

fn default_api_key_env() -> String {
    "ARGUS_ORACLE_API_KEY".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OracleConfig {
    /// HTTP endpoint that ranks candidates. Empty disables the oracle.
    #[serde(default)]
    pub endpoint: String,

    /// Environment variable holding the oracle's bearer token.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OracleConfig {
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty()
    }
}
