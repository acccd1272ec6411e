use std::time::Duration;

use clap::Args;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";

/// Connection settings shared by every command.
#[derive(Debug, Clone, Args)]
pub struct Config {
    /// Base address of the survey backend
    #[arg(
        long,
        global = true,
        env = "AIMS_API_BASE_URL",
        default_value = DEFAULT_API_BASE_URL
    )]
    pub api_base_url: String,

    /// Per-request timeout in seconds
    #[arg(long, global = true, env = "AIMS_HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub timeout_secs: u64,
}

impl Config {
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn http_client(&self) -> anyhow::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout())
            .build()?;
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, Parser};

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        config: Config,
    }

    fn default_of(id: &str) -> Vec<String> {
        Harness::command()
            .get_arguments()
            .find(|arg| arg.get_id() == id)
            .unwrap()
            .get_default_values()
            .iter()
            .map(|value| value.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn defaults_point_at_local_backend() {
        // Read from the declared arguments so AIMS_* variables in the
        // environment do not change the result.
        assert_eq!(default_of("api_base_url"), vec![DEFAULT_API_BASE_URL.to_string()]);
        assert_eq!(default_of("timeout_secs"), vec!["30".to_string()]);
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let harness =
            Harness::try_parse_from(["aims-result", "--api-base-url", "http://svc:9000/api/"])
                .unwrap();
        assert_eq!(harness.config.base_url(), "http://svc:9000/api");
    }

    #[test]
    fn zero_timeout_is_clamped() {
        let harness =
            Harness::try_parse_from(["aims-result", "--timeout-secs", "0"]).unwrap();
        assert_eq!(harness.config.timeout(), Duration::from_secs(1));
    }
}
