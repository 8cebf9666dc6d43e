use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use http_fetch::{FetchConfig, HttpFetch, OptionMap, option_map};

#[derive(Clone, Debug, Parser)]
#[command(name = "http-fetch", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
pub struct Cli {
    #[arg(help = "URL of the page to fetch")]
    pub url: String,

    #[arg(short, long, default_value = "data/result.html", help = "File the decoded page is written to")]
    pub output: PathBuf,

    #[arg(short = 'X', long, help = "Request method")]
    pub method: Option<String>,

    #[arg(short = 'A', long = "user-agent", help = "User-Agent header")]
    pub user_agent: Option<String>,

    #[arg(short = 'b', long = "cookie", value_parser = parse_pair, help = "Cookie as key=value, repeatable")]
    pub cookies: Vec<(String, String)>,

    #[arg(short = 'd', long = "data", value_parser = parse_pair, help = "Body field as key=value, repeatable")]
    pub data: Vec<(String, String)>,

    #[arg(short = 'H', long = "header", value_parser = parse_header, help = "Header as 'Name: value', repeatable")]
    pub headers: Vec<(String, String)>,

    #[arg(long, help = "Charset used when the response declares none")]
    pub charset: Option<String>,

    #[arg(long, value_name = "SECS", help = "Abort the fetch after this many seconds")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "FILE", help = "TOML file with client settings")]
    pub config: Option<PathBuf>,

    #[arg(short, long, help = "Log request details")]
    pub verbose: bool,
}

impl Cli {
    /// Client settings from `--config`, overridden by explicit flags.
    pub fn load_config(&self) -> Result<FetchConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                toml::from_str::<FetchConfig>(&raw)
                    .with_context(|| format!("Failed to parse config {}", path.display()))?
            }
            None => FetchConfig::default(),
        };

        if let Some(charset) = &self.charset {
            config = config.charset(charset);
        }
        if let Some(secs) = self.timeout {
            config = config.timeout(Duration::from_secs(secs));
        }
        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }
        Ok(config)
    }

    /// Apply method, cookie and header flags to the client template.
    pub fn apply(&self, client: &mut HttpFetch) {
        if let Some(method) = &self.method {
            client.set_method(Some(method.as_str()));
        }
        if !self.cookies.is_empty() {
            client.set_cookie(self.cookies.iter().map(|(k, v)| (k, v)));
        }
        if !self.headers.is_empty() {
            client.set_headers(self.headers.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }

    /// Request body fields, if any were given.
    pub fn body(&self) -> Option<OptionMap> {
        (!self.data.is_empty()).then(|| option_map(self.data.iter().map(|(k, v)| (k.clone(), v.clone()))))
    }
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s.split_once(':').ok_or_else(|| format!("expected 'Name: value', got '{s}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{s}'"));
    }
    Ok((name.to_string(), value.trim().to_string()))
}
