use std::env;

use crate::error::{PipelineError, Result};

/// User agent sent on every Reddit request. Reddit throttles generic agents
/// hard, so the string names the tool and version.
pub const USER_AGENT: &str = "redditshorts/0.1 (story video pipeline)";

/// Reddit API credentials, read from the environment at startup. A partial
/// set is a fatal condition; the pipeline never starts without all three.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            client_id: require("CLIENT_ID")?,
            client_secret: require("CLIENT_SECRET")?,
            redirect_uri: require("REDIRECT_URI")?,
        })
    }
}

fn require(name: &str) -> Result<String> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(PipelineError::Config(format!(
            "environment variable {name} is not set"
        ))),
    }
}
