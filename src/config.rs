use crate::error::ApiError;
use dotenv::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::PathBuf;

const DEFAULT_IMAGE_BUCKET: &str = "tasks-images";

#[derive(Deserialize, Debug)]
pub struct Config {
    pub project_url: String,
    pub api_key: String,
    #[serde(default = "default_image_bucket")]
    pub image_bucket: String,
}

fn default_image_bucket() -> String {
    DEFAULT_IMAGE_BUCKET.to_string()
}

pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("supatask"))
}

/// Environment variables (including a local .env file) win over the config
/// file, so a checkout can be pointed at a scratch project without touching
/// `~/.config/supatask/config.toml`.
pub fn load() -> Result<Config, ApiError> {
    dotenv().ok();

    if let (Ok(project_url), Ok(api_key)) = (
        env::var("SUPABASE_PROJECT_URL"),
        env::var("SUPABASE_API_KEY"),
    ) {
        let image_bucket =
            env::var("SUPABASE_IMAGE_BUCKET").unwrap_or_else(|_| default_image_bucket());
        return Ok(Config {
            project_url,
            api_key,
            image_bucket,
        });
    }

    let path = config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or_else(|| ApiError::Config("could not determine the config directory".to_string()))?;

    let raw = fs::read_to_string(&path).map_err(|_| {
        ApiError::Config(format!(
            "set SUPABASE_PROJECT_URL and SUPABASE_API_KEY, or create {}",
            path.display()
        ))
    })?;

    toml::from_str(&raw).map_err(|err| ApiError::Config(format!("{}: {}", path.display(), err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let raw = r#"
            project_url = "https://abc.supabase.co"
            api_key = "anon-key"
            image_bucket = "pictures"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.project_url, "https://abc.supabase.co");
        assert_eq!(config.api_key, "anon-key");
        assert_eq!(config.image_bucket, "pictures");
    }

    #[test]
    fn test_image_bucket_defaults() {
        let raw = r#"
            project_url = "https://abc.supabase.co"
            api_key = "anon-key"
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.image_bucket, DEFAULT_IMAGE_BUCKET);
    }
}
