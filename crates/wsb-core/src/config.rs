use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, Result};

/// Fixed behavioural constants of the bot. Not read from the environment.
#[derive(Clone, Debug)]
pub struct BotSettings {
    pub max_file_size: usize,
    pub sticker_size: u32,
    pub sticker_author: String,
    pub default_sticker_name: String,
    pub sticker_command: String,
    pub watermark_command: String,
    pub tagall_command: String,
    pub help_aliases: Vec<String>,
    pub download_timeout: Duration,
    pub reconnect_delay: Duration,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            max_file_size: 8 * 1024 * 1024,
            sticker_size: 512,
            sticker_author: "Bot Sticker WA".to_string(),
            default_sticker_name: "Bot WhatsApp".to_string(),
            sticker_command: ".s".to_string(),
            watermark_command: ".wm".to_string(),
            tagall_command: ".tagall".to_string(),
            help_aliases: vec![
                ".help".to_string(),
                "!sticker".to_string(),
                "!stiker".to_string(),
            ],
            download_timeout: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
        }
    }
}

/// Deployment configuration for the session transport.
///
/// Only the bridge location and the persisted-session (auth) settings come
/// from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub bridge_url: String,
    pub client_id: String,
    pub auth_dir: PathBuf,
    pub poll_timeout: Duration,
    pub bot: BotSettings,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let bridge_url = env_str("WA_BRIDGE_URL")
            .and_then(non_empty)
            .unwrap_or_else(|| "http://127.0.0.1:3000".to_string());
        if !(bridge_url.starts_with("http://") || bridge_url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "WA_BRIDGE_URL must be an http(s) URL, got {bridge_url}"
            )));
        }

        let client_id = env_str("WA_CLIENT_ID")
            .and_then(non_empty)
            .unwrap_or_else(|| "sticker-bot".to_string());
        if !client_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::Config(
                "WA_CLIENT_ID may only contain alphanumerics, '-' and '_'".to_string(),
            ));
        }

        let auth_dir = env_path("WA_AUTH_DIR").unwrap_or_else(|| PathBuf::from(".wwebjs_auth"));
        fs::create_dir_all(&auth_dir)?;

        let poll_timeout = Duration::from_secs(env_u64("WA_POLL_TIMEOUT_SECS").unwrap_or(30).max(1));

        Ok(Self {
            bridge_url: bridge_url.trim_end_matches('/').to_string(),
            client_id,
            auth_dir,
            poll_timeout,
            bot: BotSettings::default(),
        })
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var_os(key)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
