//! 全局配置结构（Config）与默认值。
//!
//! 对应工作目录下的 `config.jsonc`。

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::config::{self, ConfigError, ConfigSpec};
use crate::download::models::ContainerFormat;

pub const USERNAME_PLACEHOLDER: &str = "<USERNAME>";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub version: String,
    pub default_download_path: String,
    pub default_format: ContainerFormat,

    // 解析后端
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: String,
    #[serde(default)]
    pub cookies_file: Option<String>,

    // 网络配置
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.jsonc";
    const REQUIRED_KEYS: &'static [&'static str] =
        &["version", "defaultDownloadPath", "defaultFormat"];

    fn version(&self) -> &str {
        &self.version
    }
}

impl Config {
    /// 读取配置并展开 `<USERNAME>` 占位符。
    pub fn load(path: Option<&Path>, expected_version: &str) -> Result<Self, ConfigError> {
        let mut cfg: Config = config::load(path, expected_version)?;
        if let Some(user) = current_username() {
            cfg.default_download_path = expand_username(&cfg.default_download_path, &user);
        }
        Ok(cfg)
    }

    pub fn default_download_dir(&self) -> PathBuf {
        PathBuf::from(&self.default_download_path)
    }
}

pub fn expand_username(path: &str, user: &str) -> String {
    path.replace(USERNAME_PLACEHOLDER, user)
}

fn current_username() -> Option<String> {
    let var = if cfg!(windows) { "USERNAME" } else { "USER" };
    std::env::var(var).ok().filter(|s| !s.trim().is_empty())
}

/// 把标题变成可用的文件名：替换 Windows 禁用字符与控制字符，去掉结尾的空格/点，
/// 避开保留名，并按字节长度截断（不切断多字节字符）。
pub fn safe_fs_name(name: &str, replacement: &str, max_len: usize) -> String {
    let rep = replacement.chars().next().unwrap_or('_');
    let mut cleaned: String = name
        .chars()
        .map(|ch| match ch {
            ':' | '"' | '<' | '>' | '/' | '\\' | '|' | '?' | '*' => rep,
            c if (c as u32) < 32 || c == '\u{7f}' => rep,
            _ => ch,
        })
        .collect();

    cleaned.truncate(cleaned.trim_end().len());
    while cleaned.ends_with(' ') || cleaned.ends_with('.') {
        cleaned.pop();
    }

    if cleaned.is_empty() {
        cleaned.push_str("video");
    }

    const RESERVED: [&str; 22] = [
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    let upper = cleaned.to_uppercase();
    if RESERVED.contains(&upper.as_str()) {
        cleaned = format!("_{}", cleaned);
    }

    if cleaned.len() > max_len {
        let mut end = max_len;
        while !cleaned.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        cleaned.truncate(end);
        while cleaned.ends_with(' ') || cleaned.ends_with('.') {
            cleaned.pop();
        }
        if cleaned.is_empty() {
            cleaned.push_str("video");
        }
    }

    cleaned
}

fn default_ytdlp_path() -> String {
    "yt-dlp".to_string()
}

fn default_request_timeout() -> u64 {
    30
}
