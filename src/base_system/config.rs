//! 配置文件读取：JSONC（剔除 `//` 注释行）→ JSON 解析 → 必填项与版本校验。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Unable to find {}. Make sure it is in the same folder as this program.",
        .path.display()
    )]
    NotFound { path: PathBuf, source: io::Error },
    #[error("Unable to read {}. Is it corrupted?", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("Unable to read {}. Is it corrupted?", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Unable to read {}. Is it corrupted? (missing `{key}`)", .path.display())]
    MissingField { path: PathBuf, key: &'static str },
    #[error("Invalid config version! Current version: {expected}")]
    VersionMismatch { expected: String },
}

pub trait ConfigSpec: DeserializeOwned {
    const FILE_NAME: &'static str;
    const REQUIRED_KEYS: &'static [&'static str];

    fn version(&self) -> &str;
}

static RE_COMMENT_LINE: OnceLock<Regex> = OnceLock::new();

fn re_comment_line() -> &'static Regex {
    RE_COMMENT_LINE
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*//.*$").expect("compile RE_COMMENT_LINE"))
}

/// 仅剔除整行注释；行内的 `//`（例如字符串里的 URL）保持原样。
/// 行数不变，解析错误里的行号仍对应原文件。
pub fn strip_comments(raw: &str) -> String {
    re_comment_line().replace_all(raw, "").into_owned()
}

/// 读取并校验配置。
///
/// # Path resolution
/// - `config_path` 为 Some 时使用该路径
/// - 否则使用当前工作目录下的 `FILE_NAME`
pub fn load<T: ConfigSpec>(
    config_path: Option<&Path>,
    expected_version: &str,
) -> Result<T, ConfigError> {
    let path = resolve_path::<T>(config_path);

    let raw = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: path.clone(),
                source,
            }
        } else {
            ConfigError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;

    let value: Value =
        serde_json::from_str(&strip_comments(&raw)).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

    if let Some(key) = missing_required_key::<T>(&value) {
        return Err(ConfigError::MissingField { path, key });
    }

    let config: T = serde_json::from_value(value).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;

    if config.version() != expected_version {
        return Err(ConfigError::VersionMismatch {
            expected: expected_version.to_string(),
        });
    }

    Ok(config)
}

fn missing_required_key<T: ConfigSpec>(value: &Value) -> Option<&'static str> {
    let Value::Object(map) = value else {
        return T::REQUIRED_KEYS.first().copied();
    };
    T::REQUIRED_KEYS
        .iter()
        .copied()
        .find(|key| map.get(*key).is_none_or(Value::is_null))
}

fn resolve_path<T: ConfigSpec>(path: Option<&Path>) -> PathBuf {
    match path {
        Some(p) => p.to_path_buf(),
        None => PathBuf::from(T::FILE_NAME),
    }
}
