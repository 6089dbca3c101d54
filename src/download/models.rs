//! 下载相关的数据模型定义。
//!
//! 包含容器格式、视频元数据、可下载流、下载请求/结果等核心数据结构。

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// 允许下载的容器格式（命令行与配置文件共用同一枚举）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Webm,
}

impl ContainerFormat {
    pub const ALL: [ContainerFormat; 2] = [ContainerFormat::Mp4, ContainerFormat::Webm];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Webm => "webm",
        }
    }

    /// 与流的扩展名比较（忽略大小写与前导点）。
    pub fn matches_ext(&self, ext: &str) -> bool {
        ext.trim_start_matches('.').eq_ignore_ascii_case(self.as_str())
    }
}

impl fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoDetails {
    pub title: String,
    /// 时长（秒）
    pub length: u64,
    pub rating: Option<f64>,
    pub views: Option<u64>,
    pub author: String,
}

/// 提取器返回的单个可下载流。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    pub format_id: String,
    pub url: String,
    pub ext: String,
    /// 单文件同时包含音频与视频
    pub progressive: bool,
    pub height: Option<u32>,
    pub filesize: Option<u64>,
    pub http_headers: Vec<(String, String)>,
}

impl StreamInfo {
    pub fn resolution_label(&self) -> String {
        match self.height {
            Some(h) => format!("{h}p"),
            None => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Video {
    pub details: VideoDetails,
    pub streams: Vec<StreamInfo>,
}

/// 当前下载文件的总大小；读取失败时为 `Unknown`，进度不再打印。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSize {
    Known(u64),
    Unknown,
}

impl FileSize {
    pub fn known(self) -> Option<u64> {
        match self {
            FileSize::Known(n) => Some(n),
            FileSize::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    pub path: PathBuf,
    pub format: ContainerFormat,
}

#[derive(Debug, Clone)]
pub struct DownloadOutcome {
    pub details: VideoDetails,
    pub file_path: PathBuf,
    /// 目标文件已存在且大小一致，未重新传输
    pub skipped: bool,
}
