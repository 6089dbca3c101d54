//! 视频解析后端的抽象边界。
//!
//! 平台播放器配置解析、签名解密、流地址协商全部由外部提取器完成，
//! 本程序只消费其结果：元数据 + 可下载流列表。

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::download::models::Video;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to launch extractor {}: {source}", .program.display())]
    Spawn { program: PathBuf, source: io::Error },
    #[error("extractor exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("extractor returned invalid json: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("extractor returned no formats")]
    NoFormats,
}

pub trait VideoExtractor {
    fn name(&self) -> &str;

    fn resolve(&self, url: &str) -> Result<Video, ExtractError>;
}
