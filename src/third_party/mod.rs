//! 外部能力边界：视频解析后端与媒体传输。

pub mod extractor;
pub mod media_fetch;
pub mod ytdlp;
