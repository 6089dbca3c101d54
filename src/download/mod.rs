//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`：数据模型（ContainerFormat / StreamInfo / VideoDetails / FileSize 等）
//! - `plan`：渐进式流挑选与落盘文件名
//! - `progress`：百分比换算与控制台进度输出
//! - `downloader`：下载主流程编排

pub mod downloader;
pub mod models;
pub mod plan;
pub(crate) mod progress;
