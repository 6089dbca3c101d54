//! 下载主流程编排：解析 → 选流 → 探测大小 → 传输。
//!
//! 每个致命错误都对应 `DownloadError` 的一个变体，其 `Display` 即展示给用户的提示文本。

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use thiserror::Error;
use tracing::{error, info, warn};

use super::models::{ContainerFormat, DownloadOutcome, DownloadRequest, FileSize, StreamInfo};
use super::plan::{prepare_plan, select_progressive};
use super::progress::ProgressReporter;
use crate::third_party::extractor::{ExtractError, VideoExtractor};
use crate::third_party::media_fetch::{self, MediaSource, PartialFiles, TransferError};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Video is unavailable. Make sure the link exists and is valid.\nURL: ({url})")]
    Unavailable {
        url: String,
        #[source]
        source: ExtractError,
    },
    #[error("Unable to get {format} stream of the video. Try another format.\nURL: {url}")]
    NoStream { format: ContainerFormat, url: String },
    #[error("Failed to download video. <{format}>\nURL: ({url})")]
    Transfer {
        format: ContainerFormat,
        url: String,
        #[source]
        source: TransferError,
    },
}

fn resolving_spinner(extractor: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(format!("waiting for {extractor}"));
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// 读取流大小：优先使用提取器给出的值，否则向服务器探测。
/// 读不到时降级为未知大小，下载照常进行。
fn probe_file_size<W: Write>(
    source: &dyn MediaSource,
    stream: &StreamInfo,
    format: ContainerFormat,
    out: &mut W,
) -> FileSize {
    if let Some(size) = stream.filesize.filter(|n| *n > 0) {
        return FileSize::Known(size);
    }
    match source.content_length(stream) {
        Ok(size) if size > 0 => FileSize::Known(size),
        Ok(_) => {
            warn!(target: "download", format_id = %stream.format_id, "服务器返回的流大小为 0");
            let _ = writeln!(
                out,
                "Cannot read {format} stream size; download progress unknown until completed."
            );
            FileSize::Unknown
        }
        Err(err) => {
            warn!(target: "download", format_id = %stream.format_id, "读取流大小失败: {err}");
            let _ = writeln!(
                out,
                "Cannot read {format} stream size; download progress unknown until completed."
            );
            FileSize::Unknown
        }
    }
}

fn already_downloaded(target: &Path, size: FileSize) -> bool {
    match (size, fs::metadata(target)) {
        (FileSize::Known(expected), Ok(meta)) => meta.is_file() && meta.len() == expected,
        _ => false,
    }
}

pub fn run_download<W: Write>(
    request: &DownloadRequest,
    extractor: &dyn VideoExtractor,
    source: &dyn MediaSource,
    partials: &PartialFiles,
    out: &mut W,
) -> Result<DownloadOutcome, DownloadError> {
    let url = request.url.as_str();
    let format = request.format;
    info!(target: "download", url, %format, path = %request.path.display(), "开始下载");

    let _ = writeln!(out, "Getting video...");
    let spinner = resolving_spinner(extractor.name());
    let resolved = extractor.resolve(url);
    spinner.finish_and_clear();
    let video = resolved.map_err(|source| {
        error!(target: "download", url, "解析失败: {source}");
        DownloadError::Unavailable {
            url: url.to_string(),
            source,
        }
    })?;

    let _ = writeln!(out, "Getting video details...");
    let details = video.details;

    let _ = writeln!(out, "Getting video streams...");
    for candidate in ContainerFormat::ALL {
        match select_progressive(&video.streams, candidate) {
            Some(s) => info!(
                target: "download",
                format = %candidate,
                format_id = %s.format_id,
                resolution = %s.resolution_label(),
                "最佳渐进式流"
            ),
            None => info!(target: "download", format = %candidate, "没有可用的渐进式流"),
        }
    }

    let _ = writeln!(out, "Selecting video format...");
    let Some(plan) = prepare_plan(&details, &video.streams, format, &request.path) else {
        warn!(target: "download", url, %format, "所选格式无可用流");
        return Err(DownloadError::NoStream {
            format,
            url: url.to_string(),
        });
    };

    let size = probe_file_size(source, plan.stream, format, out);
    let target: PathBuf = plan.target;

    if already_downloaded(&target, size) {
        info!(target: "download", path = %target.display(), "目标文件已存在且大小一致，跳过传输");
        ProgressReporter::new(size, &mut *out).on_complete(&target);
        return Ok(DownloadOutcome {
            details,
            file_path: target,
            skipped: true,
        });
    }

    let mut reporter = ProgressReporter::new(size, &mut *out);
    let written = media_fetch::download_stream(source, plan.stream, &target, partials, |n| {
        reporter.on_bytes_written(n)
    })
    .map_err(|source| {
        error!(target: "download", url, %format, "传输失败: {source}");
        DownloadError::Transfer {
            format,
            url: url.to_string(),
            source,
        }
    })?;
    reporter.on_complete(&target);
    info!(target: "download", path = %target.display(), bytes = written, "下载完成");

    Ok(DownloadOutcome {
        details,
        file_path: target,
        skipped: false,
    })
}
