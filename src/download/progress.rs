//! 进度上报：把剩余字节数换算成百分比并输出到控制台。

use std::io::Write;
use std::path::Path;

use super::models::FileSize;

/// `(total - remaining) / total * 100`，结果限制在 `[0, 100]`。
///
/// 总大小未知或为 0 时返回 `None`。
pub fn percent_completed(file_size: FileSize, bytes_remaining: u64) -> Option<f64> {
    let total = file_size.known().filter(|t| *t > 0)?;
    let done = total.saturating_sub(bytes_remaining);
    Some((100.0 * done as f64 / total as f64).clamp(0.0, 100.0))
}

pub(crate) struct ProgressReporter<W: Write> {
    file_size: FileSize,
    last_printed: Option<u64>,
    out: W,
}

impl<W: Write> ProgressReporter<W> {
    pub(crate) fn new(file_size: FileSize, out: W) -> Self {
        Self {
            file_size,
            last_printed: None,
            out,
        }
    }

    pub(crate) fn on_bytes_written(&mut self, written: u64) {
        if let FileSize::Known(total) = self.file_size {
            self.on_progress(total.saturating_sub(written));
        }
    }

    /// 整数百分比变化时才输出一行，避免每个读缓冲都刷屏。
    pub(crate) fn on_progress(&mut self, bytes_remaining: u64) {
        let Some(percent) = percent_completed(self.file_size, bytes_remaining) else {
            return;
        };
        let whole = percent.floor() as u64;
        if self.last_printed.is_some_and(|last| last >= whole) {
            return;
        }
        self.last_printed = Some(whole);
        let _ = writeln!(self.out, "{whole}% downloaded...");
    }

    pub(crate) fn on_complete(&mut self, file_path: &Path) {
        let _ = writeln!(self.out, "Video downloaded to '{}'", file_path.display());
        let _ = self.out.flush();
    }
}
