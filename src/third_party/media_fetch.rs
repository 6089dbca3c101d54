//! 媒体流传输：HEAD 取大小、GET 流式写盘。

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{
    ACCEPT, ACCEPT_ENCODING, CONNECTION, CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue,
};
use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tracing::{debug, warn};

use crate::download::models::StreamInfo;

const BUF_SIZE: usize = 8192;

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server did not report a content length")]
    MissingLength,
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to move download into place: {0}")]
    Persist(#[from] tempfile::PersistError),
}

pub trait MediaSource {
    /// 不下载正文，仅探测流的总字节数。
    fn content_length(&self, stream: &StreamInfo) -> Result<u64, TransferError>;

    fn open(&self, stream: &StreamInfo) -> Result<Box<dyn Read>, TransferError>;
}

pub struct HttpMediaSource {
    client: Client,
}

impl HttpMediaSource {
    pub fn new(timeout: Duration) -> Result<Self, TransferError> {
        // 不启用 gzip 解码，要求服务端按原始编码返回，保证字节数与 Content-Length 对应。
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(timeout)
            .timeout(None)
            .build()?;
        Ok(Self { client })
    }
}

fn stream_headers(stream: &StreamInfo) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (name, value) in &stream.http_headers {
        let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) else {
            debug!(target: "transfer", header = %name, "跳过无效请求头");
            continue;
        };
        if name == ACCEPT_ENCODING {
            continue;
        }
        headers.insert(name, value);
    }
    headers
}

impl MediaSource for HttpMediaSource {
    fn content_length(&self, stream: &StreamInfo) -> Result<u64, TransferError> {
        let resp = self
            .client
            .head(&stream.url)
            .headers(stream_headers(stream))
            .send()?
            .error_for_status()?;

        resp.headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<u64>().ok())
            .ok_or(TransferError::MissingLength)
    }

    fn open(&self, stream: &StreamInfo) -> Result<Box<dyn Read>, TransferError> {
        let resp = self
            .client
            .get(&stream.url)
            .headers(stream_headers(stream))
            .send()?
            .error_for_status()?;
        Ok(Box::new(resp))
    }
}

/// 正在写入的临时文件登记表。
///
/// Ctrl+C 会直接结束进程，临时文件的 Drop 不会执行；退出钩子通过 `remove_all` 清理。
#[derive(Debug, Clone, Default)]
pub struct PartialFiles {
    paths: Arc<Mutex<Vec<PathBuf>>>,
}

impl PartialFiles {
    fn track(&self, path: &Path) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.push(path.to_path_buf());
        }
    }

    fn untrack(&self, path: &Path) {
        if let Ok(mut paths) = self.paths.lock() {
            paths.retain(|p| p != path);
        }
    }

    pub fn remove_all(&self) {
        let Ok(mut paths) = self.paths.lock() else {
            return;
        };
        for path in paths.drain(..) {
            match fs::remove_file(&path) {
                Ok(()) => debug!(target: "transfer", path = %path.display(), "已清理临时文件"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(target: "transfer", path = %path.display(), "清理临时文件失败: {e}"),
            }
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> Vec<PathBuf> {
        self.paths.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

/// 把流写到 `target`，每写入一个缓冲块回调一次累计字节数。
///
/// 数据先写入同目录下的临时文件，完成后再改名，失败时不会留下残缺文件。
/// 写入期间临时文件登记在 `partials` 中。
pub fn download_stream(
    source: &dyn MediaSource,
    stream: &StreamInfo,
    target: &Path,
    partials: &PartialFiles,
    on_chunk: impl FnMut(u64),
) -> Result<u64, TransferError> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let tmp = Builder::new()
        .prefix(".tube-dl-")
        .suffix(".part")
        .tempfile_in(dir)
        .map_err(|source| TransferError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let part = tmp.path().to_path_buf();
    partials.track(&part);
    let result = write_and_persist(source, stream, tmp, target, on_chunk);
    partials.untrack(&part);
    result
}

fn write_and_persist(
    source: &dyn MediaSource,
    stream: &StreamInfo,
    mut tmp: NamedTempFile,
    target: &Path,
    mut on_chunk: impl FnMut(u64),
) -> Result<u64, TransferError> {
    let part = tmp.path().to_path_buf();
    let io_err = |source: io::Error| TransferError::Io {
        path: part.clone(),
        source,
    };

    let mut reader = source.open(stream)?;
    let mut buf = [0u8; BUF_SIZE];
    let mut written: u64 = 0;
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                warn!(target: "transfer", written, "读取下载流失败: {e}");
                return Err(io_err(e));
            }
        };
        tmp.write_all(&buf[..n]).map_err(io_err)?;
        written += n as u64;
        on_chunk(written);
    }
    tmp.flush().map_err(io_err)?;

    if target.exists() {
        fs::remove_file(target).map_err(|source| TransferError::Io {
            path: target.to_path_buf(),
            source,
        })?;
    }
    tmp.persist(target)?;
    debug!(target: "transfer", path = %target.display(), written, "写盘完成");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct MemorySource {
        body: Vec<u8>,
        fail_after: Option<usize>,
    }

    struct FailingReader {
        inner: Cursor<Vec<u8>>,
        remaining_ok: usize,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if self.remaining_ok == 0 {
                return Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset"));
            }
            let cap = buf.len().min(self.remaining_ok);
            let n = self.inner.read(&mut buf[..cap])?;
            self.remaining_ok -= n;
            Ok(n)
        }
    }

    impl MediaSource for MemorySource {
        fn content_length(&self, _stream: &StreamInfo) -> Result<u64, TransferError> {
            Ok(self.body.len() as u64)
        }

        fn open(&self, _stream: &StreamInfo) -> Result<Box<dyn Read>, TransferError> {
            match self.fail_after {
                Some(n) => Ok(Box::new(FailingReader {
                    inner: Cursor::new(self.body.clone()),
                    remaining_ok: n,
                })),
                None => Ok(Box::new(Cursor::new(self.body.clone()))),
            }
        }
    }

    #[test]
    fn writes_body_and_reports_cumulative_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("clip.mp4");
        let source = MemorySource {
            body: vec![7u8; BUF_SIZE * 2 + 100],
            fail_after: None,
        };

        let mut seen = Vec::new();
        let written = download_stream(
            &source,
            &StreamInfo::default(),
            &target,
            &PartialFiles::default(),
            |n| seen.push(n),
        )
        .unwrap();

        assert_eq!(written, (BUF_SIZE * 2 + 100) as u64);
        assert_eq!(fs::read(&target).unwrap().len(), BUF_SIZE * 2 + 100);
        assert_eq!(seen.last().copied(), Some(written));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn failed_transfer_leaves_no_files_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("clip.webm");
        let source = MemorySource {
            body: vec![1u8; 50_000],
            fail_after: Some(10_000),
        };

        let err = download_stream(
            &source,
            &StreamInfo::default(),
            &target,
            &PartialFiles::default(),
            |_| {},
        )
        .unwrap_err();
        assert!(matches!(err, TransferError::Io { .. }));
        assert!(!target.exists());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn existing_target_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("clip.mp4");
        fs::write(&target, b"old contents that are longer").unwrap();
        let source = MemorySource {
            body: b"new".to_vec(),
            fail_after: None,
        };

        download_stream(
            &source,
            &StreamInfo::default(),
            &target,
            &PartialFiles::default(),
            |_| {},
        )
        .unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"new");
    }

    /// 模拟 Ctrl+C：传输途中退出钩子触发清理。
    struct InterruptedSource {
        partials: PartialFiles,
        dir: PathBuf,
    }

    struct InterruptingReader {
        partials: PartialFiles,
        dir: PathBuf,
        sent: bool,
    }

    impl Read for InterruptingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.sent {
                self.sent = true;
                buf[..4].copy_from_slice(b"part");
                return Ok(4);
            }
            let tracked = self.partials.tracked();
            assert_eq!(tracked.len(), 1);
            assert!(tracked[0].exists());
            self.partials.remove_all();
            assert_eq!(fs::read_dir(&self.dir).unwrap().count(), 0);
            Err(io::Error::new(io::ErrorKind::ConnectionAborted, "interrupted"))
        }
    }

    impl MediaSource for InterruptedSource {
        fn content_length(&self, _stream: &StreamInfo) -> Result<u64, TransferError> {
            Ok(1_000_000)
        }

        fn open(&self, _stream: &StreamInfo) -> Result<Box<dyn Read>, TransferError> {
            Ok(Box::new(InterruptingReader {
                partials: self.partials.clone(),
                dir: self.dir.clone(),
                sent: false,
            }))
        }
    }

    #[test]
    fn exit_cleanup_removes_part_file_mid_transfer() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("clip.mp4");
        let partials = PartialFiles::default();
        let source = InterruptedSource {
            partials: partials.clone(),
            dir: dir.path().to_path_buf(),
        };

        let err = download_stream(&source, &StreamInfo::default(), &target, &partials, |_| {})
            .unwrap_err();
        assert!(matches!(err, TransferError::Io { .. }));
        assert!(partials.tracked().is_empty());
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn finished_transfer_is_no_longer_tracked() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("clip.mp4");
        let partials = PartialFiles::default();
        let source = MemorySource {
            body: b"done".to_vec(),
            fail_after: None,
        };

        download_stream(&source, &StreamInfo::default(), &target, &partials, |_| {}).unwrap();
        assert!(partials.tracked().is_empty());
        partials.remove_all();
        assert_eq!(fs::read(&target).unwrap(), b"done");
    }

    #[test]
    fn invalid_stream_headers_are_skipped() {
        let stream = StreamInfo {
            http_headers: vec![
                ("User-Agent".to_string(), "UA".to_string()),
                ("Bad Header".to_string(), "x".to_string()),
                ("Accept-Encoding".to_string(), "gzip".to_string()),
            ],
            ..StreamInfo::default()
        };
        let headers = stream_headers(&stream);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("user-agent").unwrap(), "UA");
    }
}
