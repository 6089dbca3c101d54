//! 基于 yt-dlp 的解析后端：`--dump-single-json` 取元数据与格式列表。

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::extractor::{ExtractError, VideoExtractor};
use crate::base_system::context::Config;
use crate::download::models::{StreamInfo, Video, VideoDetails};

pub struct YtDlpExtractor {
    program: PathBuf,
    cookies_file: Option<PathBuf>,
}

impl YtDlpExtractor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cookies_file: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let extractor = Self::new(config.ytdlp_path.trim());
        match config
            .cookies_file
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            Some(cookies) => extractor.with_cookies(cookies),
            None => extractor,
        }
    }

    /// 年龄限制视频需要登录态，交给 yt-dlp 的 cookie 文件处理。
    pub fn with_cookies(mut self, path: impl AsRef<Path>) -> Self {
        self.cookies_file = Some(path.as_ref().to_path_buf());
        self
    }

    fn args(&self, url: &str) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["--dump-single-json", "--no-warnings", "--no-playlist"]
            .into_iter()
            .map(OsString::from)
            .collect();
        if let Some(cookies) = &self.cookies_file {
            args.push("--cookies".into());
            args.push(cookies.as_os_str().to_owned());
        }
        args.push("--".into());
        args.push(url.into());
        args
    }
}

impl VideoExtractor for YtDlpExtractor {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    fn resolve(&self, url: &str) -> Result<Video, ExtractError> {
        info!(target: "extractor", program = %self.program.display(), url, "解析视频");
        let output = Command::new(&self.program)
            .args(self.args(url))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            warn!(target: "extractor", status = %output.status, "yt-dlp 解析失败: {stderr}");
            return Err(ExtractError::Failed {
                status: output.status.to_string(),
                stderr,
            });
        }

        let video = parse_video(&output.stdout)?;
        debug!(
            target: "extractor",
            title = %video.details.title,
            streams = video.streams.len(),
            "解析完成"
        );
        Ok(video)
    }
}

#[derive(Debug, Deserialize)]
struct RawVideo {
    title: Option<String>,
    duration: Option<f64>,
    average_rating: Option<f64>,
    view_count: Option<u64>,
    uploader: Option<String>,
    channel: Option<String>,
    formats: Option<Vec<RawFormat>>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    url: Option<String>,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    filesize: Option<u64>,
    protocol: Option<String>,
    http_headers: Option<HashMap<String, String>>,
}

fn has_codec(codec: Option<&str>) -> bool {
    codec.is_some_and(|c| !c.is_empty() && c != "none")
}

impl RawFormat {
    /// 音视频同在一个文件里，且能通过单次 HTTP 请求取回。
    fn is_progressive(&self) -> bool {
        let direct = self
            .protocol
            .as_deref()
            .is_none_or(|p| p == "https" || p == "http");
        direct && has_codec(self.vcodec.as_deref()) && has_codec(self.acodec.as_deref())
    }

    fn into_stream(self) -> Option<StreamInfo> {
        let progressive = self.is_progressive();
        let url = self.url.filter(|u| !u.is_empty())?;
        let mut http_headers: Vec<(String, String)> =
            self.http_headers.unwrap_or_default().into_iter().collect();
        http_headers.sort();
        Some(StreamInfo {
            format_id: self.format_id.unwrap_or_default(),
            url,
            ext: self.ext.unwrap_or_default(),
            progressive,
            height: self.height,
            filesize: self.filesize,
            http_headers,
        })
    }
}

pub(crate) fn parse_video(stdout: &[u8]) -> Result<Video, ExtractError> {
    let raw: RawVideo = serde_json::from_slice(stdout)?;
    let formats = raw.formats.unwrap_or_default();
    if formats.is_empty() {
        return Err(ExtractError::NoFormats);
    }

    let details = VideoDetails {
        title: raw.title.unwrap_or_default(),
        length: raw.duration.map(|d| d.max(0.0).round() as u64).unwrap_or(0),
        rating: raw.average_rating,
        views: raw.view_count,
        author: raw.uploader.or(raw.channel).unwrap_or_default(),
    };
    let streams = formats
        .into_iter()
        .filter_map(RawFormat::into_stream)
        .collect();

    Ok(Video { details, streams })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "id": "abc123",
        "title": "Sample Clip",
        "duration": 212.6,
        "average_rating": null,
        "view_count": 1024,
        "uploader": "Someone",
        "channel": "Someone Channel",
        "formats": [
            {"format_id": "140", "url": "https://m/140", "ext": "m4a", "vcodec": "none", "acodec": "mp4a.40.2", "protocol": "https", "filesize": 3000},
            {"format_id": "18", "url": "https://m/18", "ext": "mp4", "vcodec": "avc1.42001E", "acodec": "mp4a.40.2", "height": 360, "protocol": "https", "filesize": 9000,
             "http_headers": {"User-Agent": "UA", "Accept": "*/*"}},
            {"format_id": "137", "url": "https://m/137", "ext": "mp4", "vcodec": "avc1.640028", "acodec": "none", "height": 1080, "protocol": "https"},
            {"format_id": "96", "url": "https://m/96.m3u8", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a", "height": 1080, "protocol": "m3u8_native"},
            {"format_id": "sb0", "ext": "mhtml", "vcodec": "none", "acodec": "none"}
        ]
    }"#;

    #[test]
    fn parses_details_and_streams() {
        let video = parse_video(SAMPLE.as_bytes()).unwrap();
        assert_eq!(video.details.title, "Sample Clip");
        assert_eq!(video.details.length, 213);
        assert_eq!(video.details.rating, None);
        assert_eq!(video.details.views, Some(1024));
        assert_eq!(video.details.author, "Someone");
        // 没有 url 的格式被丢弃
        assert_eq!(video.streams.len(), 4);
    }

    #[test]
    fn only_direct_muxed_formats_are_progressive() {
        let video = parse_video(SAMPLE.as_bytes()).unwrap();
        let progressive: Vec<&str> = video
            .streams
            .iter()
            .filter(|s| s.progressive)
            .map(|s| s.format_id.as_str())
            .collect();
        assert_eq!(progressive, vec!["18"]);

        let muxed = video.streams.iter().find(|s| s.format_id == "18").unwrap();
        assert_eq!(muxed.filesize, Some(9000));
        assert_eq!(
            muxed.http_headers,
            vec![
                ("Accept".to_string(), "*/*".to_string()),
                ("User-Agent".to_string(), "UA".to_string()),
            ]
        );
    }

    #[test]
    fn empty_format_list_is_an_error() {
        let err = parse_video(br#"{"title": "x", "formats": []}"#).unwrap_err();
        assert!(matches!(err, ExtractError::NoFormats));
        assert!(matches!(
            parse_video(b"not json").unwrap_err(),
            ExtractError::InvalidJson(_)
        ));
    }

    #[test]
    fn null_fields_are_treated_as_absent() {
        let video = parse_video(
            br#"{"title": "x", "formats": [
                {"format_id": "18", "url": "https://m/18", "ext": "mp4", "vcodec": "avc1", "acodec": "mp4a",
                 "height": 360, "http_headers": null, "filesize": null}
            ]}"#,
        )
        .unwrap();
        assert_eq!(video.streams.len(), 1);
        assert!(video.streams[0].http_headers.is_empty());
        assert!(video.streams[0].progressive);

        let err = parse_video(br#"{"title": "x", "formats": null}"#).unwrap_err();
        assert!(matches!(err, ExtractError::NoFormats));
    }

    #[test]
    fn cookies_are_passed_before_the_url() {
        let extractor = YtDlpExtractor::new("yt-dlp").with_cookies("cookies.txt");
        let args = extractor.args("https://youtu.be/abc");
        let args: Vec<String> = args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            vec![
                "--dump-single-json",
                "--no-warnings",
                "--no-playlist",
                "--cookies",
                "cookies.txt",
                "--",
                "https://youtu.be/abc",
            ]
        );
    }

    #[test]
    fn missing_program_reports_spawn_error() {
        let extractor = YtDlpExtractor::new("definitely-not-a-real-yt-dlp-binary");
        let err = extractor.resolve("https://youtu.be/abc").unwrap_err();
        assert!(matches!(err, ExtractError::Spawn { .. }));
    }
}
