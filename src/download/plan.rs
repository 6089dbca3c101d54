//! 下载计划：按容器格式挑选最佳渐进式流，并确定落盘文件名。

use std::path::{Path, PathBuf};

use crate::base_system::context::safe_fs_name;

use super::models::{ContainerFormat, StreamInfo, VideoDetails};

#[derive(Debug, Clone)]
pub struct DownloadPlan<'a> {
    pub stream: &'a StreamInfo,
    pub target: PathBuf,
}

/// 过滤出渐进式且扩展名匹配的流，按分辨率降序取第一个。
///
/// 没有分辨率信息的流不参与排序；分辨率相同时保留提取器给出的先后顺序。
pub fn select_progressive(streams: &[StreamInfo], format: ContainerFormat) -> Option<&StreamInfo> {
    streams
        .iter()
        .filter(|s| s.progressive && format.matches_ext(&s.ext))
        .filter(|s| s.height.is_some())
        .fold(None, |best: Option<&StreamInfo>, s| match best {
            Some(b) if b.height >= s.height => Some(b),
            _ => Some(s),
        })
}

pub fn output_file_name(details: &VideoDetails, stream: &StreamInfo) -> String {
    let stem = safe_fs_name(&details.title, "_", 180);
    let ext = stream.ext.trim_start_matches('.');
    if ext.is_empty() {
        stem
    } else {
        format!("{stem}.{ext}")
    }
}

pub fn prepare_plan<'a>(
    details: &VideoDetails,
    streams: &'a [StreamInfo],
    format: ContainerFormat,
    dir: &Path,
) -> Option<DownloadPlan<'a>> {
    let stream = select_progressive(streams, format)?;
    let target = dir.join(output_file_name(details, stream));
    Some(DownloadPlan { stream, target })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream(id: &str, ext: &str, progressive: bool, height: Option<u32>) -> StreamInfo {
        StreamInfo {
            format_id: id.to_string(),
            url: format!("https://media.example/{id}"),
            ext: ext.to_string(),
            progressive,
            height,
            ..StreamInfo::default()
        }
    }

    #[test]
    fn picks_highest_progressive_of_requested_extension() {
        let streams = vec![
            stream("18", "mp4", true, Some(360)),
            stream("137", "mp4", false, Some(1080)),
            stream("22", "mp4", true, Some(720)),
            stream("43", "webm", true, Some(1080)),
        ];
        let best = select_progressive(&streams, ContainerFormat::Mp4).unwrap();
        assert_eq!(best.format_id, "22");

        let webm = select_progressive(&streams, ContainerFormat::Webm).unwrap();
        assert_eq!(webm.format_id, "43");
    }

    #[test]
    fn adaptive_only_yields_nothing() {
        let streams = vec![
            stream("137", "mp4", false, Some(1080)),
            stream("140", "m4a", false, None),
        ];
        assert!(select_progressive(&streams, ContainerFormat::Mp4).is_none());
    }

    #[test]
    fn ties_keep_extractor_order_and_unknown_height_is_skipped() {
        let streams = vec![
            stream("a", "mp4", true, None),
            stream("b", "mp4", true, Some(360)),
            stream("c", "mp4", true, Some(360)),
        ];
        let best = select_progressive(&streams, ContainerFormat::Mp4).unwrap();
        assert_eq!(best.format_id, "b");
    }

    #[test]
    fn plan_targets_sanitized_title_inside_directory() {
        let details = VideoDetails {
            title: "Live: a/b? test".to_string(),
            ..VideoDetails::default()
        };
        let streams = vec![stream("18", "mp4", true, Some(360))];
        let plan = prepare_plan(&details, &streams, ContainerFormat::Mp4, Path::new("out")).unwrap();
        assert_eq!(plan.target, Path::new("out").join("Live_ a_b_ test.mp4"));
        assert_eq!(plan.stream.format_id, "18");
    }
}
