//! tube-downloader：命令行下载 YouTube 渐进式（音视频合一）流。
//!
//! 代码结构（读代码入口）：
//! - `base_system`：配置（config.jsonc）/日志等基础设施
//! - `cli`：参数定义、解析与校验
//! - `download`：选流、进度与下载流程编排
//! - `third_party`：外部解析后端（yt-dlp）与 HTTP 传输
//! - `ui`：启动横幅与下载后的问答

use std::ffi::OsString;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use tracing::{error, info, warn};

mod base_system;
mod cli;
mod download;
mod third_party;
mod ui;

use base_system::context::Config;
use base_system::logging::{LogOptions, LogSystem};
use download::downloader::run_download;
use download::models::DownloadRequest;
use third_party::media_fetch::{HttpMediaSource, PartialFiles};
use third_party::ytdlp::YtDlpExtractor;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const CORRUPTED_MESSAGE: &str = "I'm not sure how you got to this point, but there seems to be an issue with the program itself. Make sure it isn't corrupted.";

fn main() -> ExitCode {
    let log = match LogSystem::init(LogOptions::from_env()) {
        Ok(log) => Some(log),
        Err(err) => {
            eprintln!("failed to initialize logging: {err}");
            None
        }
    };

    let partials = PartialFiles::default();
    if let Some(log) = &log {
        let partials = partials.clone();
        log.add_exit_hook(move || partials.remove_all());
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| run(&partials)));
    finish(result, &mut io::stdout())
}

/// 兜底：`run` 返回的错误与 panic 都只给用户一条通用提示，细节写进日志。
fn finish<W: Write>(result: std::thread::Result<Result<ExitCode>>, out: &mut W) -> ExitCode {
    let detail = match result {
        Ok(Ok(code)) => return code,
        Ok(Err(err)) => format!("unexpected error: {err:#}"),
        Err(payload) => format!("panic: {}", panic_payload_to_string(payload)),
    };
    error!("{detail}");
    let _ = writeln!(out, "{CORRUPTED_MESSAGE}");
    ExitCode::FAILURE
}

/// 下载开始前的准备结果。
enum Startup {
    Ready(Config, DownloadRequest),
    /// `--help` / `--version` 已输出
    Finished,
    Failed,
}

/// 读取配置 → 检查参数 → 横幅 → 解析 → 校验。
///
/// 配置版本不匹配时在解析参数之前就退出。
fn prepare<W: Write>(
    config_path: Option<&Path>,
    args: Vec<OsString>,
    out: &mut W,
) -> Result<Startup> {
    let config = match Config::load(config_path, VERSION) {
        Ok(config) => config,
        Err(err) => {
            warn!(target: "startup", "配置加载失败: {err:?}");
            writeln!(out, "{err}")?;
            return Ok(Startup::Failed);
        }
    };

    if args.len() <= 1 {
        writeln!(out, "Arguments required. see '--help'.")?;
        return Ok(Startup::Failed);
    }

    writeln!(out, "{}", ui::splash::splash())?;

    let parsed = match cli::parse_from(args, &config) {
        Ok(parsed) => parsed,
        Err(err) if err.kind() == ErrorKind::DisplayVersion => {
            writeln!(out, "{}", cli::VERSION_TAG)?;
            return Ok(Startup::Finished);
        }
        Err(err) => {
            out.flush()?;
            err.print().context("print usage")?;
            return Ok(if err.use_stderr() {
                Startup::Failed
            } else {
                Startup::Finished
            });
        }
    };

    match cli::validate_args(parsed) {
        Ok(request) => Ok(Startup::Ready(config, request)),
        Err(err) => {
            warn!(target: "startup", "参数校验失败: {err:?}");
            writeln!(out, "{err}")?;
            Ok(Startup::Failed)
        }
    }
}

fn run(partials: &PartialFiles) -> Result<ExitCode> {
    info!(target: "startup", "当前版本: v{}", VERSION);
    let mut stdout = io::stdout();

    let (config, request) = match prepare(None, std::env::args_os().collect(), &mut stdout)? {
        Startup::Ready(config, request) => (config, request),
        Startup::Finished => return Ok(ExitCode::SUCCESS),
        Startup::Failed => return Ok(ExitCode::FAILURE),
    };

    let extractor = YtDlpExtractor::from_config(&config);
    let source = HttpMediaSource::new(Duration::from_secs(config.request_timeout.max(1)))
        .context("init http client")?;

    let outcome = match run_download(&request, &extractor, &source, partials, &mut stdout) {
        Ok(outcome) => outcome,
        Err(err) => {
            println!("{err}");
            return Ok(ExitCode::FAILURE);
        }
    };

    info!(
        target: "download",
        path = %outcome.file_path.display(),
        skipped = outcome.skipped,
        "下载流程结束"
    );

    let stdin = io::stdin();
    ui::prompt::offer_details(&mut stdin.lock(), &mut stdout, &outcome.details)?;
    ui::splash::print_farewell();
    Ok(ExitCode::SUCCESS)
}

fn panic_payload_to_string(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic payload".to_string()
}
