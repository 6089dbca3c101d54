//! 命令行参数定义、解析与校验。
//!
//! `--path` / `--format` 的默认值来自配置文件，在解析前注入到参数定义里，
//! 因此 `--help` 中看到的默认值就是当前配置。

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, CommandFactory, FromArgMatches, Parser};
use thiserror::Error;

use crate::base_system::context::Config;
use crate::download::models::{ContainerFormat, DownloadRequest};

pub const VERSION_TAG: &str = concat!("v", env!("CARGO_PKG_VERSION"));
const EPILOG: &str = concat!("Youtube Downloader v", env!("CARGO_PKG_VERSION"));

const REQUIRED_HEADING: &str = "Required arguments";
const OPTIONAL_HEADING: &str = "Optional arguments";

#[derive(Debug, Parser)]
#[command(name = "tube-downloader")]
#[command(version = VERSION_TAG, after_help = EPILOG)]
#[command(disable_help_flag = true, disable_version_flag = true)]
#[command(max_term_width = 200)]
pub struct Cli {
    /// Specify the URL of the video.
    #[arg(short = 'u', long = "url", value_name = "video url", help_heading = REQUIRED_HEADING)]
    pub url: String,

    /// Specify the path to download the video to.
    #[arg(short = 'p', long = "path", value_name = "download path", help_heading = OPTIONAL_HEADING)]
    pub path: Option<PathBuf>,

    /// Specify the format of the downloaded video.
    #[arg(
        short = 'f',
        long = "format",
        value_name = "mp4|webm",
        value_enum,
        hide_possible_values = true,
        help_heading = OPTIONAL_HEADING
    )]
    pub format: Option<ContainerFormat>,

    /// Show the program version.
    #[arg(short = 'v', long = "version", action = ArgAction::Version, help_heading = OPTIONAL_HEADING)]
    version: Option<bool>,

    /// Show this help message.
    #[arg(short = 'h', long = "help", action = ArgAction::Help, help_heading = OPTIONAL_HEADING)]
    help: Option<bool>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ArgsError {
    #[error(
        "The download path provided is invalid. ({})\n\t- If you provided a path, make sure it exists.\n\t- Otherwise, check the config.jsonc 'defaultDownloadPath' option.",
        .path.display()
    )]
    InvalidPath { path: PathBuf },
    #[error("Invalid arguments passed. see '--help'.")]
    InvalidArguments,
}

/// 以配置中的默认值构建解析器并解析参数（`args` 含程序名）。
pub fn parse_from<I, T>(args: I, config: &Config) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let command = Cli::command()
        .mut_arg("path", |a| a.default_value(config.default_download_dir().into_os_string()))
        .mut_arg("format", |a| a.default_value(config.default_format.as_str()));
    let matches = command.try_get_matches_from(args)?;
    Cli::from_arg_matches(&matches)
}

/// 校验下载目录存在（不会自动创建）以及格式属于允许的取值。
pub fn validate_args(cli: Cli) -> Result<DownloadRequest, ArgsError> {
    let (Some(path), Some(format)) = (cli.path, cli.format) else {
        return Err(ArgsError::InvalidArguments);
    };
    let url = cli.url.trim().to_string();
    if url.is_empty() || !ContainerFormat::ALL.contains(&format) {
        return Err(ArgsError::InvalidArguments);
    }
    if !path.is_dir() {
        return Err(ArgsError::InvalidPath { path });
    }
    Ok(DownloadRequest { url, path, format })
}
