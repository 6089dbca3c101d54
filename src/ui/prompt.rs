//! 下载完成后的交互：询问是否打印视频详细信息。

use std::io::{BufRead, Write};

use anyhow::{Context, Result};

use crate::download::models::VideoDetails;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailsChoice {
    Yes,
    No,
    Other,
}

pub fn parse_choice(input: &str) -> DetailsChoice {
    let text = input.trim();
    if text.eq_ignore_ascii_case("y") || text.eq_ignore_ascii_case("yes") {
        DetailsChoice::Yes
    } else if text.eq_ignore_ascii_case("n") || text.eq_ignore_ascii_case("no") {
        DetailsChoice::No
    } else {
        DetailsChoice::Other
    }
}

fn format_length(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02} ({seconds}s)")
    } else {
        format!("{m}:{s:02} ({seconds}s)")
    }
}

pub fn format_details(details: &VideoDetails) -> String {
    let rating = details
        .rating
        .map(|r| format!("{r:.2}"))
        .unwrap_or_else(|| "N/A".to_string());
    let views = details
        .views
        .map(|v| v.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    format!(
        "\tTitle: {}\n\tVideo Length: {}\n\tRating: {}\n\tViews: {}\n\tAuthor: {}\n",
        details.title,
        format_length(details.length),
        rating,
        views,
        details.author
    )
}

pub fn read_line<R: BufRead, W: Write>(input: &mut R, out: &mut W, prompt: &str) -> Result<String> {
    write!(out, "{prompt}").context("write prompt")?;
    out.flush().ok();
    let mut line = String::new();
    input.read_line(&mut line).context("read answer")?;
    Ok(line)
}

pub fn offer_details<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    details: &VideoDetails,
) -> Result<DetailsChoice> {
    let answer = read_line(input, out, "Do you want extra info on the video? (y/n): ")?;
    let choice = parse_choice(&answer);
    match choice {
        DetailsChoice::Yes => {
            writeln!(out)?;
            writeln!(out, "{}", format_details(details))?;
        }
        DetailsChoice::No => writeln!(out, "Extra data omitted.")?,
        DetailsChoice::Other => {
            writeln!(out, "You didn't pick yes (or no), so the program will exit.")?
        }
    }
    Ok(choice)
}
