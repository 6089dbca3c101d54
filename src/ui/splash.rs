//! 启动横幅与结束语。

use crossterm::style::Stylize;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHOR: &str = env!("CARGO_PKG_AUTHORS");

// 每行三段：Y（白）、T（红）、Downloader（绿）
const BANNER: [(&str, &str, &str); 8] = [
    (r" /$$     /$$", r" /$$$$$$$$ ", r"  /$$$$$$$                                    /$$                           /$$"),
    (r"|  $$   /$$/", r"|__  $$__/ ", r" | $$__  $$                                  | $$                          | $$"),
    (r" \  $$ /$$/ ", r"   | $$    ", r" | $$  \ $$  /$$$$$$  /$$  /$$  /$$ /$$$$$$$ | $$  /$$$$$$   /$$$$$$   /$$$$$$$  /$$$$$$   /$$$$$$"),
    (r"  \  $$$$/  ", r"   | $$    ", r" | $$  | $$ /$$__  $$| $$ | $$ | $$| $$__  $$| $$ /$$__  $$ |____  $$ /$$__  $$ /$$__  $$ /$$__  $$"),
    (r"   \  $$/   ", r"   | $$    ", r" | $$  | $$| $$  \ $$| $$ | $$ | $$| $$  \ $$| $$| $$  \ $$  /$$$$$$$| $$  | $$| $$$$$$$$| $$  \__/"),
    (r"    | $$    ", r"   | $$    ", r" | $$  | $$| $$  | $$| $$ | $$ | $$| $$  | $$| $$| $$  | $$ /$$__  $$| $$  | $$| $$_____/| $$"),
    (r"    | $$    ", r"   | $$    ", r" | $$$$$$$/|  $$$$$$/|  $$$$$/$$$$/| $$  | $$| $$|  $$$$$$/|  $$$$$$$|  $$$$$$$|  $$$$$$$| $$"),
    (r"    |__/    ", r"   |__/    ", r" |_______/  \______/  \_____/\___/ |__/  |__/|__/ \______/  \_______/ \_______/ \_______/|__/"),
];

pub fn splash() -> String {
    let mut text = String::from("\n");
    for (y, t, rest) in BANNER {
        text.push_str(&format!("    {}{}{}\n", y.white(), t.red(), rest.green()));
    }
    text.push_str(&format!(
        "\n        {} {} {}\n",
        "By".green(),
        AUTHOR.dark_yellow(),
        format!("(v{VERSION})").blue()
    ));
    text
}

pub fn print_farewell() {
    println!(
        "{} {}{} {}",
        "Thanks for using".green(),
        "You".white(),
        "Tube".red(),
        "Downloader.".green()
    );
}
