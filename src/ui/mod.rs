//! 交互层入口：启动横幅与下载后的问答。

pub mod prompt;
pub mod splash;
