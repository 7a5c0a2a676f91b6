/// 各个播放程序共用的命令行参数
use crate::config::ViewerConfig;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// 窗口宽度 (覆盖配置文件)
    #[arg(long)]
    pub width: Option<u32>,

    /// 窗口高度 (覆盖配置文件)
    #[arg(long)]
    pub height: Option<u32>,

    /// JSON配置文件
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// 窗口标题
    #[arg(short, long)]
    pub title: Option<String>,
}

impl WindowArgs {
    /// 读取配置文件, 再用命令行参数覆盖
    pub fn resolve(&self) -> ViewerConfig {
        let mut config = match &self.config {
            Some(path) => ViewerConfig::load(path),
            None => ViewerConfig::default(),
        };
        if let Some(width) = self.width {
            config.window_width = width;
        }
        if let Some(height) = self.height {
            config.window_height = height;
        }
        config
    }

    pub fn title_or(&self, default: &str) -> String {
        self.title.clone().unwrap_or_else(|| default.to_string())
    }
}

/// 日志默认级别 info, 可用 RUST_LOG 覆盖
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        std::fs::write(&path, r#"{"window_width": 1280, "window_height": 720}"#).unwrap();

        let args = WindowArgs {
            width: Some(320),
            height: None,
            config: Some(path),
            title: None,
        };
        let config = args.resolve();
        assert_eq!((config.window_width, config.window_height), (320, 720));
        assert_eq!(args.title_or("RTSP"), "RTSP");
    }
}
