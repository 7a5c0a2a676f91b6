//! 播放器配置 - 通过JSON文件调整参数
//! Viewer configuration, optionally loaded from a JSON file

use crate::error::{Result, ViewerError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// RTSP 传输方式
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtspTransport {
    Tcp,
    Udp,
}

impl RtspTransport {
    pub fn as_str(&self) -> &'static str {
        match self {
            RtspTransport::Tcp => "tcp",
            RtspTransport::Udp => "udp",
        }
    }
}

/// 读包超时默认值; 不允许无限等待, 否则停止解码线程会一直阻塞
pub const DEFAULT_SOCKET_TIMEOUT_MS: u64 = 5_000;

/// 播放器参数配置
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    // === 拉流参数 ===
    pub rtsp_transport: RtspTransport,
    pub socket_timeout_ms: u64, // 0 表示使用默认超时

    // === 窗口参数 ===
    pub window_width: u32,
    pub window_height: u32,
    pub overlay_text: Option<String>,
    pub show_status: bool,

    // === 截图 ===
    pub snapshot_dir: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            rtsp_transport: RtspTransport::Tcp,
            socket_timeout_ms: DEFAULT_SOCKET_TIMEOUT_MS,
            window_width: 640,
            window_height: 480,
            overlay_text: None,
            show_status: false,
            snapshot_dir: String::from("."),
        }
    }
}

impl ViewerConfig {
    /// 从JSON文件加载配置
    ///
    /// 文件不存在时写出默认配置; 解析失败时使用默认值。
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path.display());
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ {}", e);
                }
                config
            }
        }
    }

    /// 读取配置, 解析失败时返回错误而不是默认值
    pub fn try_load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| ViewerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ViewerError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self).map_err(|source| ViewerError::ConfigJson {
            path: path.to_path_buf(),
            source,
        })?;
        fs::write(path, json).map_err(|source| ViewerError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        info!("💾 配置已保存到 {}", path.display());
        Ok(())
    }

    /// 实际使用的读包超时 (毫秒), 0 换成默认值
    pub fn socket_timeout_ms(&self) -> u64 {
        if self.socket_timeout_ms == 0 {
            DEFAULT_SOCKET_TIMEOUT_MS
        } else {
            self.socket_timeout_ms
        }
    }

    /// FFmpeg 输入参数 (rtsp_transport / timeout)
    ///
    /// `timeout` 单位为微秒, 总是带上。
    pub fn input_options(&self) -> Vec<(&'static str, String)> {
        vec![
            ("rtsp_transport", self.rtsp_transport.as_str().to_string()),
            ("timeout", (self.socket_timeout_ms() * 1000).to_string()),
        ]
    }

    /// 打印当前配置
    pub fn log_summary(&self) {
        info!("🎛️  当前配置:");
        info!("  传输方式: {}", self.rtsp_transport.as_str());
        info!("  超时: {}ms", self.socket_timeout_ms());
        info!("  窗口: {}x{}", self.window_width, self.window_height);
        if let Some(text) = &self.overlay_text {
            info!("  叠加文字: {}", text);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");

        let config = ViewerConfig::load(&path);
        assert_eq!(config, ViewerConfig::default());
        assert!(path.exists());
        assert_eq!(ViewerConfig::try_load(&path).unwrap(), config);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, r#"{ "rtsp_transport": "udp", "window_width": 1280 }"#).unwrap();

        let config = ViewerConfig::load(&path);
        assert_eq!(config.rtsp_transport, RtspTransport::Udp);
        assert_eq!(config.window_width, 1280);
        assert_eq!(config.window_height, 480);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("viewer.json");
        fs::write(&path, "{ not json").unwrap();

        assert_eq!(ViewerConfig::load(&path), ViewerConfig::default());
        assert!(matches!(
            ViewerConfig::try_load(&path),
            Err(ViewerError::ConfigJson { .. })
        ));
    }

    #[test]
    fn input_options_convert_timeout_to_microseconds() {
        let config = ViewerConfig {
            socket_timeout_ms: 3_000,
            ..Default::default()
        };
        let opts = config.input_options();
        assert_eq!(opts[0], ("rtsp_transport", "tcp".to_string()));
        assert_eq!(opts[1], ("timeout", "3000000".to_string()));

        // 0 不能变成无限等待
        let no_timeout = ViewerConfig {
            socket_timeout_ms: 0,
            ..Default::default()
        };
        assert_eq!(no_timeout.socket_timeout_ms(), DEFAULT_SOCKET_TIMEOUT_MS);
        assert_eq!(
            no_timeout.input_options()[1],
            ("timeout", "5000000".to_string())
        );
    }
}
