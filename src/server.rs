//! 测试用 RTSP 服务器
//!
//! videotestsrc → x264enc → rtph264pay, 所有客户端共享同一条管线。
//! 标准输入命令: pause / unpause (resume) / exit

use crate::decode::gst::ensure_initialized;
use crate::error::{Result, ViewerError};
use gstreamer as gst;
use gstreamer::glib::MainLoop;
use gstreamer::prelude::*;
use gstreamer_rtsp_server::prelude::*;
use gstreamer_rtsp_server::{RTSPMediaFactory, RTSPServer};
use log::{info, warn};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard};

/// videotestsrc 支持的图案
pub const PATTERNS: [&str; 25] = [
    "smpte",
    "snow",
    "black",
    "white",
    "red",
    "green",
    "blue",
    "checkers-1",
    "checkers-2",
    "checkers-4",
    "checkers-8",
    "circular",
    "zone-plate",
    "gamut",
    "chroma-zone-plate",
    "solid-color",
    "ball",
    "smpte100",
    "bar",
    "pinwheel",
    "blinking",
    "moving-bar",
    "pluge",
    "colors",
    "test-pattern",
];

/// 测试源元素名 (launch 字符串里没有命名时 GStreamer 的默认名)
const SOURCE_ELEMENT: &str = "videotestsrc0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TestPattern(&'static str);

impl TestPattern {
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Default for TestPattern {
    fn default() -> Self {
        TestPattern("ball")
    }
}

impl FromStr for TestPattern {
    type Err = ViewerError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        PATTERNS
            .iter()
            .find(|p| **p == wanted)
            .map(|p| TestPattern(*p))
            .ok_or_else(|| ViewerError::UnknownPattern(s.to_string()))
    }
}

impl fmt::Display for TestPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

pub fn launch_string(pattern: TestPattern) -> String {
    format!(
        "( videotestsrc pattern={} ! x264enc tune=zerolatency ! rtph264pay name=pay0 pt=96 )",
        pattern
    )
}

/// 标准输入命令
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Exit,
}

impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s.trim().to_lowercase().as_str() {
            "pause" => Ok(Command::Pause),
            "unpause" | "resume" => Ok(Command::Resume),
            "exit" | "quit" => Ok(Command::Exit),
            other => Err(other.to_string()),
        }
    }
}

/// 可以被阻塞的数据源
pub trait SourceGate {
    type Probe;

    fn block(&self) -> Option<Self::Probe>;
    fn unblock(&self, probe: Self::Probe);
}

impl SourceGate for gst::Pad {
    type Probe = gst::PadProbeId;

    fn block(&self) -> Option<gst::PadProbeId> {
        self.add_probe(gst::PadProbeType::BLOCK, |_, _| gst::PadProbeReturn::Ok)
    }

    fn unblock(&self, probe: gst::PadProbeId) {
        self.remove_probe(probe);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PauseOutcome {
    Paused,
    AlreadyPaused,
    Resumed,
    NotPaused,
    /// 还没有客户端连接, 管线尚未创建
    NotReady,
}

/// 暂停/恢复状态, 两个方向都是幂等的
pub struct PauseControl<G: SourceGate> {
    gate: Option<G>,
    probe: Option<G::Probe>,
}

impl<G: SourceGate> Default for PauseControl<G> {
    fn default() -> Self {
        Self {
            gate: None,
            probe: None,
        }
    }
}

impl<G: SourceGate> PauseControl<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新的管线准备好了, 旧探针随旧管线一起失效
    pub fn attach(&mut self, gate: G) {
        self.gate = Some(gate);
        self.probe = None;
    }

    pub fn is_paused(&self) -> bool {
        self.probe.is_some()
    }

    pub fn pause(&mut self) -> PauseOutcome {
        let Some(gate) = &self.gate else {
            return PauseOutcome::NotReady;
        };
        if self.probe.is_some() {
            return PauseOutcome::AlreadyPaused;
        }
        match gate.block() {
            Some(probe) => {
                self.probe = Some(probe);
                PauseOutcome::Paused
            }
            None => PauseOutcome::NotReady,
        }
    }

    pub fn resume(&mut self) -> PauseOutcome {
        let Some(gate) = &self.gate else {
            return PauseOutcome::NotReady;
        };
        match self.probe.take() {
            Some(probe) => {
                gate.unblock(probe);
                PauseOutcome::Resumed
            }
            None => PauseOutcome::NotPaused,
        }
    }
}

type SharedControl = Arc<Mutex<PauseControl<gst::Pad>>>;

fn lock(control: &SharedControl) -> MutexGuard<'_, PauseControl<gst::Pad>> {
    control.lock().unwrap_or_else(|e| e.into_inner())
}

/// 服务器参数
#[derive(Clone, Debug)]
pub struct ServerOptions {
    pub port: u16,
    pub mount: String,
    pub pattern: TestPattern,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            port: 8554,
            mount: String::from("/test"),
            pattern: TestPattern::default(),
        }
    }
}

pub struct TestServer {
    options: ServerOptions,
    server: RTSPServer,
    main_loop: MainLoop,
    control: SharedControl,
}

impl TestServer {
    pub fn new(options: ServerOptions) -> Result<Self> {
        ensure_initialized()?;

        let server = RTSPServer::new();
        server.set_service(&options.port.to_string());

        let mounts = server
            .mount_points()
            .ok_or_else(|| ViewerError::Server(String::from("没有挂载点")))?;
        let factory = RTSPMediaFactory::new();
        factory.set_launch(&launch_string(options.pattern));
        factory.set_shared(true);

        let control: SharedControl = Arc::new(Mutex::new(PauseControl::new()));
        let configured = control.clone();
        factory.connect_media_configure(move |_, media| {
            let control = configured.clone();
            media.connect_prepared(move |media| {
                let Ok(bin) = media.element().downcast::<gst::Bin>() else {
                    return;
                };
                let Some(pad) = bin
                    .by_name(SOURCE_ELEMENT)
                    .and_then(|src| src.static_pad("src"))
                else {
                    warn!("⚠️ 管线里找不到 {}", SOURCE_ELEMENT);
                    return;
                };
                info!("🔗 测试源已就绪");
                lock(&control).attach(pad);
            });
        });
        mounts.add_factory(&options.mount, factory);

        Ok(Self {
            options,
            server,
            main_loop: MainLoop::new(None, false),
            control,
        })
    }

    pub fn url(&self) -> String {
        format!("rtsp://0.0.0.0:{}{}", self.options.port, self.options.mount)
    }

    pub fn control(&self) -> ServerControl {
        ServerControl {
            control: self.control.clone(),
            main_loop: self.main_loop.clone(),
        }
    }

    /// 阻塞运行, 直到主循环退出
    pub fn run(&self) -> Result<()> {
        let _source = self.server.attach(None)?;
        info!("📡 RTSP 服务已启动: {} (图案 {})", self.url(), self.options.pattern);
        self.main_loop.run();
        info!("🛑 RTSP 服务已停止");
        Ok(())
    }
}

/// 可发送到输入线程的控制句柄
#[derive(Clone)]
pub struct ServerControl {
    control: SharedControl,
    main_loop: MainLoop,
}

impl ServerControl {
    pub fn handle(&self, command: Command) -> Option<PauseOutcome> {
        match command {
            Command::Pause => Some(lock(&self.control).pause()),
            Command::Resume => Some(lock(&self.control).resume()),
            Command::Exit => {
                self.main_loop.quit();
                None
            }
        }
    }

    pub fn quit(&self) {
        self.main_loop.quit();
    }
}

pub fn describe(outcome: PauseOutcome) -> &'static str {
    match outcome {
        PauseOutcome::Paused => "⏸️ 已暂停",
        PauseOutcome::AlreadyPaused => "已经是暂停状态",
        PauseOutcome::Resumed => "▶️ 已恢复",
        PauseOutcome::NotPaused => "当前没有暂停",
        PauseOutcome::NotReady => "还没有客户端连接",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeGate {
        next: Cell<u32>,
        blocked: Cell<u32>,
    }

    impl SourceGate for &FakeGate {
        type Probe = u32;

        fn block(&self) -> Option<u32> {
            let id = self.next.get() + 1;
            self.next.set(id);
            self.blocked.set(self.blocked.get() + 1);
            Some(id)
        }

        fn unblock(&self, _probe: u32) {
            self.blocked.set(self.blocked.get() - 1);
        }
    }

    #[test]
    fn pause_and_resume_are_idempotent() {
        let gate = FakeGate::default();
        let mut control = PauseControl::new();
        assert_eq!(control.pause(), PauseOutcome::NotReady);

        control.attach(&gate);
        assert_eq!(control.resume(), PauseOutcome::NotPaused);
        assert_eq!(control.pause(), PauseOutcome::Paused);
        assert_eq!(control.pause(), PauseOutcome::AlreadyPaused);
        assert_eq!(gate.blocked.get(), 1);
        assert!(control.is_paused());

        assert_eq!(control.resume(), PauseOutcome::Resumed);
        assert_eq!(control.resume(), PauseOutcome::NotPaused);
        assert_eq!(gate.blocked.get(), 0);
    }

    #[test]
    fn commands_parse_with_aliases() {
        assert_eq!("pause".parse::<Command>(), Ok(Command::Pause));
        assert_eq!(" UNPAUSE\n".parse::<Command>(), Ok(Command::Resume));
        assert_eq!("resume".parse::<Command>(), Ok(Command::Resume));
        assert_eq!("exit".parse::<Command>(), Ok(Command::Exit));
        assert_eq!("stop".parse::<Command>(), Err(String::from("stop")));
    }

    #[test]
    fn patterns_are_validated() {
        assert_eq!(TestPattern::default().as_str(), "ball");
        assert_eq!("SMPTE".parse::<TestPattern>().unwrap().as_str(), "smpte");
        assert!("plaid".parse::<TestPattern>().is_err());
        assert_eq!(
            launch_string(TestPattern::default()),
            "( videotestsrc pattern=ball ! x264enc tune=zerolatency ! rtph264pay name=pay0 pt=96 )"
        );
    }
}
