/// 测试用 RTSP 服务器
///
/// 运行后在标准输入输入: pause / unpause / exit
use anyhow::Context;
use clap::Parser;
use log::{info, warn};
use rtsp_viewer::cli::init_logger;
use rtsp_viewer::server::{describe, Command, ServerOptions, TestPattern, TestServer};
use std::io::BufRead;
use std::thread;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug)]
#[command(author, version, about = "测试用RTSP服务器 (videotestsrc)", long_about = None)]
struct Args {
    /// 监听端口
    #[arg(short, long, default_value_t = 8554)]
    port: u16,

    /// 挂载路径
    #[arg(short, long, default_value = "/test")]
    mount: String,

    /// 测试图案 (smpte/snow/ball/...)
    #[arg(long, default_value = "ball")]
    pattern: TestPattern,
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let args = Args::parse();

    let server = TestServer::new(ServerOptions {
        port: args.port,
        mount: args.mount,
        pattern: args.pattern,
    })
    .context("创建RTSP服务器失败")?;

    let control = server.control();
    let on_signal = control.clone();
    ctrlc::set_handler(move || {
        info!("🛑 收到 Ctrl+C, 正在关闭...");
        on_signal.quit();
    })
    .context("设置 Ctrl+C 处理失败")?;

    thread::Builder::new()
        .name("stdin-commands".into())
        .spawn(move || {
            info!("⌨️ 输入命令: pause / unpause / exit");
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if line.trim().is_empty() {
                    continue;
                }
                match line.parse::<Command>() {
                    Ok(Command::Exit) => {
                        info!("👋 退出...");
                        control.quit();
                        break;
                    }
                    Ok(command) => {
                        if let Some(outcome) = control.handle(command) {
                            info!("{}", describe(outcome));
                        }
                    }
                    Err(unknown) => warn!("⚠️ 未知命令: {}", unknown),
                }
            }
        })
        .context("启动输入线程失败")?;

    server.run()?;
    Ok(())
}
