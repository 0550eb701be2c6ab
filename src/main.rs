// ==========================================
// 托育候补名单系统 - 命令行入口
// ==========================================
// 日志写 stderr, 命令结果以 JSON 写 stdout
// ==========================================

mod cli;

fn main() {
    daycare_waitlist::logging::init();

    if let Err(e) = cli::run() {
        tracing::error!("命令执行失败: {:#}", e);
        eprintln!("错误: {:#}", e);
        std::process::exit(1);
    }
}
