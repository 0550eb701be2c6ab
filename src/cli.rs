use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use daycare_waitlist::api::{SeedData, WaitlistApi};
use daycare_waitlist::config::ConfigManager;
use daycare_waitlist::db::get_default_db_path;
use daycare_waitlist::{AllocationOptions, RemovalReason};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "daycare-waitlist",
    about = "市立托育机构候补名单: 优先级评分与名额分配",
    version
)]
struct Cli {
    /// 数据库文件路径 (默认读取 DAYCARE_WAITLIST_DB_PATH 或用户数据目录)
    #[arg(long, global = true)]
    db: Option<String>,
    /// 操作人 (写入操作日志)
    #[arg(long, global = true, default_value = "cli")]
    actor: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 初始化数据库 schema
    InitDb,
    /// 从 JSON 文件导入机构、班组、评分标准与儿童
    Seed { file: String },
    /// 计算儿童当前分数 (不落库)
    Score { child_id: String },
    /// 已登记儿童进入候补
    Enqueue { child_id: String },
    /// 移出候补
    Remove { child_id: String },
    /// 暂停排队
    Pause { child_id: String },
    /// 恢复排队
    Resume { child_id: String },
    /// 儿童退出
    Withdraw { child_id: String },
    /// 重算分数并重排
    Recompute { child_id: String },
    /// 全量重排
    Reorder,
    /// 执行一轮名额匹配
    Allocate(AllocateArgs),
    /// 列出排队中的候补名单
    List,
    /// 查询机构对指定年龄的可用名额
    Capacity { daycare_id: String, age_years: u32 },
    /// 操作历史 (指定儿童, 或最近的操作)
    History {
        child_id: Option<String>,
        /// 未指定儿童时返回的条数
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// 配置管理
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Args, Debug)]
struct AllocateArgs {
    /// 本轮最多分配数
    #[arg(long)]
    limit: Option<usize>,
    /// 匹配前重算全部分数
    #[arg(long, conflicts_with = "no_recalculate")]
    recalculate: bool,
    /// 匹配前不重算 (覆盖配置默认值)
    #[arg(long)]
    no_recalculate: bool,
    /// 仅考虑这些机构 (可重复)
    #[arg(long = "daycare")]
    daycares: Vec<String>,
}

impl AllocateArgs {
    fn into_options(self) -> AllocationOptions {
        let recalculate_scores = match (self.recalculate, self.no_recalculate) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        AllocationOptions {
            limit: self.limit,
            recalculate_scores,
            restrict_to_daycares: (!self.daycares.is_empty()).then_some(self.daycares),
        }
    }
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// 显示全部配置
    Show,
    /// 写入配置值
    Set { key: String, value: String },
}

pub(crate) fn run() -> Result<()> {
    let cli = Cli::parse();
    let db_path = cli.db.unwrap_or_else(get_default_db_path);
    let actor = cli.actor.as_str();

    if let Some(parent) = std::path::Path::new(&db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("无法创建数据库目录: {}", parent.display()))?;
        }
    }

    tracing::debug!("使用数据库: {}", db_path);
    let api = WaitlistApi::open(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;

    match cli.command {
        Command::InitDb => {
            tracing::info!("数据库已就绪: {}", db_path);
            print_json(&serde_json::json!({ "db_path": db_path, "version": daycare_waitlist::DB_VERSION }))
        }
        Command::Seed { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("无法读取种子文件: {}", file))?;
            let seed: SeedData =
                serde_json::from_str(&raw).with_context(|| format!("种子文件格式错误: {}", file))?;
            print_json(&api.import_seed(&seed, actor)?)
        }
        Command::Score { child_id } => print_json(&api.compute_score(&child_id)?),
        Command::Enqueue { child_id } => print_json(&api.enqueue(&child_id, actor)?),
        Command::Remove { child_id } => print_json(&api.remove_from_waitlist(
            &child_id,
            RemovalReason::Removed,
            actor,
        )?),
        Command::Pause { child_id } => print_json(&api.pause(&child_id, actor)?),
        Command::Resume { child_id } => print_json(&api.resume(&child_id, actor)?),
        Command::Withdraw { child_id } => {
            api.withdraw(&child_id, actor)?;
            print_json(&api.get_child(&child_id)?)
        }
        Command::Recompute { child_id } => print_json(&api.recompute_score(&child_id, actor)?),
        Command::Reorder => print_json(&api.reorder_waitlist(actor)?),
        Command::Allocate(args) => {
            print_json(&api.run_allocation(&args.into_options(), actor)?)
        }
        Command::List => print_json(&api.list_waitlist()?),
        Command::Capacity {
            daycare_id,
            age_years,
        } => print_json(&serde_json::json!({
            "daycare_id": daycare_id,
            "age_years": age_years,
            "available": api.available_capacity(&daycare_id, age_years)?,
            "groups": api.group_availability(&daycare_id, age_years)?,
        })),
        Command::History { child_id, limit } => match child_id {
            Some(child_id) => print_json(&api.child_history(&child_id)?),
            None => print_json(&api.recent_actions(limit)?),
        },
        Command::Config { command } => run_config(api.config(), command),
    }
}

fn run_config(config: &ConfigManager, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let snapshot: serde_json::Value = serde_json::from_str(&config.get_config_snapshot()?)?;
            print_json(&snapshot)
        }
        ConfigCommand::Set { key, value } => {
            config.set_config_value(&key, &value)?;
            tracing::info!("配置已更新: {}={}", key, value);
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
