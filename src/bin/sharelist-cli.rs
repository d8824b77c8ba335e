//! 共享清单 CLI
//!
//! 非交互式 CLI，直接对本地 SQLite 数据库执行注册、建清单、加条目、邀请与完成等操作，
//! 每条命令把 `ApiResponse` 以 JSON 形式输出到 stdout。`demo` 子命令演示完整流程。

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::json;
use sharelist_core_rust::hub::list::{FinishOptions, ListItem, PopulatedList};
use sharelist_core_rust::hub::user::RegisteredUser;
use sharelist_core_rust::{
    Actor, ApiResponse, InviteTarget, ListResult, ServiceConfig, SharedListService,
};
use std::path::PathBuf;
use tracing::{info, warn};

/// 共享清单 CLI
#[derive(Parser, Debug)]
#[command(name = "sharelist-cli")]
#[command(about = "共享清单 CLI - 直接操作本地数据库", long_about = None)]
struct Args {
    /// SQLite 数据库 URL
    #[arg(long, default_value = "sqlite://sharelist.db?mode=rwc")]
    db: String,

    /// token 签名密钥
    #[arg(long, default_value = "sharelist-dev-key")]
    token_key: String,

    /// 日志级别（默认: info,sharelist_core_rust=debug）
    #[arg(long, default_value = "info,sharelist_core_rust=debug")]
    log_level: String,

    /// 额外写入的日志文件
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 通过邮箱注册用户，输出用户信息与 token
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        mail: String,
        #[arg(long)]
        username: Option<String>,
    },
    /// 创建清单
    CreateList {
        #[arg(long)]
        token: String,
        #[arg(long)]
        name: String,
        /// 共享成员的用户 ID
        #[arg(long = "shared-with")]
        shared_with: Vec<String>,
    },
    /// 列出当前用户参与的清单
    Lists {
        #[arg(long)]
        token: String,
    },
    /// 向清单添加条目
    AddItem {
        #[arg(long)]
        token: String,
        #[arg(long)]
        list: String,
        #[arg(long)]
        name: String,
    },
    /// 邀请用户（用户 ID、@用户名 或邮箱）
    Invite {
        #[arg(long)]
        token: String,
        #[arg(long)]
        list: String,
        targets: Vec<String>,
    },
    /// 完成清单
    Finish {
        #[arg(long)]
        token: String,
        #[arg(long)]
        list: String,
        /// 把未完成条目结转到新清单
        #[arg(long)]
        carryover: bool,
    },
    /// 演示：Alice 创建清单、Charlie 被拒绝访问、完成后清单不存在
    Demo,
}

/// 初始化日志（stdout，可选同时写入文件）
fn init_logger(log_level: &str, log_file: Option<&PathBuf>) -> Result<()> {
    use std::fs::OpenOptions;
    use std::io;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    // 优先使用环境变量 RUST_LOG（如果设置了），否则使用命令行参数
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    // 控制台日志写到 stderr，stdout 只输出 JSON 结果
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(false)
        .with_ansi(true);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(file)
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_ansi(false),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(console_layer)
        .with(file_layer)
        .init();

    if let Some(path) = log_file {
        info!("[CLI] 日志同时写入文件: {}", path.display());
    }
    Ok(())
}

fn print<T: Serialize>(resp: &ApiResponse<T>) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(resp)?);
    Ok(())
}

/// 校验 token 后执行操作
async fn with_actor<T, F, Fut>(svc: &SharedListService, token: &str, op: F) -> ApiResponse<T>
where
    F: FnOnce(Actor) -> Fut,
    Fut: std::future::Future<Output = ListResult<T>>,
{
    match svc.authenticate(Some(token)) {
        Ok(actor) => op(actor).await.into(),
        Err(e) => ApiResponse::from_error(&e),
    }
}

async fn run_demo(svc: &SharedListService) -> Result<()> {
    let run_id = sharelist_core_rust::hub::types::new_id();
    let suffix = &run_id[..8];
    let register = |name: &'static str| {
        let mail = format!("{}.{}@demo.test", name.to_lowercase(), suffix);
        async move {
            svc.users()
                .register_user_by_mail(name, &mail, None)
                .await
                .map_err(|e| anyhow::anyhow!("注册 {} 失败: {}", name, e))
        }
    };
    let alice: RegisteredUser = register("Alice").await?;
    let bob: RegisteredUser = register("Bob").await?;
    let charlie: RegisteredUser = register("Charlie").await?;
    info!("[Demo] 已注册 Alice / Bob / Charlie");

    let alice_actor = svc.authenticate(Some(&alice.token))?;
    let charlie_actor = svc.authenticate(Some(&charlie.token))?;

    let list = svc
        .lists()
        .new_list(&alice_actor, "Chores", &[bob.user.id.clone()])
        .await?;
    info!("[Demo] Alice 创建清单 {}，成员 {} 个", list.id, list.shared.len());

    let item: ListItem = svc
        .lists()
        .add_item(&alice_actor, &list.id, &json!({"name": "Dishes"}))
        .await?;
    info!("[Demo] Alice 添加条目 {}", item.name);

    let resp: ApiResponse<PopulatedList> =
        svc.lists().get_list(&charlie_actor, &list.id).await.into();
    info!("[Demo] Charlie 读取清单 → {}", resp.http_status());

    let report = svc
        .lists()
        .finish(&alice_actor, &list.id, FinishOptions { carryover: false })
        .await?;
    info!(
        "[Demo] 清单已完成，归档 {}（checked={}, pending={}）",
        report.finished.archive, report.finished.checked, report.finished.pending
    );

    let resp: ApiResponse<PopulatedList> =
        svc.lists().get_list(&alice_actor, &list.id).await.into();
    info!("[Demo] 完成后读取清单 → {}", resp.http_status());
    if resp.http_status() != 404 {
        warn!("[Demo] 预期 404，实际 {}", resp.http_status());
    }
    print(&ApiResponse::ok(report))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logger(&args.log_level, args.log_file.as_ref())?;

    let svc = SharedListService::connect(ServiceConfig::new(&args.db, &args.token_key)).await?;
    let svc = &svc;

    match args.command {
        Command::Register {
            name,
            mail,
            username,
        } => {
            let resp: ApiResponse<RegisteredUser> = svc
                .users()
                .register_user_by_mail(&name, &mail, username.as_deref())
                .await
                .into();
            print(&resp)
        }
        Command::CreateList {
            token,
            name,
            shared_with,
        } => {
            let resp = with_actor(svc, &token, |actor| async move {
                svc.lists().new_list(&actor, &name, &shared_with).await
            })
            .await;
            print(&resp)
        }
        Command::Lists { token } => {
            let resp = with_actor(svc, &token, |actor| async move {
                svc.lists().list_all_for(&actor).await
            })
            .await;
            print(&resp)
        }
        Command::AddItem { token, list, name } => {
            let resp = with_actor(svc, &token, |actor| async move {
                svc.lists()
                    .add_item(&actor, &list, &json!({ "name": name }))
                    .await
            })
            .await;
            print(&resp)
        }
        Command::Invite {
            token,
            list,
            targets,
        } => {
            let parsed: Vec<InviteTarget> =
                targets.iter().filter_map(|t| InviteTarget::parse(t)).collect();
            if parsed.len() < targets.len() {
                warn!(
                    "[CLI] {} 个邀请目标无法识别，已忽略",
                    targets.len() - parsed.len()
                );
            }
            let resp = with_actor(svc, &token, |actor| async move {
                svc.invites().invite_many(&actor, &list, &parsed).await
            })
            .await;
            print(&resp)
        }
        Command::Finish {
            token,
            list,
            carryover,
        } => {
            let resp = with_actor(svc, &token, |actor| async move {
                svc.lists()
                    .finish(&actor, &list, FinishOptions { carryover })
                    .await
            })
            .await;
            print(&resp)
        }
        Command::Demo => run_demo(svc).await,
    }
}
