use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use taskpanel_core::models::TaskFilter;
use taskpanel_core::{init_logging, ClusterHandle, PanelConfig};
use taskpanel_domain::{
    describe_backends, ClusterInspector, PeriodicTasksFacade, QueuesFacade, TasksFacade,
    WorkersFacade,
};

mod app;

/// 命令行入口
#[derive(Parser, Debug)]
#[command(name = "taskpanel")]
#[command(version)]
#[command(about = "任务队列集群管理面板")]
#[command(long_about = "查看 worker、队列、任务结果与周期任务，输出JSON")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 配置文件路径，缺省时按默认路径搜索
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// 覆盖本次命令使用的后端标识
    #[arg(long, global = true)]
    backend: Option<String>,

    /// 日志级别，覆盖配置文件
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 集群总览
    Status,
    /// Worker列表
    Workers,
    /// 单个Worker详情
    Worker {
        /// Worker名称，例如 celery@host
        worker_id: String,
    },
    /// 队列列表及深度
    Queues,
    /// 单个队列详情
    Queue {
        name: String,
    },
    /// 任务列表
    Tasks {
        /// 按任务名或ID搜索
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long, default_value = "1")]
        page: u64,
        #[arg(long, default_value = "50")]
        per_page: u64,
        /// 状态过滤：all/active/pending/started/success/failure/retry/revoked
        #[arg(short, long)]
        filter: Option<TaskFilter>,
    },
    /// 单个任务详情
    Task {
        task_id: String,
    },
    /// 周期任务
    Periodic,
    /// 本地注册的任务
    Registered {
        /// 包含 celery. 开头的内部任务
        #[arg(long)]
        include_internal: bool,
    },
    /// 集群配置快照
    Config,
    /// 可用的后端
    Backends,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = PanelConfig::load(cli.config.as_deref()).context("加载配置失败")?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging)?;

    let handle = app::build_handle(&config)?;
    let output = run(cli.command, &handle, cli.backend.as_deref()).await?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn run(command: Commands, handle: &ClusterHandle, backend: Option<&str>) -> Result<Value> {
    debug!("执行命令: {:?}", command);
    match command {
        Commands::Status => to_json(ClusterInspector::new(handle).get_status().await),
        Commands::Workers => to_json(WorkersFacade::new(handle, backend)?.get_workers().await),
        Commands::Worker { worker_id } => to_json(
            WorkersFacade::new(handle, backend)?
                .get_worker_detail(&worker_id)
                .await,
        ),
        Commands::Queues => to_json(QueuesFacade::new(handle, backend)?.get_queues().await),
        Commands::Queue { name } => to_json(
            QueuesFacade::new(handle, backend)?
                .get_queue_detail(&name)
                .await,
        ),
        Commands::Tasks {
            search,
            page,
            per_page,
            filter,
        } => {
            let facade = TasksFacade::new(handle, backend)?;
            let filter = filter.unwrap_or_else(|| facade.default_filter());
            to_json(
                facade
                    .get_tasks(search.as_deref(), page, per_page, Some(filter))
                    .await,
            )
        }
        Commands::Task { task_id } => to_json(
            TasksFacade::new(handle, backend)?
                .get_task_detail(&task_id)
                .await,
        ),
        Commands::Periodic => to_json(
            PeriodicTasksFacade::new(handle, backend)?
                .get_periodic_tasks()
                .await,
        ),
        Commands::Registered { include_internal } => {
            to_json(ClusterInspector::new(handle).get_registered_tasks(!include_internal))
        }
        Commands::Config => to_json(ClusterInspector::new(handle).get_configuration_info()),
        Commands::Backends => to_json(describe_backends()),
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).context("序列化输出失败")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tasks_arguments_parse() {
        let cli = Cli::try_parse_from([
            "taskpanel", "tasks", "--search", "email", "--page", "2", "--filter", "failure",
        ])
        .unwrap();
        match cli.command {
            Commands::Tasks {
                search,
                page,
                per_page,
                filter,
            } => {
                assert_eq!(search.as_deref(), Some("email"));
                assert_eq!(page, 2);
                assert_eq!(per_page, 50);
                assert_eq!(filter, Some(TaskFilter::Failure));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_backend_override_after_subcommand() {
        let cli = Cli::try_parse_from([
            "taskpanel",
            "tasks",
            "--backend",
            "taskpanel::tasks::InspectTaskBackend",
        ])
        .unwrap();
        assert_eq!(
            cli.backend.as_deref(),
            Some("taskpanel::tasks::InspectTaskBackend")
        );
    }

    #[tokio::test]
    async fn test_unknown_backend_override_is_fatal() {
        let handle = app::build_handle(&PanelConfig::default()).unwrap();
        let err = run(Commands::Workers, &handle, Some("nope::Backend"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown"));
    }

    #[tokio::test]
    async fn test_backends_lists_builtin_identifiers() {
        let handle = app::build_handle(&PanelConfig::default()).unwrap();
        let output = run(Commands::Backends, &handle, None).await.unwrap();
        assert!(output.to_string().contains("taskpanel::tasks::ResultStoreTaskBackend"));
    }
}
