use tracing::{error, info};
use uuid::Uuid;

fn main() -> std::process::ExitCode {
    // 提前加载 .env，使得 RUST_LOG、DATABASE_URL 等环境变量生效
    dotenvy::dotenv().ok();

    let cfg = match configs::AppConfig::load_and_validate() {
        Ok(cfg) => cfg,
        Err(e) => {
            common::utils::logging::init_logging_default();
            error!(service = "storefront", event = "config_invalid", error = %e, "failed to load configuration");
            return std::process::ExitCode::FAILURE;
        }
    };
    common::utils::logging::init_logging_with_format(&cfg.logging.format);

    // 基础服务上下文（不含敏感信息）
    let service_id = Uuid::new_v4();
    let pid = std::process::id();
    let version = env!("CARGO_PKG_VERSION");

    // Panic 钩子：捕获异常并输出错误日志，便于排查问题
    std::panic::set_hook(Box::new(move |info| {
        error!(
            service = "storefront",
            event = "panic",
            %service_id,
            pid,
            message = %info,
            "unhandled panic occurred"
        );
    }));

    // 构建 Tokio 运行时（线程数来自 server.worker_threads）
    let worker_threads = cfg.server.worker_threads;
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(w) = worker_threads { builder.worker_threads(w); }

    let rt = match builder.build() {
        Ok(rt) => rt,
        Err(e) => {
            error!(service = "storefront", event = "runtime_build_failed", error = %e, "failed to build tokio runtime");
            return std::process::ExitCode::FAILURE;
        }
    };

    info!(
        service = "storefront",
        event = "start",
        %service_id,
        pid,
        version,
        threads = worker_threads.unwrap_or_default(),
        "storefront service starting"
    );

    // server::run 内部监听 Ctrl+C 并优雅停机
    rt.block_on(async move {
        match server::run(cfg).await {
            Ok(()) => {
                info!(service = "storefront", event = "stop", %service_id, pid, "server stopped normally");
                std::process::ExitCode::SUCCESS
            }
            Err(e) => {
                error!(service = "storefront", event = "run_failed", error = %e, "server::run returned error");
                std::process::ExitCode::FAILURE
            }
        }
    })
}
