use anyhow::Result;
use clap::Parser;
use order_watch::error::InputError;
use order_watch::utils::logging;
use order_watch::{App, Config, OrderDescriptor, RunMode, RunOptions};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, warn};

/// 订单状态检查：状态或交付日期变化时发送通知
#[derive(Parser, Debug)]
#[command(name = "order-watch", version)]
struct Cli {
    /// 订单列表文件，每行一个订单
    #[arg(short = 'f', long = "file")]
    file: Option<PathBuf>,

    /// 临时查询：车架号
    #[arg(short = 'v', long)]
    vin: Option<String>,

    /// 临时查询：订单号
    #[arg(short = 'o', long)]
    order_number: Option<String>,

    /// 临时查询：经销商代码
    #[arg(short = 'd', long)]
    dealer_code: Option<String>,

    /// 临时查询：状态变化时通知的邮箱
    #[arg(short = 'e', long)]
    send_email: Option<String>,

    /// 下载窗贴
    #[arg(short = 'w', long)]
    window_sticker: bool,

    /// 从列表文件中移除已交付的订单
    #[arg(short = 'r', long)]
    remove_delivered: bool,

    /// 报告中附带车辆配置
    #[arg(short = 's', long)]
    vehicle_summary: bool,

    /// 不把报告打印到屏幕
    #[arg(short = 'n', long)]
    no_print: bool,

    /// TOML 配置文件
    #[arg(short = 'c', long, env = "ORDER_WATCH_CONFIG")]
    config: Option<PathBuf>,

    /// 输出调试日志
    #[arg(long)]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> Result<RunMode, InputError> {
        if let Some(file) = &self.file {
            return Ok(RunMode::List(file.clone()));
        }
        if let Some(vin) = &self.vin {
            return OrderDescriptor::vin(vin, self.send_email.clone()).map(RunMode::Single);
        }
        match (&self.order_number, &self.dealer_code) {
            (Some(number), Some(dealer)) => {
                OrderDescriptor::number_and_dealer(number, dealer, self.send_email.clone())
                    .map(RunMode::Single)
            }
            _ => Err(InputError::InvalidQuery {
                reason: "需要 --file、--vin 或 --order-number + --dealer-code".to_string(),
            }),
        }
    }

    fn options(&self, mode: RunMode) -> RunOptions {
        RunOptions {
            mode,
            window_sticker: self.window_sticker,
            remove_delivered: self.remove_delivered,
            vehicle_summary: self.vehicle_summary,
            print: !self.no_print,
        }
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::from_toml_file(path)?.with_env_overrides(),
        None => Config::from_env(),
    };
    Ok(Config {
        verbose_logging: config.verbose_logging || cli.verbose,
        ..config
    })
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // 加载配置
    let config = load_config(&cli);
    logging::init(config.as_ref().map_or(cli.verbose, |c| c.verbose_logging));
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            error!("❌ 配置加载失败: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let mode = match cli.mode() {
        Ok(mode) => mode,
        Err(e) => {
            error!("❌ {}", e);
            return ExitCode::from(1);
        }
    };

    // 中断时立即退出，已落盘的记录各自完整
    tokio::select! {
        result = run(config, cli.options(mode)) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("❌ {:#}", e);
                ExitCode::from(1)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            warn!("⚠️ 收到中断信号，退出");
            ExitCode::from(2)
        }
    }
}

async fn run(config: Config, options: RunOptions) -> Result<()> {
    App::initialize(config, options).await?.run().await?;
    Ok(())
}
