use anyhow::Result;
use clap::Parser;
use tracing::{error, info};

use selcrs_crawler::cli::{Cli, CollectGlyphsArgs, Commands};
use selcrs_crawler::orchestrator::{collect_glyphs, App};
use selcrs_crawler::utils::logging;
use selcrs_crawler::Config;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        error!(error = %err, "运行失败");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "原因");
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    // 加载配置（失败时也要先有日志输出）
    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            logging::init(false);
            return Err(e.into());
        }
    };

    // 初始化日志
    logging::init(config.verbose_logging);

    match cli.command {
        Commands::Start => {
            let app = App::initialize(&config)?;
            if let Err(e) = app.run().await {
                if e.is_structural() {
                    error!("❌ 本次运行没有写入任何快照");
                }
                return Err(e.into());
            }
        }
        Commands::CollectGlyphs(args) => {
            if args.academic_year.is_some() {
                config.academic_year = args.academic_year.clone();
            }
            run_collect_glyphs(&config, &args).await?;
        }
    }

    Ok(())
}

async fn run_collect_glyphs(config: &Config, args: &CollectGlyphsArgs) -> Result<()> {
    let app = App::initialize(config)?;
    let academic_year = app.flow().resolve_academic_year().await?;
    let stats = collect_glyphs(app.flow(), &academic_year, args.samples, &args.output).await?;
    logging::print_final_stats(&format!(
        "🧪 共 {} 张, 通过 {}, 错误 {} ({:.2}%)",
        stats.total,
        stats.done,
        stats.error,
        stats.success_rate()
    ));
    info!("样本已保存至: {}", args.output.display());
    Ok(())
}
