use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "selcrs-crawler",
    version,
    about = "抓取中山大学选课系统课程资料并发布版本化快照"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 抓取当前学年度并发布快照
    Start,
    /// 采集验证码训练样本
    CollectGlyphs(CollectGlyphsArgs),
}

#[derive(Args, Debug, Clone)]
pub struct CollectGlyphsArgs {
    /// 采集的验证码张数
    #[arg(long, default_value_t = 4000)]
    pub samples: usize,

    /// 输出目录（开始前会被清空）
    #[arg(long, default_value = "images")]
    pub output: PathBuf,

    /// 验证时使用的学年度（默认从选课系统获取）
    #[arg(long)]
    pub academic_year: Option<String>,
}
