use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use chapter_harvest::config::DEFAULT_CONFIG_FILE;
use chapter_harvest::utils::format_elapsed;
use chapter_harvest::{ChapterOutcome, HarvestConfig, Harvester, get_user_input, logger};

#[derive(clap::Parser)]
#[command(version, about = "按编号探测并下载漫画章节图片")]
struct Args {
    /// 配置文件路径
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,
    /// 站点名称（配置了多个站点时必填）
    #[arg(short, long)]
    site: Option<String>,
    /// 覆盖配置中的最大探测页码
    #[arg(long)]
    max_pages: Option<u32>,
    /// 使用浏览器渲染页面
    #[arg(long)]
    dynamic: bool,
    /// 输出每个候选地址的探测日志
    #[arg(short, long)]
    verbose: bool,
    /// 章节编号，替换配置中的章节列表
    chapters: Vec<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    logger::init(args.verbose);

    let config = HarvestConfig::load(&args.config)?;
    let mut site = config.site(args.site.as_deref())?.clone();
    if let Some(max_pages) = args.max_pages {
        site.max_pages = max_pages;
    }
    if args.dynamic {
        site.render_dynamic = true;
    }

    let chapters = if !args.chapters.is_empty() {
        args.chapters
    } else if !site.chapters.is_empty() {
        site.chapters.clone()
    } else {
        get_user_input()?
    };

    let harvester = Harvester::new(&config)?;
    let start = Instant::now();
    let outcomes = harvester.run(&site, &chapters).await;

    let empty = outcomes
        .iter()
        .filter(|(_, outcome)| matches!(outcome, Some(ChapterOutcome::NothingFound) | None))
        .count();
    info!(
        "✅ 处理完成！共 {} 章，其中 {} 章没有结果，耗时: {}",
        outcomes.len(),
        empty,
        format_elapsed(start.elapsed())
    );
    Ok(())
}
