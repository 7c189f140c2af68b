pub mod downloader;
pub mod parser;
pub mod prober;
pub mod reconciler;
pub mod renderer;
pub mod scanner;

use std::path::PathBuf;

use anyhow::Result;
use reqwest::Client;
use tracing::{error, info, instrument, warn};
use url::Url;

pub use downloader::{Downloader, FetchReport};
pub use parser::Parser;
pub use prober::{ProbeMiss, Prober};
pub use reconciler::{ChapterReport, ConfirmedResource, Provenance, Reconciler};
pub use renderer::Renderer;
pub use scanner::Scanner;

use crate::config::{HarvestConfig, SiteConfig, SiteMode, extract_params};

#[derive(Debug)]
pub enum ChapterOutcome {
    /// 三条路径都没有结果
    NothingFound,
    Probed {
        report: ChapterReport,
        fetch: FetchReport,
    },
    Page {
        images: Vec<Url>,
        fetch: FetchReport,
    },
}

pub struct Harvester {
    download_dir: PathBuf,
    reconciler: Reconciler,
    downloader: Downloader,
}

impl Harvester {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .cookie_store(true)
            .build()?;
        let timeouts = config.timeouts;

        let prober = Prober::new(client.clone(), timeouts.probe());
        let renderer = Renderer::new(client.clone(), timeouts, config.user_agent.clone());
        let reconciler = Reconciler::new(Scanner::new(prober), renderer, Parser::new());

        Ok(Self {
            download_dir: config.download_dir.clone(),
            reconciler,
            downloader: Downloader::new(client, timeouts.download()),
        })
    }

    /// 逐章处理，单章失败只记录日志
    pub async fn run(&self, site: &SiteConfig, chapters: &[String]) -> Vec<(String, Option<ChapterOutcome>)> {
        if !extract_params(&site.base_url).iter().any(|p| p == "chapter") {
            warn!("站点 {} 的地址模板中没有 {{chapter}}，每章都会访问同一地址", site.name);
        }

        let mut outcomes = Vec::new();
        for chapter in chapters {
            match self.process_chapter(site, chapter).await {
                Ok(outcome) => outcomes.push((chapter.clone(), Some(outcome))),
                Err(e) => {
                    error!("第 {} 章处理失败: {:#}", chapter, e);
                    outcomes.push((chapter.clone(), None));
                }
            }
        }
        outcomes
    }

    #[instrument(skip(self, site))]
    pub async fn process_chapter(&self, site: &SiteConfig, chapter: &str) -> Result<ChapterOutcome> {
        let base_url = site.chapter_url(chapter)?;
        let chapter_dir = site.chapter_dir(&self.download_dir, chapter)?;
        info!("正在处理第 {} 章: {}", chapter, base_url);

        match site.mode {
            SiteMode::Probe => {
                let report = self
                    .reconciler
                    .reconcile(&base_url, site.max_pages, site.render_dynamic)
                    .await;

                if report.is_empty() {
                    if site.render_dynamic {
                        warn!("第 {} 章没有找到任何 jpg 文件", chapter);
                    } else {
                        warn!("第 {} 章没有找到任何 jpg 文件，可尝试开启 render_dynamic", chapter);
                    }
                    return Ok(ChapterOutcome::NothingFound);
                }

                print_report(chapter, &report);

                info!("正在下载第 {} 章到 {}", chapter, chapter_dir.display());
                let urls = report.confirmed.iter().map(|r| &r.url);
                let fetch = self
                    .downloader
                    .fetch_all(urls, &chapter_dir, site.naming)
                    .await?;
                print_fetch(chapter, &fetch);
                Ok(ChapterOutcome::Probed { report, fetch })
            }
            SiteMode::Page => {
                let images = self
                    .reconciler
                    .page_images(&base_url, site.render_dynamic)
                    .await;
                if images.is_empty() {
                    warn!("第 {} 章页面中没有图片", chapter);
                    return Ok(ChapterOutcome::NothingFound);
                }

                info!("第 {} 章页面中找到 {} 张图片", chapter, images.len());
                let fetch = self
                    .downloader
                    .fetch_all(&images, &chapter_dir, site.naming)
                    .await?;
                print_fetch(chapter, &fetch);
                Ok(ChapterOutcome::Page { images, fetch })
            }
        }
    }
}

fn print_report(chapter: &str, report: &ChapterReport) {
    println!("\n第 {} 章找到以下 jpg 文件:", chapter);
    for resource in &report.confirmed {
        println!("{} ({:?})", resource.url, resource.found_by);
    }
    println!("共 {} 个文件", report.confirmed.len());

    if !report.sequential.is_empty() {
        let names: Vec<String> = report.sequential.iter().map(|n| format!("{}.jpg", n)).collect();
        println!("连续编号: {:?}", names);
    }
    if !report.non_sequential.is_empty() {
        println!("非连续编号: {:?}", report.non_sequential);
    }

    let missing = report.uncovered_missing();
    if missing.is_empty() {
        println!("没有缺失的连续编号文件");
    } else {
        let names: Vec<String> = missing.iter().map(|n| format!("{}.jpg", n)).collect();
        println!("缺失的连续编号: {:?}", names);
    }
    let covered: Vec<u32> = report
        .missing
        .iter()
        .copied()
        .filter(|page| report.composite_pages.contains(page))
        .collect();
    if !covered.is_empty() {
        println!("仅由合页覆盖的页码: {:?}", covered);
    }
    if report.possibly_truncated {
        println!("最大页码已达到探测上限，可能还有更多页面");
    }
}

fn print_fetch(chapter: &str, fetch: &FetchReport) {
    println!(
        "第 {} 章下载完成: 成功 {} 个，失败 {} 个",
        chapter,
        fetch.succeeded.len(),
        fetch.failed.len()
    );
    for (url, reason) in &fetch.failed {
        println!("下载失败: {} ({})", url, reason);
    }
}
