use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::sync::LazyLock;

use regex::Regex;
use tracing::{error, info, instrument, warn};
use url::Url;

use super::parser::Parser;
use super::renderer::Renderer;
use super::scanner::Scanner;

static SEQUENTIAL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\.jpg$").expect("无法编译页码正则"));

static COMPOSITE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d+)\+(\d+)\.jpg$").expect("无法编译合页正则"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Sequential,
    Composite,
    Scraped,
}

/// 已确认存在的图片；相等、排序、哈希只看地址
#[derive(Debug, Clone)]
pub struct ConfirmedResource {
    pub url: Url,
    pub found_by: Provenance,
}

impl ConfirmedResource {
    pub fn new(url: Url, found_by: Provenance) -> Self {
        Self { url, found_by }
    }

    pub fn file_name(&self) -> String {
        file_name(&self.url)
    }
}

impl PartialEq for ConfirmedResource {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for ConfirmedResource {}

impl Hash for ConfirmedResource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

impl PartialOrd for ConfirmedResource {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ConfirmedResource {
    fn cmp(&self, other: &Self) -> Ordering {
        self.url.cmp(&other.url)
    }
}

/// 地址的最后一段路径
pub fn file_name(url: &Url) -> String {
    url.path_segments()
        .and_then(|mut segments| segments.next_back())
        .filter(|name| !name.is_empty())
        .unwrap_or("index")
        .to_owned()
}

#[derive(Debug, Default)]
pub struct ChapterReport {
    pub confirmed: BTreeSet<ConfirmedResource>,
    /// 升序
    pub sequential: Vec<u32>,
    pub non_sequential: Vec<String>,
    /// `1..=max(sequential)` 中不在 `sequential` 里的页码
    pub missing: Vec<u32>,
    /// 合页文件名（如 14+15.jpg）覆盖到的页码
    pub composite_pages: BTreeSet<u32>,
    /// 最大页码达到或超过探测上限，章节可能被截断
    pub possibly_truncated: bool,
}

impl ChapterReport {
    pub fn from_confirmed(confirmed: BTreeSet<ConfirmedResource>, max_pages: u32) -> Self {
        let mut pages = BTreeSet::new();
        let mut non_sequential = Vec::new();
        let mut composite_pages = BTreeSet::new();

        for resource in &confirmed {
            let name = resource.file_name();
            // 页码从 1 开始，0.jpg 不计入
            let page = SEQUENTIAL_NAME
                .captures(&name)
                .and_then(|caps| caps[1].parse::<u32>().ok())
                .filter(|&page| page > 0);
            match page {
                Some(page) => {
                    pages.insert(page);
                }
                None => {
                    if let Some((first, last)) = composite_span(&name) {
                        composite_pages.insert(first);
                        composite_pages.insert(last);
                    }
                    non_sequential.push(name);
                }
            }
        }
        non_sequential.sort();
        non_sequential.dedup();

        let missing = missing_pages(&pages);
        let possibly_truncated = max_pages > 0 && pages.last().is_some_and(|&max| max >= max_pages);

        Self {
            confirmed,
            sequential: pages.into_iter().collect(),
            non_sequential,
            missing,
            composite_pages,
            possibly_truncated,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.confirmed.is_empty()
    }

    /// 缺页中去掉已被合页覆盖的页码
    pub fn uncovered_missing(&self) -> Vec<u32> {
        self.missing
            .iter()
            .copied()
            .filter(|page| !self.composite_pages.contains(page))
            .collect()
    }
}

/// 只认相邻两页的合页名，如 14+15.jpg
fn composite_span(name: &str) -> Option<(u32, u32)> {
    let caps = COMPOSITE_NAME.captures(name)?;
    let first = caps[1].parse::<u32>().ok()?;
    let last = caps[2].parse::<u32>().ok()?;
    (first > 0 && first.checked_add(1) == Some(last)).then_some((first, last))
}

pub fn missing_pages(pages: &BTreeSet<u32>) -> Vec<u32> {
    match pages.last() {
        Some(&max) => (1..=max).filter(|page| !pages.contains(page)).collect(),
        None => Vec::new(),
    }
}

/// 汇总三条发现路径的结果
pub struct Reconciler {
    scanner: Scanner,
    renderer: Renderer,
    parser: Parser,
}

impl Reconciler {
    pub fn new(scanner: Scanner, renderer: Renderer, parser: Parser) -> Self {
        Self {
            scanner,
            renderer,
            parser,
        }
    }

    #[instrument(skip_all, fields(base = %base))]
    pub async fn reconcile(&self, base: &Url, max_pages: u32, render_dynamic: bool) -> ChapterReport {
        let mut confirmed = self.scanner.sequential(base, max_pages).await;

        for resource in self.scanner.composite(base, max_pages).await {
            confirmed.insert(resource);
        }

        info!("正在抓取 {} 中的其他 jpg 文件...", base);
        for url in self.scrape(base, render_dynamic).await {
            confirmed.insert(ConfirmedResource::new(url, Provenance::Scraped));
        }

        let report = ChapterReport::from_confirmed(confirmed, max_pages);
        if report.possibly_truncated {
            warn!("第 {} 页已达到探测上限，章节可能还有更多页面", max_pages);
        }
        report
    }

    /// 抓取失败时返回空集合
    pub async fn scrape(&self, url: &Url, render_dynamic: bool) -> BTreeSet<Url> {
        match self.renderer.html(url, render_dynamic).await {
            Ok(html) => self.parser.image_links(&html, url),
            Err(e) => {
                error!("抓取 {} 失败: {:#}", url, e);
                BTreeSet::new()
            }
        }
    }

    /// 文章页模式：只保留页面 img 标签里的绝对地址
    pub async fn page_images(&self, url: &Url, render_dynamic: bool) -> Vec<Url> {
        match self.renderer.html(url, render_dynamic).await {
            Ok(html) => self.parser.page_images(&html, url),
            Err(e) => {
                error!("抓取 {} 失败: {:#}", url, e);
                Vec::new()
            }
        }
    }
}
