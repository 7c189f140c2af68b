use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::LazyLock,
    time::Duration,
};

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;
use url::Url;

pub static DEFAULT_CONFIG_FILE: &str = "harvest.toml";

static PARAM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("占位符正则无效"));

static DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

#[derive(Deserialize, Debug, Clone)]
pub struct HarvestConfig {
    #[serde(default = "default_download_dir")]
    pub download_dir: PathBuf,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub sites: Vec<SiteConfig>,
}

impl HarvestConfig {
    pub fn load(config_file: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::with_name(config_file).format(config::FileFormat::Toml))
            .add_source(config::Environment::with_prefix("HARVEST").separator("__"))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("配置文件 {} 反序列化失败: {}", config_file, e))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        config::Config::builder()
            .add_source(config::File::from_str(content, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("配置反序列化失败: {}", e))
    }

    /// 按名称选择站点；未指定名称时只允许配置了一个站点
    pub fn site(&self, name: Option<&str>) -> Result<&SiteConfig> {
        match name {
            Some(name) => self
                .sites
                .iter()
                .find(|s| s.name == name)
                .ok_or_else(|| anyhow::anyhow!("站点 '{}' 未配置", name)),
            None => match self.sites.as_slice() {
                [] => anyhow::bail!("未配置任何站点"),
                [site] => Ok(site),
                _ => anyhow::bail!("配置了多个站点，请用 --site 指定"),
            },
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct Timeouts {
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,
    #[serde(default = "default_page_secs")]
    pub page_secs: u64,
    #[serde(default = "default_download_secs")]
    pub download_secs: u64,
    #[serde(default = "default_render_secs")]
    pub render_secs: u64,
    #[serde(default = "default_settle_millis")]
    pub settle_millis: u64,
}

impl Timeouts {
    pub fn probe(&self) -> Duration {
        Duration::from_secs(self.probe_secs)
    }

    pub fn page(&self) -> Duration {
        Duration::from_secs(self.page_secs)
    }

    pub fn download(&self) -> Duration {
        Duration::from_secs(self.download_secs)
    }

    pub fn render(&self) -> Duration {
        Duration::from_secs(self.render_secs)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_millis)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            probe_secs: default_probe_secs(),
            page_secs: default_page_secs(),
            download_secs: default_download_secs(),
            render_secs: default_render_secs(),
            settle_millis: default_settle_millis(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SiteMode {
    /// 在章节目录下猜测编号图片，再抓取页面
    #[default]
    Probe,
    /// 每章一个文章页面，只取其中的图片标签
    Page,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FileNaming {
    /// 图片地址的最后一段路径
    #[default]
    Segment,
    /// 按发现顺序命名为 `image_{i}.jpg`
    Index,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub chapters: Vec<String>,
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
    #[serde(default)]
    pub render_dynamic: bool,
    #[serde(default)]
    pub mode: SiteMode,
    #[serde(default = "default_dir_template")]
    pub dir_template: String,
    #[serde(default)]
    pub naming: FileNaming,
}

fn default_download_dir() -> PathBuf {
    PathBuf::from("jpg_downloads")
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_owned()
}

fn default_probe_secs() -> u64 {
    5
}

fn default_page_secs() -> u64 {
    10
}

fn default_download_secs() -> u64 {
    10
}

fn default_render_secs() -> u64 {
    10
}

fn default_settle_millis() -> u64 {
    2000
}

fn default_max_pages() -> u32 {
    100
}

fn default_dir_template() -> String {
    "{chapter}".to_owned()
}

impl SiteConfig {
    pub fn chapter_url(&self, chapter: &str) -> Result<Url> {
        check_chapter(chapter)?;
        let url = replace_params(&self.base_url, &chapter_values(chapter));
        Url::parse(&url).map_err(|e| anyhow::anyhow!("无效的章节地址 {}: {}", url, e))
    }

    pub fn chapter_dir(&self, download_dir: &Path, chapter: &str) -> Result<PathBuf> {
        check_chapter(chapter)?;
        Ok(download_dir.join(replace_params(&self.dir_template, &chapter_values(chapter))))
    }
}

/// 章节编号会拼进下载目录，不能含路径分隔符或 `..`
pub fn check_chapter(chapter: &str) -> Result<()> {
    let chapter = chapter.trim();
    if chapter.is_empty() {
        anyhow::bail!("章节编号为空");
    }
    if chapter.contains(['/', '\\']) || chapter.contains("..") {
        anyhow::bail!("章节编号 '{}' 含有路径字符", chapter);
    }
    Ok(())
}

fn chapter_values(chapter: &str) -> HashMap<String, String> {
    HashMap::from([("chapter".to_owned(), chapter.trim().to_owned())])
}

pub fn extract_params(template: &str) -> Vec<String> {
    let mut params: Vec<String> = PARAM_PATTERN
        .captures_iter(template)
        .map(|cap| cap[1].to_string())
        .collect();
    params.dedup();
    params
}

pub fn replace_params(template: &str, values: &HashMap<String, String>) -> String {
    PARAM_PATTERN.replace_all(template, |caps: &regex::Captures| {
        values
            .get(&caps[1])
            .cloned()
            .unwrap_or_else(|| caps[0].to_string())
    })
    .to_string()
}
