use std::collections::BTreeSet;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

/// 匹配 1.jpg、14+15.jpg、cover-a.JPG 等文件名结尾
static IMAGE_PATTERN: &str = r"(?i)[\w\-+]+\.jpg$";

pub struct Parser {
    image_pattern: Regex,
    img_selector: Selector,
    any_selector: Selector,
}

impl Parser {
    pub fn new() -> Self {
        Self {
            image_pattern: Regex::new(IMAGE_PATTERN).expect("无法编译图片文件名正则"),
            img_selector: Selector::parse("img").expect("无法创建img选择器"),
            any_selector: Selector::parse("*").expect("无法创建通配选择器"),
        }
    }

    /// 收集页面中所有指向 jpg 的地址，先看 img 的 src，再看所有标签的所有属性
    #[instrument(skip_all)]
    pub fn image_links(&self, html: &str, page_url: &Url) -> BTreeSet<Url> {
        let document = Html::parse_document(html);
        let mut links = BTreeSet::new();

        for img in document.select(&self.img_selector) {
            let Some(src) = img.value().attr("src") else {
                continue;
            };
            self.push_match(src, page_url, &mut links);
        }

        for element in document.select(&self.any_selector) {
            for (_, value) in element.value().attrs() {
                self.push_match(value, page_url, &mut links);
            }
        }

        info!("页面中找到 {} 个 jpg 地址", links.len());
        links
    }

    /// 文章页模式：按出现顺序取 img 中的绝对地址
    pub fn page_images(&self, html: &str, page_url: &Url) -> Vec<Url> {
        let document = Html::parse_document(html);
        let mut images: Vec<Url> = Vec::new();

        for img in document.select(&self.img_selector) {
            let Some(src) = img.value().attr("src") else {
                continue;
            };
            if !src.starts_with("http") {
                continue;
            }
            match page_url.join(src) {
                Ok(url) if !images.contains(&url) => images.push(url),
                Ok(_) => {}
                Err(e) => debug!("忽略无效的图片地址 {}: {}", src, e),
            }
        }
        images
    }

    fn push_match(&self, value: &str, page_url: &Url, links: &mut BTreeSet<Url>) {
        let value = value.trim();
        if value.is_empty() || !self.image_pattern.is_match(value) {
            return;
        }
        match page_url.join(value) {
            Ok(url) => {
                links.insert(url);
            }
            Err(e) => debug!("忽略无效的图片地址 {}: {}", value, e),
        }
    }
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}
