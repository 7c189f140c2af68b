use anyhow::Result;
use reqwest::Client;
use tracing::{info, instrument};
use url::Url;

use crate::config::Timeouts;

#[cfg(feature = "browser")]
static SCROLL_TO_BOTTOM_SCRIPT: &str = "window.scrollTo(0, document.body.scrollHeight);";

/// 取得页面 HTML：静态请求，或用无头浏览器渲染执行脚本后的页面
pub struct Renderer {
    client: Client,
    timeouts: Timeouts,
    #[cfg_attr(not(feature = "browser"), allow(dead_code))]
    user_agent: String,
}

impl Renderer {
    pub fn new(client: Client, timeouts: Timeouts, user_agent: String) -> Self {
        Self {
            client,
            timeouts,
            user_agent,
        }
    }

    #[instrument(skip_all)]
    pub async fn html(&self, url: &Url, render_dynamic: bool) -> Result<String> {
        if render_dynamic {
            info!("使用浏览器渲染动态页面: {}", url);
            self.render(url).await
        } else {
            self.fetch(url).await
        }
    }

    async fn fetch(&self, url: &Url) -> Result<String> {
        let response = self
            .client
            .get(url.clone())
            .timeout(self.timeouts.page())
            .send()
            .await?
            .error_for_status()?;
        Ok(response.text().await?)
    }

    #[cfg(not(feature = "browser"))]
    async fn render(&self, _url: &Url) -> Result<String> {
        anyhow::bail!("未启用 browser 特性，无法渲染动态页面")
    }

    #[cfg(feature = "browser")]
    async fn render(&self, url: &Url) -> Result<String> {
        use chromiumoxide::browser::{Browser, BrowserConfig};
        use futures::StreamExt;

        let config = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", self.user_agent))
            .request_timeout(self.timeouts.render())
            .build()
            .map_err(|e| anyhow::anyhow!("浏览器配置失败: {}", e))?;

        let (mut browser, mut handler) = Browser::launch(config).await?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        // 无论渲染成败都关闭浏览器
        let result = self.render_page(&browser, url).await;
        let _ = browser.close().await;
        let _ = browser.wait().await;
        handler_task.abort();
        result
    }

    #[cfg(feature = "browser")]
    async fn render_page(&self, browser: &chromiumoxide::Browser, url: &Url) -> Result<String> {
        let page = browser.new_page(url.as_str()).await?;

        tokio::time::timeout(self.timeouts.render(), page.find_element("body"))
            .await
            .map_err(|_| anyhow::anyhow!("等待页面 body 超时: {}", url))??;

        page.evaluate(SCROLL_TO_BOTTOM_SCRIPT.to_string()).await?;
        tokio::time::sleep(self.timeouts.settle()).await;

        let content = page.content().await?;
        let _ = page.close().await;
        Ok(content)
    }
}
