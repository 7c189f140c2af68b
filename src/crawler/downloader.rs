use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use reqwest::Client;
use tokio::fs;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{error, info, instrument};
use url::Url;

use super::reconciler::file_name;
use crate::config::FileNaming;

const CHUNK_SIZE: usize = 8192;

#[derive(Debug, Default)]
pub struct FetchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(Url, String)>,
}

pub struct Downloader {
    client: Client,
    timeout: Duration,
}

impl Downloader {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// 单个文件失败不影响其余文件；目录无法创建时整体失败
    #[instrument(skip_all, fields(dest = %dest_dir.display()))]
    pub async fn fetch_all<'a>(
        &self,
        urls: impl IntoIterator<Item = &'a Url>,
        dest_dir: &Path,
        naming: FileNaming,
    ) -> Result<FetchReport> {
        fs::create_dir_all(dest_dir)
            .await
            .map_err(|e| anyhow::anyhow!("无法创建目录 {}: {}", dest_dir.display(), e))?;

        let mut report = FetchReport::default();
        for (index, url) in urls.into_iter().enumerate() {
            let filename = match naming {
                FileNaming::Segment => file_name(url),
                FileNaming::Index => format!("image_{}.jpg", index),
            };
            let path = dest_dir.join(filename);
            match self.download(url, &path).await {
                Ok(size) => {
                    info!("已下载: {} ({} 字节)", path.display(), size);
                    report.succeeded.push(path);
                }
                Err(e) => {
                    error!("下载 {} 失败: {:#}", url, e);
                    report.failed.push((url.clone(), format!("{:#}", e)));
                }
            }
        }
        Ok(report)
    }

    async fn download(&self, url: &Url, path: &Path) -> Result<u64> {
        let mut response = self
            .client
            .get(url.clone())
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?;

        let file = fs::File::create(path).await?;
        let result = write_body(&mut response, file).await;
        if result.is_err() {
            // 不留下只写了一半的图片
            let _ = fs::remove_file(path).await;
        }
        result
    }
}

async fn write_body(response: &mut reqwest::Response, file: fs::File) -> Result<u64> {
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        writer.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    writer.flush().await?;
    Ok(written)
}
