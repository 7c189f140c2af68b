use std::collections::BTreeSet;

use tracing::{debug, info, instrument, warn};
use url::Url;

use super::prober::Prober;
use super::reconciler::{ConfirmedResource, Provenance};

/// `1.jpg` ..= `{max}.jpg`
pub fn sequential_candidates(max_pages: u32) -> impl Iterator<Item = String> {
    (1..=max_pages).map(|n| format!("{}.jpg", n))
}

/// `1+2.jpg` .. `{max-1}+{max}.jpg`
pub fn composite_candidates(max_pages: u32) -> impl Iterator<Item = String> {
    (1..max_pages).map(|n| format!("{}+{}.jpg", n, n + 1))
}

pub struct Scanner {
    prober: Prober,
}

impl Scanner {
    pub fn new(prober: Prober) -> Self {
        Self { prober }
    }

    #[instrument(skip_all)]
    pub async fn sequential(&self, base: &Url, max_pages: u32) -> BTreeSet<ConfirmedResource> {
        info!("正在扫描 {} 下的连续编号图片...", base);
        self.scan(base, sequential_candidates(max_pages), Provenance::Sequential)
            .await
    }

    #[instrument(skip_all)]
    pub async fn composite(&self, base: &Url, max_pages: u32) -> BTreeSet<ConfirmedResource> {
        info!("正在检查 {} 下形如 X+Y.jpg 的合页图片...", base);
        self.scan(base, composite_candidates(max_pages), Provenance::Composite)
            .await
    }

    // 不在第一个缺页处停止，缺页需要被发现
    async fn scan(
        &self,
        base: &Url,
        candidates: impl Iterator<Item = String>,
        found_by: Provenance,
    ) -> BTreeSet<ConfirmedResource> {
        let mut found = BTreeSet::new();
        for name in candidates {
            let Ok(url) = base.join(&name) else {
                warn!("无法拼接候选地址: {} + {}", base, name);
                continue;
            };
            debug!("检查 {}", url);
            if self.prober.exists(&url).await {
                if found_by == Provenance::Composite {
                    info!("发现合页图片: {}", url);
                }
                found.insert(ConfirmedResource::new(url, found_by));
            }
        }
        info!("{:?} 扫描完成，命中 {} 个", found_by, found.len());
        found
    }
}
