use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::document::SpecificationDocument;

/// 已合成文档的无锁缓存。
///
/// # 教案式说明
/// - **意图（Why）**：注册表在启动后视为冻结，文档只需合成一次；并发的文档请求不应互相阻塞；
/// - **逻辑（How）**：内部以 [`ArcSwapOption`] 持有 `Arc<SpecificationDocument>`，读路径只做一次
///   原子加载；未命中时在调用方线程内计算并整体写入；
/// - **契约（What）**：
///   - 两个请求同时未命中时会各自计算一次，后写入者生效；合成是纯函数，两份结果相同；
///   - 计算失败不会写入缓存，下一次请求重新尝试；
///   - [`reset`](Self::reset) 之后的下一次请求从头合成，不存在增量更新。
#[derive(Default)]
pub struct DocumentCache {
    slot: ArcSwapOption<SpecificationDocument>,
}

impl fmt::Debug for DocumentCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentCache")
            .field("populated", &self.is_populated())
            .finish()
    }
}

impl DocumentCache {
    /// 创建空缓存。
    pub fn new() -> Self {
        Self::default()
    }

    /// 读取已缓存的文档。
    pub fn get(&self) -> Option<Arc<SpecificationDocument>> {
        self.slot.load_full()
    }

    /// 是否已有缓存。
    pub fn is_populated(&self) -> bool {
        self.slot.load().is_some()
    }

    /// 命中则返回缓存，否则调用 `compute` 合成并写入。
    pub fn get_or_try_init<E>(
        &self,
        compute: impl FnOnce() -> Result<SpecificationDocument, E>,
    ) -> Result<Arc<SpecificationDocument>, E> {
        if let Some(document) = self.slot.load_full() {
            return Ok(document);
        }
        let document = Arc::new(compute()?);
        self.slot.store(Some(Arc::clone(&document)));
        Ok(document)
    }

    /// 丢弃缓存。
    pub fn reset(&self) {
        self.slot.store(None);
    }
}
