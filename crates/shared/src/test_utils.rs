//! 测试工具模块
//!
//! 提供单元测试所需的辅助设施，用于在不依赖外部服务的情况下
//! 验证指标递增行为。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use metrics::CounterFn;

/// 记录递增总量的计数器实现
///
/// 注入到持有 `metrics::Counter` 句柄的组件中，
/// 使测试可以断言精确的递增次数。
#[derive(Debug, Default)]
pub struct CapturingCounter {
    value: AtomicU64,
}

impl CapturingCounter {
    pub fn value(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

impl CounterFn for CapturingCounter {
    fn increment(&self, value: u64) {
        self.value.fetch_add(value, Ordering::SeqCst);
    }

    fn absolute(&self, value: u64) {
        self.value.store(value, Ordering::SeqCst);
    }
}

/// 创建一对（计数器句柄，底层捕获器）
pub fn capturing_counter() -> (metrics::Counter, Arc<CapturingCounter>) {
    let inner = Arc::new(CapturingCounter::default());
    (metrics::Counter::from_arc(inner.clone()), inner)
}
