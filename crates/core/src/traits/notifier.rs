use async_trait::async_trait;

use crate::errors::Result;
use crate::models::Task;

/// 通知投递接口
///
/// 实现负责渠道选择、占位符渲染与重试；
/// 返回错误表示重试预算耗尽后的最终失败。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn deliver(&self, task: &Task) -> Result<()>;
}
