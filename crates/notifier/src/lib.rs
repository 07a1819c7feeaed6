//! 通知投递
//!
//! 渠道选择、占位符渲染、Webhook与邮件传输，以及带退避的重试。

pub mod dispatcher;
pub mod email;
pub mod template;
pub mod webhook;

pub use dispatcher::NotificationDispatcher;
