//! 通知调度
//!
//! 按任务渠道选择传输方式，渲染占位符，并以指数退避重试投递。

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

use reminder_core::config::{NotifierConfig, RetryConfig};
use reminder_core::models::{ChannelSpec, EmailConfig, Task, WebhookConfig};
use reminder_core::traits::Notifier;
use reminder_core::{ReminderError, Result};

use crate::email::Mailer;
use crate::{template, webhook};

/// 单次投递的上下文：接收方、渲染后的正文与占位符变量
#[derive(Debug)]
pub struct DeliveryContext {
    pub recipient: String,
    pub content: String,
    pub at_list: Vec<String>,
    pub vars: HashMap<String, String>,
}

/// 通知投递器
pub struct NotificationDispatcher {
    http: reqwest::Client,
    config: NotifierConfig,
    mailer: Option<Mailer>,
}

impl NotificationDispatcher {
    pub fn new(config: NotifierConfig) -> Result<Self> {
        let mailer = config.mail.as_ref().map(Mailer::new).transpose()?;
        Ok(Self {
            http: reqwest::Client::new(),
            config,
            mailer,
        })
    }

    /// 构建投递上下文
    ///
    /// 群聊目标且有昵称时，正文前加 "@昵称 " 并填充提及列表。
    pub fn build_context(task: &Task) -> Result<DeliveryContext> {
        let recipient = task
            .recipient()
            .ok_or_else(|| ReminderError::Channel("任务缺少接收方".to_string()))?
            .to_string();

        let mut content = task.reminder_content.clone();
        let mut at_list = Vec::new();
        if task.is_group_target() {
            if let Some(nickname) = task
                .mention_user_nickname
                .as_deref()
                .filter(|n| !n.is_empty())
            {
                content = format!("@{nickname} {content}");
            }
            if let Some(user_id) = task.triggering_user_id.as_deref() {
                at_list.push(user_id.to_string());
            }
        }

        let mut vars = HashMap::new();
        vars.insert("content".to_string(), content.clone());
        vars.insert("base_content".to_string(), task.reminder_content.clone());
        vars.insert("user_id".to_string(), recipient.clone());
        vars.insert(
            "triggering_user_id".to_string(),
            task.triggering_user_id.clone().unwrap_or_default(),
        );
        vars.insert(
            "target_chat_id".to_string(),
            task.target_chat_id.clone().unwrap_or_default(),
        );
        vars.insert(
            "mention_nickname".to_string(),
            task.mention_user_nickname.clone().unwrap_or_default(),
        );
        vars.insert("task_name".to_string(), task.name.clone());
        vars.insert(
            "task_description".to_string(),
            task.description.clone().unwrap_or_default(),
        );

        Ok(DeliveryContext {
            recipient,
            content,
            at_list,
            vars,
        })
    }

    /// 渲染Webhook载荷：有模板走占位符替换，否则用内置消息格式
    pub fn webhook_payload(config: &WebhookConfig, context: &DeliveryContext) -> Value {
        match &config.payload_template {
            Some(tpl) => {
                let rendered = template::render_value(tpl, &context.vars);
                let leftover = template::unresolved_placeholders(&rendered);
                if !leftover.is_empty() {
                    warn!("载荷模板存在未解析占位符: {:?}", leftover);
                }
                rendered
            }
            None => webhook::default_payload(&context.recipient, &context.content, &context.at_list),
        }
    }

    async fn send_email(&self, config: &EmailConfig, context: &DeliveryContext) -> Result<()> {
        let mailer = self
            .mailer
            .as_ref()
            .ok_or_else(|| ReminderError::Configuration("未配置邮件服务器".to_string()))?;
        let subject = template::render_str(&config.subject, &context.vars);
        let leftover = template::unresolved_in_str(&subject);
        if !leftover.is_empty() {
            warn!("邮件主题存在未解析占位符: {:?}", leftover);
        }
        mailer.send(&config.recipient, &subject, &context.content).await
    }

    /// 单次投递尝试，不含重试
    async fn attempt(&self, task: &Task) -> Result<()> {
        let context = Self::build_context(task)?;
        match &task.channel {
            Some(ChannelSpec::Webhook(cfg)) => {
                let payload = Self::webhook_payload(cfg, &context);
                webhook::send(&self.http, cfg, &payload).await
            }
            Some(ChannelSpec::Email(cfg)) => self.send_email(cfg, &context).await,
            None => match &self.config.default_webhook {
                Some(cfg) => {
                    let payload = Self::webhook_payload(cfg, &context);
                    webhook::send(&self.http, cfg, &payload).await
                }
                None => Err(ReminderError::Configuration(
                    "任务未指定渠道且未配置默认Webhook".to_string(),
                )),
            },
        }
    }
}

/// 计算第attempt次失败后的退避时长（attempt从1开始）
fn backoff_delay(retry: &RetryConfig, attempt: u32) -> Duration {
    let base = retry.base_interval_ms as f64;
    let raw = base * retry.multiplier.powi(attempt.saturating_sub(1) as i32);
    let capped = raw.min(retry.max_interval_ms as f64);
    let jitter = capped * retry.jitter_factor * (rand::random::<f64>() - 0.5) * 2.0;
    Duration::from_millis((capped + jitter).max(0.0) as u64)
}

#[async_trait]
impl Notifier for NotificationDispatcher {
    async fn deliver(&self, task: &Task) -> Result<()> {
        let retry = &self.config.retry;
        let attempt_timeout = Duration::from_secs(retry.attempt_timeout_seconds);
        let mut last_err = None;

        for attempt in 1..=retry.max_attempts {
            let result = tokio::time::timeout(attempt_timeout, self.attempt(task)).await;
            let err = match result {
                Ok(Ok(())) => {
                    debug!("任务 {} 第{}次尝试投递成功", task.id, attempt);
                    return Ok(());
                }
                Ok(Err(e)) => e,
                Err(_) => ReminderError::Channel(format!(
                    "投递超时（{}秒）",
                    retry.attempt_timeout_seconds
                )),
            };

            warn!(
                "任务 {} 第{}次投递失败: {}",
                task.id, attempt, err
            );
            last_err = Some(err);
            if attempt < retry.max_attempts {
                tokio::time::sleep(backoff_delay(retry, attempt)).await;
            }
        }

        Err(last_err
            .unwrap_or_else(|| ReminderError::Internal("重试循环未执行".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reminder_core::models::ScheduleSpec;
    use serde_json::json;

    fn task_with_targets(chat: Option<&str>, user: Option<&str>) -> Task {
        let mut task = Task::new(
            "喝水提醒",
            "该喝水了",
            ScheduleSpec::Countdown {
                duration: "1h".to_string(),
            },
        );
        task.target_chat_id = chat.map(str::to_string);
        task.triggering_user_id = user.map(str::to_string);
        task
    }

    #[test]
    fn test_context_for_group_mention() {
        let mut task = task_with_targets(Some("88@chatroom"), Some("u-1"));
        task.mention_user_nickname = Some("张三".to_string());

        let context = NotificationDispatcher::build_context(&task).unwrap();
        assert_eq!(context.recipient, "88@chatroom");
        assert_eq!(context.content, "@张三 该喝水了");
        assert_eq!(context.at_list, vec!["u-1".to_string()]);
        assert_eq!(context.vars["base_content"], "该喝水了");
        assert_eq!(context.vars["mention_nickname"], "张三");
    }

    #[test]
    fn test_context_for_private_chat_has_no_mention() {
        let mut task = task_with_targets(None, Some("u-1"));
        task.mention_user_nickname = Some("张三".to_string());

        let context = NotificationDispatcher::build_context(&task).unwrap();
        assert_eq!(context.recipient, "u-1");
        assert_eq!(context.content, "该喝水了");
        assert!(context.at_list.is_empty());
    }

    #[test]
    fn test_context_without_recipient_is_error() {
        let task = task_with_targets(None, None);
        let err = NotificationDispatcher::build_context(&task).unwrap_err();
        assert!(matches!(err, ReminderError::Channel(_)));
    }

    #[test]
    fn test_webhook_payload_defaults_to_builtin_format() {
        let task = task_with_targets(Some("88@chatroom"), Some("u-1"));
        let context = NotificationDispatcher::build_context(&task).unwrap();
        let config = WebhookConfig {
            url: "http://localhost/hook".to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            payload_template: None,
        };

        let payload = NotificationDispatcher::webhook_payload(&config, &context);
        assert_eq!(payload["MsgItem"][0]["ToUserName"], "88@chatroom");
        assert_eq!(payload["MsgItem"][0]["TextContent"], "该喝水了");
    }

    #[test]
    fn test_webhook_payload_renders_template() {
        let task = task_with_targets(None, Some("u-1"));
        let context = NotificationDispatcher::build_context(&task).unwrap();
        let config = WebhookConfig {
            url: "http://localhost/hook".to_string(),
            method: "POST".to_string(),
            headers: HashMap::new(),
            payload_template: Some(json!({
                "to": "{user_id}",
                "text": "{{task_name}}: {{content}}",
            })),
        };

        let payload = NotificationDispatcher::webhook_payload(&config, &context);
        assert_eq!(payload["to"], "u-1");
        assert_eq!(payload["text"], "喝水提醒: 该喝水了");
    }

    #[test]
    fn test_backoff_grows_and_respects_cap() {
        let retry = RetryConfig {
            max_attempts: 5,
            base_interval_ms: 500,
            max_interval_ms: 30_000,
            multiplier: 2.0,
            jitter_factor: 0.1,
            attempt_timeout_seconds: 30,
        };

        // 第n次退避的理论值为 500 * 2^(n-1)，抖动幅度±10%
        for (attempt, expected) in [(1u32, 500.0), (2, 1000.0), (3, 2000.0)] {
            let delay = backoff_delay(&retry, attempt).as_millis() as f64;
            assert!(delay >= expected * 0.9 && delay <= expected * 1.1);
        }

        // 足够大的次数被上限截断
        let delay = backoff_delay(&retry, 10).as_millis() as f64;
        assert!(delay >= 27_000.0 && delay <= 33_000.0);
    }

    #[tokio::test]
    async fn test_email_channel_without_mailer_is_configuration_error() {
        let dispatcher = NotificationDispatcher::new(NotifierConfig::default()).unwrap();
        let mut task = task_with_targets(None, Some("u-1"));
        task.channel = Some(ChannelSpec::Email(EmailConfig {
            subject: "提醒".to_string(),
            recipient: "user@example.com".to_string(),
        }));

        let err = dispatcher.attempt(&task).await.unwrap_err();
        assert!(matches!(err, ReminderError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_no_channel_without_default_webhook_is_configuration_error() {
        let dispatcher = NotificationDispatcher::new(NotifierConfig::default()).unwrap();
        let task = task_with_targets(None, Some("u-1"));

        let err = dispatcher.attempt(&task).await.unwrap_err();
        assert!(matches!(err, ReminderError::Configuration(_)));
    }
}
