//! SMTP邮件传输

use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use reminder_core::config::MailConfig;
use reminder_core::{ReminderError, Result};

/// 邮件发送器
///
/// 465端口走隐式TLS，其余端口走STARTTLS。
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    sender: Mailbox,
}

impl Mailer {
    pub fn new(config: &MailConfig) -> Result<Self> {
        let credentials = Credentials::new(config.username.clone(), config.password.clone());
        let builder = if config.port == 465 {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.server)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.server)
        }
        .map_err(|e| ReminderError::Configuration(format!("SMTP服务器配置无效: {e}")))?;

        let transport = builder.credentials(credentials).port(config.port).build();
        let sender = config
            .sender
            .parse::<Mailbox>()
            .map_err(|e| ReminderError::Configuration(format!("发件人地址无效: {e}")))?;
        Ok(Self { transport, sender })
    }

    pub async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<()> {
        let to = recipient
            .parse::<Mailbox>()
            .map_err(|e| ReminderError::Channel(format!("收件人地址无效: {recipient} - {e}")))?;
        let message = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(subject)
            .body(body.to_string())
            .map_err(|e| ReminderError::Channel(format!("构建邮件失败: {e}")))?;

        debug!("发送邮件: {} -> {}", subject, recipient);
        self.transport
            .send(message)
            .await
            .map_err(|e| ReminderError::Channel(format!("SMTP发送失败: {e}")))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mail_config(port: u16) -> MailConfig {
        MailConfig {
            server: "smtp.example.com".to_string(),
            port,
            username: "bot@example.com".to_string(),
            password: "secret".to_string(),
            sender: "提醒服务 <bot@example.com>".to_string(),
        }
    }

    #[test]
    fn test_mailer_accepts_both_tls_modes() {
        assert!(Mailer::new(&mail_config(465)).is_ok());
        assert!(Mailer::new(&mail_config(587)).is_ok());
    }

    #[test]
    fn test_invalid_sender_rejected() {
        let mut config = mail_config(465);
        config.sender = "不是邮箱".to_string();
        assert!(matches!(
            Mailer::new(&config),
            Err(ReminderError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_channel_error() {
        let mailer = Mailer::new(&mail_config(465)).unwrap();
        let err = mailer.send("没有At符号", "主题", "正文").await.unwrap_err();
        assert!(matches!(err, ReminderError::Channel(_)));
    }
}
