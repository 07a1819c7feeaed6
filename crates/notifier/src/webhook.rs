//! Webhook传输
//!
//! 任务或全局默认Webhook的HTTP投递。无载荷模板时合成内置消息格式。

use serde_json::{json, Value};
use tracing::debug;

use reminder_core::models::WebhookConfig;
use reminder_core::{ReminderError, Result};

/// 发送Webhook请求
///
/// POST以JSON为请求体；GET把载荷顶层标量摊平为查询参数。
/// 非2xx状态码视为渠道错误。
pub async fn send(client: &reqwest::Client, config: &WebhookConfig, payload: &Value) -> Result<()> {
    let method = config.method.to_uppercase();
    let mut request = match method.as_str() {
        "POST" => client.post(&config.url).json(payload),
        "GET" => client.get(&config.url).query(&flatten_query(payload)),
        other => {
            return Err(ReminderError::Channel(format!(
                "不支持的Webhook方法: {other}"
            )))
        }
    };
    for (key, value) in &config.headers {
        request = request.header(key, value);
    }

    debug!("发送Webhook: {} {}", method, config.url);
    let response = request
        .send()
        .await
        .map_err(|e| ReminderError::Channel(format!("Webhook请求失败: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ReminderError::Channel(format!(
            "Webhook返回异常状态: {status}"
        )));
    }
    Ok(())
}

/// 无模板时的内置消息载荷
pub fn default_payload(recipient: &str, content: &str, at_list: &[String]) -> Value {
    json!({
        "MsgItem": [{
            "ToUserName": recipient,
            "TextContent": content,
            "MsgType": 1,
            "AtWxIDList": at_list,
        }]
    })
}

fn flatten_query(payload: &Value) -> Vec<(String, String)> {
    let mut query = Vec::new();
    if let Value::Object(map) = payload {
        for (key, value) in map {
            match value {
                Value::String(s) => query.push((key.clone(), s.clone())),
                Value::Number(n) => query.push((key.clone(), n.to_string())),
                Value::Bool(b) => query.push((key.clone(), b.to_string())),
                _ => {}
            }
        }
    }
    query
}
