use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// 提醒任务定义
///
/// 一个任务携带恰好一种调度规则（倒计时、绝对时间或CRON周期），
/// 以及至多一个显式通知渠道。渠道缺省时投递阶段回退到全局默认Webhook。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// 发起提醒的用户ID
    pub triggering_user_id: Option<String>,
    /// 目标会话ID，缺省时投递给发起用户
    pub target_chat_id: Option<String>,
    /// 群聊场景下被@的昵称
    pub mention_user_nickname: Option<String>,
    /// 提醒正文
    pub reminder_content: String,
    /// 正文是否由外部AI生成（仅作标记，生成过程不在本系统内）
    #[serde(default)]
    pub is_ai_generated: bool,
    pub schedule: ScheduleSpec,
    pub channel: Option<ChannelSpec>,
    pub status: TaskStatus,
    /// 下一次触发时间；仅在待计算或终态时为空
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_error_at: Option<DateTime<Utc>>,
    /// 软删除标记：执行中的任务延迟到结果回写后删除
    #[serde(default)]
    pub pending_delete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// 创建新任务，初始状态为待计算，由生命周期管理器完成首次解析
    pub fn new(name: &str, reminder_content: &str, schedule: ScheduleSpec) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            triggering_user_id: None,
            target_chat_id: None,
            mention_user_nickname: None,
            reminder_content: reminder_content.to_string(),
            is_ai_generated: false,
            schedule,
            channel: None,
            status: TaskStatus::PendingCalculation,
            next_fire_at: None,
            last_error: None,
            last_error_at: None,
            pending_delete: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// 是否为周期任务（CRON规则）
    pub fn is_recurring(&self) -> bool {
        matches!(self.schedule, ScheduleSpec::Cron(_))
    }

    /// 记录失败原因
    pub fn record_error(&mut self, reason: &str) {
        self.last_error = Some(reason.to_string());
        self.last_error_at = Some(Utc::now());
    }

    /// 投递时的实际接收方：目标会话优先，否则回退到发起用户
    pub fn recipient(&self) -> Option<&str> {
        self.target_chat_id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.triggering_user_id.as_deref())
    }

    /// 目标是否为群聊会话
    pub fn is_group_target(&self) -> bool {
        self.target_chat_id
            .as_deref()
            .map(|c| c.contains("@chatroom"))
            .unwrap_or(false)
    }
}

/// 任务状态机
///
/// PendingCalculation → Scheduled → Running → {Scheduled, PendingCalculation, Completed, Failed}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// 待计算：日历数据不足，等待每日维护重新解析
    #[serde(rename = "PENDING_CALCULATION")]
    PendingCalculation,
    /// 待执行：下一次触发时间已确定
    #[serde(rename = "SCHEDULED")]
    Scheduled,
    /// 执行中：已被调度循环认领，正在投递
    #[serde(rename = "RUNNING")]
    Running,
    /// 执行完成
    #[serde(rename = "COMPLETED")]
    Completed,
    /// 失败
    #[serde(rename = "FAILED")]
    Failed,
}

impl TaskStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::PendingCalculation => "待计算",
            TaskStatus::Scheduled => "待执行",
            TaskStatus::Running => "执行中",
            TaskStatus::Completed => "执行完成",
            TaskStatus::Failed => "失败",
        };
        write!(f, "{s}")
    }
}

/// 调度规则，三选一
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScheduleSpec {
    /// 倒计时：创建时间加上 "1d2h3m4s" 形式的时长
    Countdown { duration: String },
    /// 绝对时间一次性触发
    OneTime { fire_at: DateTime<Utc> },
    /// CRON周期规则
    Cron(CronRule),
}

/// CRON周期规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CronRule {
    /// 标准5段或带秒的6段CRON表达式
    pub expression: String,
    /// 有效期起点，之前的候选时间被跳过
    #[serde(default)]
    pub start_time: Option<DateTime<Utc>>,
    /// 有效期终点，之后的候选时间视为耗尽
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    /// 日期类别限制，任一匹配即放行；为空表示不限制
    #[serde(default)]
    pub limit_days: Vec<DayLimit>,
    /// 农历日期限制，与limit_days同时生效
    #[serde(default)]
    pub lunar: Option<LunarRule>,
}

/// 日期类别限制
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayLimit {
    /// 仅工作日
    Workday,
    /// 仅节假日（不含普通周末）
    Holiday,
    /// 仅周末
    Weekend,
    /// 指定星期几，ISO编号1-7
    Weekdays { days: Vec<u8> },
}

/// 农历日期限制：农历月与日同时匹配才触发
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LunarRule {
    pub month: u8,
    pub day: u8,
}

/// 通知渠道配置，二选一
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelSpec {
    Webhook(WebhookConfig),
    Email(EmailConfig),
}

/// Webhook渠道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    /// HTTP方法，缺省POST
    #[serde(default = "default_webhook_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// JSON载荷模板，支持 {{key}} 与 {key} 占位符；缺省使用内置消息格式
    #[serde(default)]
    pub payload_template: Option<Value>,
}

fn default_webhook_method() -> String {
    "POST".to_string()
}

/// 邮件渠道配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    pub subject: String,
    pub recipient: String,
}

/// 单次投递结果
#[derive(Debug, Clone)]
pub enum DeliveryOutcome {
    Delivered,
    Failed { reason: String },
}

/// 对外暴露的任务视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub reminder_content: String,
    pub is_ai_generated: bool,
    pub schedule: ScheduleSpec,
    pub channel: Option<ChannelSpec>,
    pub status: TaskStatus,
    pub status_label: String,
    pub next_fire_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskResponse {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id,
            name: task.name.clone(),
            description: task.description.clone(),
            reminder_content: task.reminder_content.clone(),
            is_ai_generated: task.is_ai_generated,
            schedule: task.schedule.clone(),
            channel: task.channel.clone(),
            status: task.status,
            status_label: task.status.to_string(),
            next_fire_at: task.next_fire_at,
            last_error: task.last_error.clone(),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}
