//! 通知渠道
//!
//! `ChannelSender` 是渠道能力的抽象：报告自己的渠道类型并尝试投递一次消息。
//! 新增渠道只需实现该 trait，分发服务无需改动。
//!
//! ## 支持的渠道
//!
//! - **Email**: 邮件通知
//! - **SMS**: 短信通知
//! - **Push**: App 推送通知

mod email;
mod push;
mod sms;

pub use email::EmailChannel;
pub use push::PushChannel;
pub use sms::SmsChannel;

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DispatchError, Result};
use crate::retry::{RetryPhase, RetryState};
use crate::simulator::{DeliveryOutcome, DeliverySimulator};

/// 渠道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Email,
    Sms,
    Push,
}

impl ChannelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Sms => "sms",
            Self::Push => "push",
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知优先级，仅用于日志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// 渠道能力 trait
///
/// 实现不得修改全局状态，副作用仅限于一次（模拟的）投递调用。
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// 渠道类型标识
    fn kind(&self) -> ChannelKind;

    /// 渠道自身的地址（邮箱、手机号或设备 token）
    fn address(&self) -> &str;

    /// 尝试投递一次
    async fn deliver(&self, message: &str, recipient: &str) -> DeliveryOutcome;
}

/// 渠道实例
///
/// 由渠道能力、优先级和重试元数据组合而成。一个实例只服务于一次分发，
/// 分发期间由分发服务独占借用。
pub struct Channel {
    sender: Box<dyn ChannelSender>,
    priority: Priority,
    retry: RetryState,
}

impl Channel {
    /// 创建渠道实例，`max_attempts` 为 0 时直接返回配置错误
    pub fn new(
        sender: impl ChannelSender + 'static,
        priority: Priority,
        max_attempts: u32,
    ) -> Result<Self> {
        let max_attempts = NonZeroU32::new(max_attempts)
            .ok_or(DispatchError::InvalidAttemptBudget {
                channel: sender.kind(),
            })?;

        Ok(Self {
            sender: Box::new(sender),
            priority,
            retry: RetryState::new(max_attempts),
        })
    }

    pub fn email(
        email_address: impl Into<String>,
        priority: Priority,
        max_attempts: u32,
        transport: Arc<dyn DeliverySimulator>,
    ) -> Result<Self> {
        Self::new(EmailChannel::new(email_address, transport), priority, max_attempts)
    }

    pub fn sms(
        phone_number: impl Into<String>,
        priority: Priority,
        max_attempts: u32,
        transport: Arc<dyn DeliverySimulator>,
    ) -> Result<Self> {
        Self::new(SmsChannel::new(phone_number, transport), priority, max_attempts)
    }

    pub fn push(
        device_token: impl Into<String>,
        priority: Priority,
        max_attempts: u32,
        transport: Arc<dyn DeliverySimulator>,
    ) -> Result<Self> {
        Self::new(PushChannel::new(device_token, transport), priority, max_attempts)
    }

    /// 按渠道类型创建实例
    pub fn for_kind(
        kind: ChannelKind,
        address: impl Into<String>,
        priority: Priority,
        max_attempts: u32,
        transport: Arc<dyn DeliverySimulator>,
    ) -> Result<Self> {
        match kind {
            ChannelKind::Email => Self::email(address, priority, max_attempts, transport),
            ChannelKind::Sms => Self::sms(address, priority, max_attempts, transport),
            ChannelKind::Push => Self::push(address, priority, max_attempts, transport),
        }
    }

    pub fn kind(&self) -> ChannelKind {
        self.sender.kind()
    }

    pub fn address(&self) -> &str {
        self.sender.address()
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn phase(&self) -> RetryPhase {
        self.retry.phase()
    }

    pub fn attempts_made(&self) -> u32 {
        self.retry.attempts_made()
    }

    pub fn max_attempts(&self) -> u32 {
        self.retry.max_attempts()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.retry.created_at()
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.retry.sent_at()
    }

    pub fn retry_state(&self) -> &RetryState {
        &self.retry
    }

    pub(crate) fn sender(&self) -> &dyn ChannelSender {
        self.sender.as_ref()
    }

    pub(crate) fn retry_mut(&mut self) -> &mut RetryState {
        &mut self.retry
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("kind", &self.kind())
            .field("address", &self.address())
            .field("priority", &self.priority)
            .field("retry", &self.retry)
            .finish()
    }
}
