//! 分发服务
//!
//! 对单个渠道实例驱动重试状态机，直到投递成功、预算耗尽或超过截止时间。
//!
//! ## 设计说明
//!
//! - 所有渠道共享同一套重试流程，渠道类型只用于日志
//! - 单次 `send` 在返回前完成全部重试，渠道实例在此期间被独占借用
//! - 互不相关的渠道实例可通过 `send_all` 并发分发
//! - 每次分发生成一个 `dispatch_id`，同时写入日志 span 和返回结果

use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::channels::{Channel, ChannelKind};
use crate::error::{DispatchError, Result};
use crate::retry::{RetryPhase, TerminationCause};
use crate::simulator::DeliveryOutcome;

/// 一次分发的终态结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DispatchResult {
    Success {
        dispatch_id: Uuid,
        sent_at: DateTime<Utc>,
    },
    ExhaustedRetries {
        dispatch_id: Uuid,
        channel_kind: ChannelKind,
        recipient: String,
        max_attempts: u32,
    },
    DeadlineExceeded {
        dispatch_id: Uuid,
        channel_kind: ChannelKind,
        recipient: String,
        attempts_made: u32,
    },
}

impl DispatchResult {
    /// 与日志 span 中 `dispatch_id` 字段一致的分发标识
    pub fn dispatch_id(&self) -> Uuid {
        match self {
            Self::Success { dispatch_id, .. }
            | Self::ExhaustedRetries { dispatch_id, .. }
            | Self::DeadlineExceeded { dispatch_id, .. } => *dispatch_id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Success { sent_at, .. } => Some(*sent_at),
            _ => None,
        }
    }

    /// 转换为 `Result`，便于调用方使用 `?`
    pub fn into_result(self) -> Result<DateTime<Utc>> {
        match self {
            Self::Success { sent_at, .. } => Ok(sent_at),
            Self::ExhaustedRetries {
                channel_kind,
                recipient,
                max_attempts,
                ..
            } => Err(DispatchError::RetriesExhausted {
                channel: channel_kind,
                recipient,
                max_attempts,
            }),
            Self::DeadlineExceeded {
                channel_kind,
                recipient,
                attempts_made,
                ..
            } => Err(DispatchError::DeadlineExceeded {
                channel: channel_kind,
                recipient,
                attempts_made,
            }),
        }
    }
}

/// 分发服务配置
#[derive(Debug, Clone, Default)]
pub struct DispatchConfig {
    /// 单次分发的截止时间，超时后强制终止并返回 `DeadlineExceeded`
    pub deadline: Option<Duration>,
}

impl DispatchConfig {
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

impl From<&dispatch_shared::config::DispatchConfig> for DispatchConfig {
    fn from(config: &dispatch_shared::config::DispatchConfig) -> Self {
        Self {
            deadline: config.deadline(),
        }
    }
}

/// 分发服务
#[derive(Debug, Clone, Default)]
pub struct DispatchService {
    config: DispatchConfig,
}

impl DispatchService {
    pub fn new(config: DispatchConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// 通过指定渠道分发一条消息
    ///
    /// 已处于终态的渠道实例不会再发起尝试，直接返回其终态结果。
    pub async fn send(
        &self,
        channel: &mut Channel,
        message: &str,
        recipient: &str,
    ) -> DispatchResult {
        self.dispatch(Uuid::now_v7(), channel, message, recipient)
            .await
    }

    /// 并发分发到多个互不相关的渠道实例，结果顺序与输入一致
    pub async fn send_all(
        &self,
        channels: &mut [Channel],
        message: &str,
        recipient: &str,
    ) -> Vec<DispatchResult> {
        join_all(
            channels
                .iter_mut()
                .map(|channel| self.send(channel, message, recipient)),
        )
        .await
    }

    #[instrument(
        skip_all,
        fields(
            dispatch_id = %dispatch_id,
            channel = %channel.kind(),
            recipient = %recipient,
            max_attempts = channel.max_attempts()
        )
    )]
    async fn dispatch(
        &self,
        dispatch_id: Uuid,
        channel: &mut Channel,
        message: &str,
        recipient: &str,
    ) -> DispatchResult {
        info!(priority = %channel.priority(), "开始分发通知");

        let Some(deadline) = self.config.deadline else {
            return drive_retries(dispatch_id, channel, message, recipient).await;
        };

        let outcome = tokio::time::timeout(
            deadline,
            drive_retries(dispatch_id, channel, message, recipient),
        )
        .await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                if let Err(e) = channel
                    .retry_mut()
                    .force_exhausted(TerminationCause::DeadlineExceeded)
                {
                    warn!(error = %e, "超时后无法终止渠道状态");
                }
                warn!(
                    deadline_ms = deadline.as_millis() as u64,
                    attempts_made = channel.attempts_made(),
                    "分发超时，放弃剩余尝试"
                );
                settle(dispatch_id, channel, recipient)
            }
        }
    }
}

/// 重试循环：Sending -> (Succeeded | RetryPending | Exhausted)
///
/// RetryPending 后立即进入下一次尝试，不引入等待。
async fn drive_retries(
    dispatch_id: Uuid,
    channel: &mut Channel,
    message: &str,
    recipient: &str,
) -> DispatchResult {
    // 上次分发在尝试过程中被取消，按失败计入
    if channel.phase() == RetryPhase::Sending {
        warn!("检测到未完成的投递尝试，按失败处理");
        let interrupted = DeliveryOutcome::failed("上次投递尝试被中断");
        if let Err(e) = channel.retry_mut().record_outcome(&interrupted, Utc::now()) {
            warn!(error = %e, "记录中断结果失败");
        }
    }

    if channel.phase().is_terminal() {
        warn!(phase = %channel.phase(), "渠道实例已处于终态，不再发起尝试");
        return settle(dispatch_id, channel, recipient);
    }

    loop {
        let attempt = match channel.retry_mut().begin_attempt() {
            Ok(attempt) => attempt,
            Err(e) => {
                warn!(error = %e, "无法发起投递尝试");
                return settle(dispatch_id, channel, recipient);
            }
        };

        let outcome = channel.sender().deliver(message, recipient).await;

        match channel.retry_mut().record_outcome(&outcome, Utc::now()) {
            Ok(RetryPhase::Succeeded) => {
                info!(attempt, "通知投递成功");
                return settle(dispatch_id, channel, recipient);
            }
            Ok(RetryPhase::Exhausted) => {
                warn!(attempt, "已达最大尝试次数，放弃投递");
                return settle(dispatch_id, channel, recipient);
            }
            Ok(_) => {
                if let DeliveryOutcome::Failed(reason) = &outcome {
                    warn!(
                        attempt,
                        remaining = channel.retry_state().remaining_attempts(),
                        reason = %reason,
                        "投递失败，将立即重试"
                    );
                }
            }
            Err(e) => {
                warn!(error = %e, "记录投递结果失败");
                return settle(dispatch_id, channel, recipient);
            }
        }
    }
}

/// 根据渠道终态生成分发结果
///
/// 被截止时间强制终止的实例即使再次分发，也还原为 `DeadlineExceeded`。
fn settle(dispatch_id: Uuid, channel: &Channel, recipient: &str) -> DispatchResult {
    if let Some(sent_at) = channel.sent_at() {
        return DispatchResult::Success {
            dispatch_id,
            sent_at,
        };
    }

    match channel.retry_state().termination_cause() {
        Some(TerminationCause::DeadlineExceeded) => DispatchResult::DeadlineExceeded {
            dispatch_id,
            channel_kind: channel.kind(),
            recipient: recipient.to_string(),
            attempts_made: channel.attempts_made(),
        },
        _ => DispatchResult::ExhaustedRetries {
            dispatch_id,
            channel_kind: channel.kind(),
            recipient: recipient.to_string(),
            max_attempts: channel.max_attempts(),
        },
    }
}
