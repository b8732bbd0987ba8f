//! 通知分发错误类型
//!
//! 单次投递失败由 `DeliveryOutcome::Failed` 表达并在重试循环内消化，
//! 这里只描述终态结果（预算耗尽、超时）与构造期的参数错误，
//! 便于上层决定是否改用其他渠道重新分发。

use thiserror::Error;

use crate::channels::ChannelKind;
use crate::retry::RetryPhase;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("重试次数已耗尽: 渠道={channel}, 接收方={recipient}, 最大尝试次数={max_attempts}")]
    RetriesExhausted {
        channel: ChannelKind,
        recipient: String,
        max_attempts: u32,
    },

    #[error("分发超时: 渠道={channel}, 接收方={recipient}, 已尝试次数={attempts_made}")]
    DeadlineExceeded {
        channel: ChannelKind,
        recipient: String,
        attempts_made: u32,
    },

    #[error("无效的尝试次数预算: 渠道={channel}, max_attempts 必须大于 0")]
    InvalidAttemptBudget { channel: ChannelKind },

    #[error("无效的模拟器参数: {field}, {message}")]
    InvalidSimulatorConfig {
        field: &'static str,
        message: String,
    },

    #[error("非法状态迁移: 状态={from}, 事件={event}")]
    InvalidTransition {
        from: RetryPhase,
        event: &'static str,
    },
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, DispatchError>;

impl DispatchError {
    /// 获取错误码
    pub fn code(&self) -> &'static str {
        match self {
            Self::RetriesExhausted { .. } => "RETRIES_EXHAUSTED",
            Self::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            Self::InvalidAttemptBudget { .. } => "INVALID_ATTEMPT_BUDGET",
            Self::InvalidSimulatorConfig { .. } => "INVALID_SIMULATOR_CONFIG",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
        }
    }
}
