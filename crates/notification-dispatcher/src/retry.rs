//! 重试状态机
//!
//! 记录单个渠道实例的尝试次数、预算、创建时间与成功时间，并约束状态迁移：
//!
//! ```text
//! Pending -> Sending -> Succeeded
//!               |-----> RetryPending -> Sending
//!               |-----> Exhausted
//! ```
//!
//! 状态机本身不做 I/O、不读时钟（成功时间由调用方传入），
//! 是否在重试之间等待、何时强制终止都由驱动方决定。

use std::num::NonZeroU32;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{DispatchError, Result};
use crate::simulator::DeliveryOutcome;

/// 重试状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryPhase {
    /// 尚未发起任何尝试
    Pending,
    /// 一次尝试正在进行
    Sending,
    /// 上次尝试失败，仍有剩余预算
    RetryPending,
    /// 投递成功
    Succeeded,
    /// 预算耗尽或被强制终止
    Exhausted,
}

impl RetryPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Exhausted)
    }
}

impl std::fmt::Display for RetryPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Sending => write!(f, "sending"),
            Self::RetryPending => write!(f, "retry_pending"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Exhausted => write!(f, "exhausted"),
        }
    }
}

/// 进入 Exhausted 的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCause {
    /// 尝试次数用尽
    BudgetExhausted,
    /// 超过截止时间被强制终止
    DeadlineExceeded,
}

/// 渠道实例的重试与时间元数据
///
/// 不变量：`attempts_made <= max_attempts`；`sent_at` 仅在首次成功时写入一次；
/// `termination_cause` 仅在进入 Exhausted 时写入一次。
#[derive(Debug, Clone)]
pub struct RetryState {
    phase: RetryPhase,
    attempts_made: u32,
    max_attempts: NonZeroU32,
    created_at: DateTime<Utc>,
    sent_at: Option<DateTime<Utc>>,
    termination_cause: Option<TerminationCause>,
}

impl RetryState {
    pub fn new(max_attempts: NonZeroU32) -> Self {
        Self::with_created_at(max_attempts, Utc::now())
    }

    pub fn with_created_at(max_attempts: NonZeroU32, created_at: DateTime<Utc>) -> Self {
        Self {
            phase: RetryPhase::Pending,
            attempts_made: 0,
            max_attempts,
            created_at,
            sent_at: None,
            termination_cause: None,
        }
    }

    pub fn phase(&self) -> RetryPhase {
        self.phase
    }

    pub fn attempts_made(&self) -> u32 {
        self.attempts_made
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.get()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        self.sent_at
    }

    /// Exhausted 时的终止原因，其余状态为 `None`
    pub fn termination_cause(&self) -> Option<TerminationCause> {
        self.termination_cause
    }

    pub fn remaining_attempts(&self) -> u32 {
        self.max_attempts() - self.attempts_made
    }

    /// 是否还能再发起一次尝试
    pub fn can_retry(&self) -> bool {
        !self.phase.is_terminal() && self.attempts_made < self.max_attempts()
    }

    /// 进入 Sending，返回本次尝试的序号（从 1 开始）
    pub fn begin_attempt(&mut self) -> Result<u32> {
        match self.phase {
            RetryPhase::Pending | RetryPhase::RetryPending if self.can_retry() => {
                self.phase = RetryPhase::Sending;
                self.attempts_made += 1;
                Ok(self.attempts_made)
            }
            from => Err(DispatchError::InvalidTransition {
                from,
                event: "begin_attempt",
            }),
        }
    }

    /// 记录进行中尝试的结果，返回迁移后的状态
    pub fn record_outcome(
        &mut self,
        outcome: &DeliveryOutcome,
        now: DateTime<Utc>,
    ) -> Result<RetryPhase> {
        if self.phase != RetryPhase::Sending {
            return Err(DispatchError::InvalidTransition {
                from: self.phase,
                event: "record_outcome",
            });
        }

        self.phase = match outcome {
            DeliveryOutcome::Delivered => {
                self.sent_at = Some(now);
                RetryPhase::Succeeded
            }
            DeliveryOutcome::Failed(_) if self.attempts_made < self.max_attempts() => {
                RetryPhase::RetryPending
            }
            DeliveryOutcome::Failed(_) => {
                self.termination_cause = Some(TerminationCause::BudgetExhausted);
                RetryPhase::Exhausted
            }
        };

        Ok(self.phase)
    }

    /// 强制终止（例如超过截止时间），已成功的实例不可被终止
    ///
    /// 已处于 Exhausted 的实例保持原有的终止原因。
    pub fn force_exhausted(&mut self, cause: TerminationCause) -> Result<()> {
        match self.phase {
            RetryPhase::Succeeded => Err(DispatchError::InvalidTransition {
                from: RetryPhase::Succeeded,
                event: "force_exhausted",
            }),
            RetryPhase::Exhausted => Ok(()),
            _ => {
                self.phase = RetryPhase::Exhausted;
                self.termination_cause = Some(cause);
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(n: u32) -> NonZeroU32 {
        NonZeroU32::new(n).unwrap()
    }

    fn failed() -> DeliveryOutcome {
        DeliveryOutcome::failed("模拟失败")
    }

    #[test]
    fn test_initial_state() {
        let state = RetryState::new(budget(3));
        assert_eq!(state.phase(), RetryPhase::Pending);
        assert_eq!(state.attempts_made(), 0);
        assert_eq!(state.max_attempts(), 3);
        assert_eq!(state.remaining_attempts(), 3);
        assert!(state.sent_at().is_none());
        assert!(state.termination_cause().is_none());
        assert!(state.can_retry());
    }

    #[test]
    fn test_success_on_first_attempt() {
        let mut state = RetryState::new(budget(3));
        let now = Utc::now();

        assert_eq!(state.begin_attempt().unwrap(), 1);
        assert_eq!(state.phase(), RetryPhase::Sending);

        let phase = state.record_outcome(&DeliveryOutcome::Delivered, now).unwrap();
        assert_eq!(phase, RetryPhase::Succeeded);
        assert_eq!(state.sent_at(), Some(now));
        assert_eq!(state.attempts_made(), 1);
        assert!(!state.can_retry());
    }

    #[test]
    fn test_failures_until_exhausted() {
        let mut state = RetryState::new(budget(2));

        state.begin_attempt().unwrap();
        assert_eq!(
            state.record_outcome(&failed(), Utc::now()).unwrap(),
            RetryPhase::RetryPending
        );

        state.begin_attempt().unwrap();
        assert_eq!(
            state.record_outcome(&failed(), Utc::now()).unwrap(),
            RetryPhase::Exhausted
        );

        assert_eq!(state.attempts_made(), 2);
        assert_eq!(state.remaining_attempts(), 0);
        assert!(state.sent_at().is_none());
        assert_eq!(
            state.termination_cause(),
            Some(TerminationCause::BudgetExhausted)
        );
    }

    #[test]
    fn test_single_attempt_budget_exhausts_immediately() {
        let mut state = RetryState::new(budget(1));
        state.begin_attempt().unwrap();
        assert_eq!(
            state.record_outcome(&failed(), Utc::now()).unwrap(),
            RetryPhase::Exhausted
        );
    }

    #[test]
    fn test_illegal_transitions() {
        let mut state = RetryState::new(budget(1));

        // 没有进行中的尝试时不能记录结果
        let err = state.record_outcome(&DeliveryOutcome::Delivered, Utc::now());
        assert!(matches!(
            err,
            Err(DispatchError::InvalidTransition {
                from: RetryPhase::Pending,
                ..
            })
        ));

        // 同一尝试不能重复开始
        state.begin_attempt().unwrap();
        assert!(state.begin_attempt().is_err());

        // 终态后不能再开始尝试，尝试次数保持不变
        state.record_outcome(&failed(), Utc::now()).unwrap();
        assert!(state.begin_attempt().is_err());
        assert_eq!(state.attempts_made(), 1);
    }

    #[test]
    fn test_sent_at_written_once() {
        let mut state = RetryState::new(budget(3));
        let first = Utc::now();
        state.begin_attempt().unwrap();
        state.record_outcome(&DeliveryOutcome::Delivered, first).unwrap();

        let later = first + chrono::Duration::seconds(5);
        assert!(state.record_outcome(&DeliveryOutcome::Delivered, later).is_err());
        assert_eq!(state.sent_at(), Some(first));
    }

    #[test]
    fn test_force_exhausted() {
        let mut state = RetryState::new(budget(5));
        state.begin_attempt().unwrap();
        state
            .force_exhausted(TerminationCause::DeadlineExceeded)
            .unwrap();
        assert_eq!(state.phase(), RetryPhase::Exhausted);
        assert_eq!(state.attempts_made(), 1);
        assert_eq!(
            state.termination_cause(),
            Some(TerminationCause::DeadlineExceeded)
        );

        // 已终止的实例重复终止是幂等的，终止原因不被覆盖
        assert!(
            state
                .force_exhausted(TerminationCause::BudgetExhausted)
                .is_ok()
        );
        assert_eq!(
            state.termination_cause(),
            Some(TerminationCause::DeadlineExceeded)
        );

        let mut succeeded = RetryState::new(budget(1));
        succeeded.begin_attempt().unwrap();
        succeeded
            .record_outcome(&DeliveryOutcome::Delivered, Utc::now())
            .unwrap();
        assert!(
            succeeded
                .force_exhausted(TerminationCause::DeadlineExceeded)
                .is_err()
        );
        assert_eq!(succeeded.phase(), RetryPhase::Succeeded);
        assert!(succeeded.termination_cause().is_none());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(RetryPhase::RetryPending.to_string(), "retry_pending");
        assert!(RetryPhase::Exhausted.is_terminal());
        assert!(!RetryPhase::Sending.is_terminal());
    }
}
