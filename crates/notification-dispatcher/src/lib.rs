//! 通知分发服务
//!
//! 通过邮件、短信、推送等渠道投递消息。每个渠道实例携带独立的尝试次数预算，
//! 分发服务驱动重试状态机直到投递成功或预算耗尽，并返回结构化的分发结果。

pub mod channels;
pub mod dispatch;
pub mod error;
pub mod order;
pub mod retry;
pub mod simulator;

pub use channels::{
    Channel, ChannelKind, ChannelSender, EmailChannel, Priority, PushChannel, SmsChannel,
};
pub use dispatch::{DispatchConfig, DispatchResult, DispatchService};
pub use error::{DispatchError, Result};
pub use order::{Order, OrderNotifier};
pub use retry::{RetryPhase, RetryState, TerminationCause};
pub use simulator::{DeliveryOutcome, DeliverySimulator, FlakySimulator, ScriptedSimulator};
