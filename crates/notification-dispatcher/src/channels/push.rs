//! App 推送通知渠道

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ChannelKind, ChannelSender};
use crate::simulator::{DeliveryOutcome, DeliverySimulator};

/// App 推送通知渠道
///
/// 生产环境中替换为 APNs / FCM 等推送服务的 SDK 调用
pub struct PushChannel {
    device_token: String,
    transport: Arc<dyn DeliverySimulator>,
}

impl PushChannel {
    pub fn new(device_token: impl Into<String>, transport: Arc<dyn DeliverySimulator>) -> Self {
        Self {
            device_token: device_token.into(),
            transport,
        }
    }
}

#[async_trait]
impl ChannelSender for PushChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Push
    }

    fn address(&self) -> &str {
        &self.device_token
    }

    async fn deliver(&self, message: &str, recipient: &str) -> DeliveryOutcome {
        debug!(device_token = %self.device_token, recipient, "推送发送中...");
        self.transport
            .attempt_deliver(self.kind(), message, recipient)
            .await
    }
}
