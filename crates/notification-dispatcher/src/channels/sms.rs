//! SMS 短信通知渠道
//!
//! 当前为模拟实现，生产环境需要接入真实的短信服务。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ChannelKind, ChannelSender};
use crate::simulator::{DeliveryOutcome, DeliverySimulator};

/// SMS 短信通知渠道
pub struct SmsChannel {
    phone_number: String,
    transport: Arc<dyn DeliverySimulator>,
}

impl SmsChannel {
    pub fn new(phone_number: impl Into<String>, transport: Arc<dyn DeliverySimulator>) -> Self {
        Self {
            phone_number: phone_number.into(),
            transport,
        }
    }
}

#[async_trait]
impl ChannelSender for SmsChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    fn address(&self) -> &str {
        &self.phone_number
    }

    async fn deliver(&self, message: &str, recipient: &str) -> DeliveryOutcome {
        debug!(
            phone_number = %self.phone_number,
            recipient,
            content_length = message.chars().count(),
            "SMS 发送中..."
        );
        self.transport
            .attempt_deliver(self.kind(), message, recipient)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::ScriptedSimulator;

    #[tokio::test]
    async fn test_sms_forwards_transport_failure() {
        let transport = Arc::new(ScriptedSimulator::always(DeliveryOutcome::failed(
            "网关繁忙",
        )));
        let channel = SmsChannel::new("091298765432", transport.clone());

        assert_eq!(channel.kind(), ChannelKind::Sms);
        assert_eq!(channel.address(), "091298765432");
        assert_eq!(
            channel.deliver("验证码 1234", "customer-001").await,
            DeliveryOutcome::failed("网关繁忙")
        );
        assert_eq!(transport.calls(), 1);
    }
}
