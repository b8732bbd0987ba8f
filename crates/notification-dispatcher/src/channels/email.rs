//! 邮件通知渠道
//!
//! 当前为模拟实现，投递委托给注入的 `DeliverySimulator`。

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{ChannelKind, ChannelSender};
use crate::simulator::{DeliveryOutcome, DeliverySimulator};

/// 邮件通知渠道
pub struct EmailChannel {
    email_address: String,
    transport: Arc<dyn DeliverySimulator>,
}

impl EmailChannel {
    pub fn new(email_address: impl Into<String>, transport: Arc<dyn DeliverySimulator>) -> Self {
        Self {
            email_address: email_address.into(),
            transport,
        }
    }
}

#[async_trait]
impl ChannelSender for EmailChannel {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Email
    }

    fn address(&self) -> &str {
        &self.email_address
    }

    async fn deliver(&self, message: &str, recipient: &str) -> DeliveryOutcome {
        debug!(
            email_address = %self.email_address,
            recipient,
            "邮件发送中..."
        );
        self.transport
            .attempt_deliver(self.kind(), message, recipient)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::MockDeliverySimulator;

    #[tokio::test]
    async fn test_email_delivers_with_own_kind() {
        let mut transport = MockDeliverySimulator::new();
        transport
            .expect_attempt_deliver()
            .times(1)
            .returning(|kind, _, _| match kind {
                ChannelKind::Email => DeliveryOutcome::Delivered,
                other => DeliveryOutcome::failed(format!("unexpected kind {other}")),
            });

        let channel = EmailChannel::new("ops@example.com", Arc::new(transport));

        assert_eq!(channel.kind(), ChannelKind::Email);
        assert_eq!(channel.address(), "ops@example.com");
        assert_eq!(
            channel.deliver("your order is ready", "customer-001").await,
            DeliveryOutcome::Delivered
        );
    }
}
