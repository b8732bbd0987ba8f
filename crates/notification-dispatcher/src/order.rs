//! 订单通知
//!
//! 将订单上下文格式化为通知正文，再交给分发服务投递。
//! 这里不做任何重试，重试完全由 `DispatchService` 负责。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::channels::Channel;
use crate::dispatch::{DispatchResult, DispatchService};

/// 订单就绪通知的固定正文
pub const ORDER_READY_MESSAGE: &str = "your order is ready";

/// 订单上下文，由调用方持有，这里只读取
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// 订单金额，展示时保留两位小数
    pub amount: f64,
    /// 真实的通知接收方
    pub recipient: String,
}

impl Order {
    pub fn new(id: impl Into<String>, amount: f64, recipient: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            amount,
            recipient: recipient.into(),
        }
    }

    /// 订单确认通知正文
    pub fn confirmation_message(&self) -> String {
        format!("Order {} confirmed, amount {:.2}", self.id, self.amount)
    }
}

/// 订单通知发送器
///
/// 封装 DispatchService，提供订单相关的发送接口
#[derive(Debug, Clone)]
pub struct OrderNotifier {
    service: Arc<DispatchService>,
}

impl OrderNotifier {
    pub fn new(service: Arc<DispatchService>) -> Self {
        Self { service }
    }

    /// 发送订单确认通知
    pub async fn notify_confirmed(&self, order: &Order, channel: &mut Channel) -> DispatchResult {
        let message = order.confirmation_message();
        info!(
            order_id = %order.id,
            channel = %channel.kind(),
            "发送订单确认通知"
        );
        self.service.send(channel, &message, &order.recipient).await
    }

    /// 发送订单就绪通知
    pub async fn notify_ready(&self, order: &Order, channel: &mut Channel) -> DispatchResult {
        info!(
            order_id = %order.id,
            channel = %channel.kind(),
            "发送订单就绪通知"
        );
        self.service
            .send(channel, ORDER_READY_MESSAGE, &order.recipient)
            .await
    }
}
