//! 通知分发演示
//!
//! 为一个订单依次通过邮件、推送、短信渠道发送就绪通知和确认通知，
//! 每次分发使用新的渠道实例，结果以 JSON 写入日志。

use std::sync::Arc;

use anyhow::Context;
use dispatch_shared::config::AppConfig;
use notification_dispatcher::{
    Channel, ChannelKind, DeliverySimulator, DispatchConfig, DispatchResult, DispatchService,
    FlakySimulator, Order, OrderNotifier, Priority,
};
use tracing::info;

const SERVICE_NAME: &str = "notification-dispatcher";

/// 演示用的渠道：类型、地址、优先级、尝试次数预算
struct ChannelSpec {
    kind: ChannelKind,
    address: &'static str,
    priority: Priority,
    max_attempts: u32,
}

fn demo_channels(config: &AppConfig) -> [ChannelSpec; 3] {
    [
        ChannelSpec {
            kind: ChannelKind::Email,
            address: "orders@example.com",
            priority: Priority::Medium,
            max_attempts: config.channels.email_max_attempts,
        },
        ChannelSpec {
            kind: ChannelKind::Push,
            address: "845484856698485",
            priority: Priority::Low,
            max_attempts: config.channels.push_max_attempts,
        },
        ChannelSpec {
            kind: ChannelKind::Sms,
            address: "091298765432",
            priority: Priority::High,
            max_attempts: config.channels.sms_max_attempts,
        },
    ]
}

fn build_channel(
    spec: &ChannelSpec,
    transport: &Arc<dyn DeliverySimulator>,
) -> notification_dispatcher::Result<Channel> {
    Channel::for_kind(
        spec.kind,
        spec.address,
        spec.priority,
        spec.max_attempts,
        transport.clone(),
    )
}

fn report(label: &str, kind: ChannelKind, result: &DispatchResult) -> anyhow::Result<()> {
    let json = serde_json::to_string(result)?;
    info!(label, channel = %kind, result = %json, "分发结果");
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load(SERVICE_NAME).context("加载配置失败")?;
    dispatch_shared::observability::init(&config.service_name, &config.observability)?;

    info!(
        environment = %config.environment,
        probes = config.simulator.probes,
        success_probability = config.simulator.success_probability,
        "Starting notification-dispatcher..."
    );

    let simulator = FlakySimulator::from_config(&config.simulator).context("模拟器参数无效")?;
    let transport: Arc<dyn DeliverySimulator> = Arc::new(simulator);
    let service = Arc::new(DispatchService::new(DispatchConfig::from(&config.dispatch)));
    let notifier = OrderNotifier::new(service);

    let order = Order::new("12345", 100.0, "customer-12345");

    for spec in demo_channels(&config) {
        let mut channel = build_channel(&spec, &transport)?;
        let ready = notifier.notify_ready(&order, &mut channel).await;
        report("order_ready", spec.kind, &ready)?;

        let mut channel = build_channel(&spec, &transport)?;
        let confirmed = notifier.notify_confirmed(&order, &mut channel).await;
        report("order_confirmed", spec.kind, &confirmed)?;
    }

    Ok(())
}
