//! 模拟投递
//!
//! 代替真实的下游服务商。`DeliverySimulator` 是可替换的抽象，
//! 默认的 `FlakySimulator` 以固定概率随机成功，`ScriptedSimulator` 按预设脚本返回结果。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::channels::ChannelKind;
use crate::error::{DispatchError, Result};
use dispatch_shared::config::SimulatorConfig;

/// 单次投递尝试的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Failed(String),
}

impl DeliveryOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed(reason.into())
    }

    pub fn is_delivered(&self) -> bool {
        matches!(self, Self::Delivered)
    }
}

/// 投递模拟器
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DeliverySimulator: Send + Sync {
    /// 对指定渠道发起一次投递
    async fn attempt_deliver(
        &self,
        kind: ChannelKind,
        message: &str,
        recipient: &str,
    ) -> DeliveryOutcome;
}

// ---------------------------------------------------------------------------
// 随机模拟器
// ---------------------------------------------------------------------------

/// 不稳定的下游服务商
///
/// 每次投递内部最多探测 `probes` 次，每次探测以 `success_probability` 独立成功，
/// 任一探测成功即视为投递成功。
pub struct FlakySimulator {
    probes: u32,
    success_probability: f64,
    rng: Mutex<StdRng>,
}

impl FlakySimulator {
    pub const DEFAULT_PROBES: u32 = 3;
    pub const DEFAULT_SUCCESS_PROBABILITY: f64 = 0.2;

    /// 探测次数必须大于 0，成功概率必须是 [0, 1] 内的有限值
    pub fn new(probes: u32, success_probability: f64, seed: Option<u64>) -> Result<Self> {
        if probes == 0 {
            return Err(DispatchError::InvalidSimulatorConfig {
                field: "probes",
                message: "必须大于 0".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&success_probability) {
            return Err(DispatchError::InvalidSimulatorConfig {
                field: "success_probability",
                message: format!("必须在 [0, 1] 区间内, 实际为 {success_probability}"),
            });
        }

        Ok(Self::build(probes, success_probability, seed))
    }

    pub fn from_config(config: &SimulatorConfig) -> Result<Self> {
        Self::new(config.probes, config.success_probability, config.seed)
    }

    fn build(probes: u32, success_probability: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            probes,
            success_probability,
            rng: Mutex::new(rng),
        }
    }

    pub fn probes(&self) -> u32 {
        self.probes
    }

    pub fn success_probability(&self) -> f64 {
        self.success_probability
    }

    fn probe(&self) -> bool {
        self.rng.lock().random_bool(self.success_probability)
    }
}

impl Default for FlakySimulator {
    fn default() -> Self {
        Self::build(
            Self::DEFAULT_PROBES,
            Self::DEFAULT_SUCCESS_PROBABILITY,
            None,
        )
    }
}

#[async_trait]
impl DeliverySimulator for FlakySimulator {
    async fn attempt_deliver(
        &self,
        kind: ChannelKind,
        message: &str,
        recipient: &str,
    ) -> DeliveryOutcome {
        for probe in 1..=self.probes {
            if self.probe() {
                debug!(channel = %kind, recipient, probe, "模拟投递成功");
                return DeliveryOutcome::Delivered;
            }
        }

        debug!(channel = %kind, recipient, probes = self.probes, "模拟投递失败");
        DeliveryOutcome::failed(format!("{kind} sent to {recipient}: {message}"))
    }
}

// ---------------------------------------------------------------------------
// 脚本模拟器
// ---------------------------------------------------------------------------

/// 按预设脚本依次返回结果，脚本用尽后返回 `fallback`
pub struct ScriptedSimulator {
    script: Mutex<VecDeque<DeliveryOutcome>>,
    fallback: DeliveryOutcome,
    calls: AtomicU32,
}

impl ScriptedSimulator {
    pub fn new(script: impl IntoIterator<Item = DeliveryOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: DeliveryOutcome::failed("脚本已用尽"),
            calls: AtomicU32::new(0),
        }
    }

    /// 每次都返回同一结果
    pub fn always(outcome: DeliveryOutcome) -> Self {
        Self::new(Vec::new()).with_fallback(outcome)
    }

    /// 先失败 `failures` 次，之后一直成功
    pub fn fail_then_deliver(failures: u32) -> Self {
        let script = (1..=failures).map(|n| DeliveryOutcome::failed(format!("预设失败 #{n}")));
        Self::new(script).with_fallback(DeliveryOutcome::Delivered)
    }

    pub fn with_fallback(mut self, fallback: DeliveryOutcome) -> Self {
        self.fallback = fallback;
        self
    }

    /// 已被调用的次数
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliverySimulator for ScriptedSimulator {
    async fn attempt_deliver(
        &self,
        _kind: ChannelKind,
        _message: &str,
        _recipient: &str,
    ) -> DeliveryOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }
}
