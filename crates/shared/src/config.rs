//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// 日志级别（如 "info", "debug"），RUST_LOG 优先
    pub log_level: String,
    /// 是否输出 JSON 格式日志
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// 分发配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// 单次分发的截止时间（毫秒），为空时不限时
    pub deadline_ms: Option<u64>,
}

impl DispatchConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

/// 模拟投递配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// 每次投递内部的探测次数
    pub probes: u32,
    /// 单次探测成功的概率，取值 [0, 1]
    pub success_probability: f64,
    /// 随机数种子，设置后结果可复现
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            probes: 3,
            success_probability: 0.2,
            seed: None,
        }
    }
}

/// 各渠道的尝试次数预算
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelBudgetConfig {
    pub email_max_attempts: u32,
    pub sms_max_attempts: u32,
    pub push_max_attempts: u32,
}

impl Default for ChannelBudgetConfig {
    fn default() -> Self {
        Self {
            email_max_attempts: 3,
            sms_max_attempts: 5,
            push_max_attempts: 2,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub observability: ObservabilityConfig,
    pub dispatch: DispatchConfig,
    pub simulator: SimulatorConfig,
    pub channels: ChannelBudgetConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            service_name: "notification-dispatcher".to_string(),
            environment: "development".to_string(),
            observability: ObservabilityConfig::default(),
            dispatch: DispatchConfig::default(),
            simulator: SimulatorConfig::default(),
            channels: ChannelBudgetConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 配置目录取自 CONFIG_DIR，缺省为 `config`。
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());
        Self::load_from(Path::new(&config_dir), service_name)
    }

    /// 从指定目录加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（NOTIFY_ 前缀，层级用双下划线，如 NOTIFY_SIMULATOR__PROBES -> simulator.probes）
    pub fn load_from(config_dir: &Path, service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("NOTIFY_ENV").unwrap_or_else(|_| "development".to_string());

        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env.clone())?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{}.toml", env))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{}.toml", service_name))).required(false),
            )
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 在临时目录下创建独立的配置目录，避免测试之间互相影响
    fn temp_config_dir() -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("notify-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.service_name, "notification-dispatcher");
        assert_eq!(config.simulator.probes, 3);
        assert!((config.simulator.success_probability - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.channels.email_max_attempts, 3);
        assert_eq!(config.channels.sms_max_attempts, 5);
        assert_eq!(config.channels.push_max_attempts, 2);
        assert!(config.dispatch.deadline().is_none());
        assert!(!config.is_production());
    }

    #[test]
    fn test_load_without_files_uses_defaults() {
        let dir = temp_config_dir();
        let config = AppConfig::load_from(&dir, "my-dispatcher").unwrap();

        assert_eq!(config.service_name, "my-dispatcher");
        assert_eq!(config.simulator.probes, 3);
        assert_eq!(config.channels.email_max_attempts, 3);
    }

    #[test]
    fn test_load_service_file_overrides_defaults() {
        let dir = temp_config_dir();
        std::fs::write(
            dir.join("default.toml"),
            "[simulator]\nprobes = 4\nseed = 7\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("file-dispatcher.toml"),
            "[simulator]\nprobes = 6\n\n[dispatch]\ndeadline_ms = 250\n",
        )
        .unwrap();

        let config = AppConfig::load_from(&dir, "file-dispatcher").unwrap();

        // 服务特定文件覆盖 default.toml，未覆盖的字段保留
        assert_eq!(config.simulator.probes, 6);
        assert_eq!(config.simulator.seed, Some(7));
        assert_eq!(config.dispatch.deadline(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_env_overrides_nested_field() {
        let dir = temp_config_dir();

        // SAFETY: 该变量仅在本测试中读取
        unsafe {
            std::env::set_var("NOTIFY_CHANNELS__SMS_MAX_ATTEMPTS", "9");
        }

        let config = AppConfig::load_from(&dir, "env-dispatcher");

        unsafe {
            std::env::remove_var("NOTIFY_CHANNELS__SMS_MAX_ATTEMPTS");
        }

        assert_eq!(config.unwrap().channels.sms_max_attempts, 9);
    }
}
