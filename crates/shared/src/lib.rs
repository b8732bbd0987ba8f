//! 共享库
//!
//! 包含通知分发服务共用的配置加载与日志初始化等基础设施代码。

pub mod config;
pub mod observability;
