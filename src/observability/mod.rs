//! 可观测性：tracing 订阅器初始化
//!
//! RUST_LOG 优先，否则使用 [logging].level；format = "json" 时输出结构化 JSON 行。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingSection;

/// 安装全局 subscriber；重复调用时忽略（测试中多次初始化不会 panic）
pub fn init(logging: &LoggingSection) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);
    let result = if logging.is_json() {
        registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        registry.with(fmt::layer().with_target(true)).try_init()
    };

    if let Err(e) = result {
        eprintln!("tracing subscriber already set: {e}");
    }
}
