//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `TRIP__*` 覆盖（双下划线表示嵌套，如 `TRIP__LLM__PROVIDER=openai`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub orchestrator: OrchestratorSection,
    pub llm: LlmSection,
    pub tools: ToolsSection,
    pub server: ServerSection,
    pub logging: LoggingSection,
}

/// [app] 段：应用名与版本（agent card / health 使用）
#[derive(Debug, Clone, Deserialize)]
pub struct AppSection {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            version: default_version(),
        }
    }
}

fn default_app_name() -> String {
    "Trip Planner".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// [orchestrator] 段：步数上限与历史保留
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    /// 单轮最多规划步数
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    /// get_history 未指定 limit 时的默认值
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    /// 每个会话保留的最多历史记录条数，超出剪掉最旧的
    #[serde(default = "default_max_history_records")]
    pub max_history_records: usize,
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            history_limit: default_history_limit(),
            max_history_records: default_max_history_records(),
        }
    }
}

fn default_max_steps() -> usize {
    10
}

fn default_history_limit() -> usize {
    20
}

fn default_max_history_records() -> usize {
    200
}

/// [llm] 段：后端选择与超时
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSection {
    /// 后端：mock / openai；openai 还需要 OPENAI_API_KEY
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeouts: LlmTimeoutsSection,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            base_url: None,
            timeouts: LlmTimeoutsSection::default(),
        }
    }
}

fn default_provider() -> String {
    "mock".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmTimeoutsSection {
    #[serde(default = "default_request_timeout")]
    pub request: u64,
}

impl Default for LlmTimeoutsSection {
    fn default() -> Self {
        Self {
            request: default_request_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    60
}

/// [tools] 段：工具超时
#[derive(Debug, Clone, Deserialize)]
pub struct ToolsSection {
    /// 单次工具调用超时（秒）
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,
}

impl Default for ToolsSection {
    fn default() -> Self {
        Self {
            tool_timeout_secs: default_tool_timeout_secs(),
        }
    }
}

fn default_tool_timeout_secs() -> u64 {
    10
}

/// [server] 段：HTTP 监听地址、路由前缀与 CORS 白名单
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            api_prefix: default_api_prefix(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

impl ServerSection {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_api_prefix() -> String {
    "/api".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

/// [logging] 段：日志级别与输出格式（pretty / json）
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LoggingSection {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// 从 config 目录加载配置，环境变量 TRIP__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml、default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 TRIP__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    let default_names = ["config/default", "../config/default", "default"];
    for name in default_names {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("TRIP")
            .separator("__")
            .try_parsing(true),
    );

    let c = builder.build()?;
    c.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.orchestrator.max_steps, 10);
        assert_eq!(cfg.orchestrator.history_limit, 20);
        assert_eq!(cfg.tools.tool_timeout_secs, 10);
        assert_eq!(cfg.server.port, 8000);
        assert_eq!(cfg.server.api_prefix, "/api");
        assert_eq!(cfg.llm.provider, "mock");
        assert!(!cfg.logging.is_json());
    }

    #[test]
    fn test_explicit_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[orchestrator]\nmax_steps = 4\n\n[server]\nport = 9100\n\n[logging]\nformat = \"json\""
        )
        .unwrap();

        let cfg = load_config(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(cfg.orchestrator.max_steps, 4);
        assert_eq!(cfg.server.port, 9100);
        assert!(cfg.logging.is_json());
        // 未出现的段落保持默认
        assert_eq!(cfg.tools.tool_timeout_secs, 10);
    }

    #[test]
    fn test_missing_explicit_file_is_ignored() {
        let cfg = load_config(Some(PathBuf::from("/definitely/not/here.toml"))).unwrap();
        assert!(cfg.orchestrator.max_steps > 0);
    }
}
