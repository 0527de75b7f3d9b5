//! 工具参数 JSON Schema 与参数解析
//!
//! 每个工具用一个 `#[derive(Deserialize, JsonSchema)]` 的参数结构体，schemars 生成的 schema 直接给 LLM，
//! 同一个结构体用于反序列化 args，保证 schema 与实际解析一致。

use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// 参数结构体的 JSON Schema
pub fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or_else(|_| {
        serde_json::json!({
            "type": "object",
            "properties": {},
        })
    })
}

/// 将 JSON args 解析为参数结构体，错误信息带上工具名
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, String> {
    serde_json::from_value(args).map_err(|e| format!("Invalid arguments for {tool}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[allow(dead_code)]
    #[derive(Debug, Deserialize, JsonSchema)]
    struct Args {
        /// 城市名
        location: String,
        #[serde(default)]
        limit: Option<usize>,
    }

    #[test]
    fn test_schema_lists_properties() {
        let schema = schema_of::<Args>();
        assert!(schema["properties"]["location"].is_object());
        assert_eq!(schema["required"], serde_json::json!(["location"]));
    }

    #[test]
    fn test_parse_args_error_names_tool() {
        let err = parse_args::<Args>("maps.search_places", serde_json::json!({})).unwrap_err();
        assert!(err.starts_with("Invalid arguments for maps.search_places"));
    }
}
