//! 会话存储
//!
//! conversation_id → Conversation（历史、上下文、状态）。外层 RwLock 只保护映射本身，
//! 每个会话各有一把 tokio Mutex：同一会话的回合串行执行，不同会话可以并发。

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};

use crate::core::TripError;
use crate::memory::Role;

/// 会话历史中的一条记录
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TurnRecord {
    pub role: Role,
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<usize>,
    pub timestamp: DateTime<Utc>,
}

impl TurnRecord {
    pub fn user(content: Value) -> Self {
        Self {
            role: Role::User,
            content,
            agent: None,
            action: None,
            step: None,
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: Value, agent: &str, action: Option<&str>, step: usize) -> Self {
        Self {
            role: Role::Assistant,
            content,
            agent: Some(agent.to_string()),
            action: action.map(String::from),
            step: Some(step),
            timestamp: Utc::now(),
        }
    }
}

/// 单个会话
#[derive(Clone, Debug)]
pub struct Conversation {
    pub id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 跨回合累积的键值上下文
    pub context: Map<String, Value>,
    /// 自由状态（保存 trip_plan 等）
    pub state: Map<String, Value>,
    history: Vec<TurnRecord>,
    max_records: usize,
}

impl Conversation {
    fn new(id: String, user_id: Option<String>, max_records: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            created_at: now,
            updated_at: now,
            context: Map::new(),
            state: Map::new(),
            history: Vec::new(),
            max_records,
        }
    }

    pub fn push(&mut self, record: TurnRecord) {
        self.history.push(record);
        if self.max_records > 0 && self.history.len() > self.max_records {
            let excess = self.history.len() - self.max_records;
            self.history.drain(..excess);
        }
        self.touch();
    }

    pub fn history(&self) -> &[TurnRecord] {
        &self.history
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// get_history 返回的分页视图
#[derive(Clone, Debug, Serialize)]
pub struct ConversationHistory {
    pub conversation_id: String,
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub message_count: usize,
    pub messages: Vec<TurnRecord>,
}

/// 生成会话 ID：conv_ + 8 位十六进制
pub fn new_conversation_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("conv_{}", &id[..8])
}

/// 内存会话存储
pub struct ConversationStore {
    conversations: RwLock<HashMap<String, Arc<Mutex<Conversation>>>>,
    max_records: usize,
}

impl ConversationStore {
    pub fn new(max_records: usize) -> Self {
        Self {
            conversations: RwLock::new(HashMap::new()),
            max_records,
        }
    }

    /// 取已有会话；ID 缺省或未知时新建（未知 ID 沿用调用方给出的值）
    pub async fn open(
        &self,
        conversation_id: Option<&str>,
        user_id: Option<&str>,
    ) -> (String, Arc<Mutex<Conversation>>) {
        if let Some(id) = conversation_id {
            if let Some(existing) = self.conversations.read().await.get(id) {
                return (id.to_string(), existing.clone());
            }
        }

        let id = conversation_id
            .map(String::from)
            .unwrap_or_else(new_conversation_id);
        let mut map = self.conversations.write().await;
        // 两个请求可能同时创建同一 ID，entry 保证只有一个会话
        let handle = map
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(conversation_id = %id, "conversation created");
                Arc::new(Mutex::new(Conversation::new(
                    id.clone(),
                    user_id.map(String::from),
                    self.max_records,
                )))
            })
            .clone();
        (id, handle)
    }

    pub async fn get(&self, conversation_id: &str) -> Option<Arc<Mutex<Conversation>>> {
        self.conversations.read().await.get(conversation_id).cloned()
    }

    /// 分页读取历史；未知 ID 返回 ConversationNotFound
    pub async fn history(
        &self,
        conversation_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<ConversationHistory, TripError> {
        let handle = self
            .get(conversation_id)
            .await
            .ok_or_else(|| TripError::ConversationNotFound(conversation_id.to_string()))?;
        let convo = handle.lock().await;
        let messages = convo
            .history()
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok(ConversationHistory {
            conversation_id: convo.id.clone(),
            user_id: convo.user_id.clone(),
            created_at: convo.created_at,
            updated_at: convo.updated_at,
            message_count: convo.history().len(),
            messages,
        })
    }

    /// 删除会话，存在则返回 true
    pub async fn end(&self, conversation_id: &str) -> bool {
        let removed = self.conversations.write().await.remove(conversation_id).is_some();
        if removed {
            tracing::info!(conversation_id = %conversation_id, "conversation ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.conversations.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_conversation_id_format() {
        let id = new_conversation_id();
        assert!(id.starts_with("conv_"));
        assert_eq!(id.len(), "conv_".len() + 8);
    }

    #[tokio::test]
    async fn test_open_reuses_existing() {
        let store = ConversationStore::new(50);
        let (id, _) = store.open(None, Some("u1")).await;
        let (again, handle) = store.open(Some(&id), None).await;
        assert_eq!(id, again);
        assert_eq!(store.len().await, 1);
        assert_eq!(handle.lock().await.user_id.as_deref(), Some("u1"));
    }

    #[tokio::test]
    async fn test_history_pagination_and_prune() {
        let store = ConversationStore::new(3);
        let (id, handle) = store.open(Some("conv_fixed"), None).await;
        {
            let mut convo = handle.lock().await;
            for i in 0..5 {
                convo.push(TurnRecord::user(json!(i)));
            }
        }
        let history = store.history(&id, 2, 1).await.unwrap();
        assert_eq!(history.message_count, 3);
        // 剪枝后剩 2,3,4；offset 1 取 3,4
        let contents: Vec<_> = history.messages.iter().map(|m| m.content.clone()).collect();
        assert_eq!(contents, vec![json!(3), json!(4)]);
    }

    #[tokio::test]
    async fn test_unknown_history_and_end() {
        let store = ConversationStore::new(10);
        assert!(matches!(
            store.history("nope", 10, 0).await,
            Err(TripError::ConversationNotFound(_))
        ));
        let (id, _) = store.open(None, None).await;
        assert!(store.end(&id).await);
        assert!(!store.end(&id).await);
        assert!(store.is_empty().await);
    }
}
