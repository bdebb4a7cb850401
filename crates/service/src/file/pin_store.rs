use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::ServiceError;
use crate::storage::json_list_store::JsonListStore;

/// 图钉记录：`id` 与 `replies` 由服务端维护，其余字段完全由调用方决定
/// - id: 按插入顺序分配的连续编号，从 1 开始
/// - fields: 调用方提交的任意 JSON 字段，原样透传（序列化时平铺在顶层）
/// - replies: 回复序列，按追加顺序保存，无自身 id
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Pin {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub replies: Vec<Value>,
}

/// 文件存储：以单个 JSON 文件持久化整块图钉列表
#[derive(Clone)]
pub struct PinStore {
    store: Arc<JsonListStore<Pin>>,
}

impl PinStore {
    /// 初始化存储；文件缺失视为空列表，首次写入时才落盘
    pub async fn new<P: Into<std::path::PathBuf>>(path: P) -> Result<Arc<Self>, ServiceError> {
        let store = JsonListStore::<Pin>::new(path).await?;
        Ok(Arc::new(Self { store }))
    }

    /// 列出全部图钉（插入顺序）
    pub async fn list(&self) -> Vec<Pin> {
        self.store.list().await
    }

    /// 新建图钉：id = 当前数量 + 1，replies 置空，随后整块写盘
    pub async fn create(&self, payload: Map<String, Value>) -> Result<Pin, ServiceError> {
        self.store
            .update(move |pins| {
                let mut fields = payload;
                // id/replies 由服务端赋值；剔除调用方同名键，避免平铺后出现重复字段
                // （shift_remove 保持其余字段的原始顺序）
                fields.shift_remove("id");
                fields.shift_remove("replies");
                let pin = Pin { id: pins.len() as u64 + 1, fields, replies: Vec::new() };
                pins.push(pin.clone());
                Ok(pin)
            })
            .await
    }

    /// 追加回复：按 id 线性查找；找不到时返回 NotFound 且不写盘
    pub async fn add_reply(&self, pin_id: u64, reply: Value) -> Result<Pin, ServiceError> {
        self.store
            .update(move |pins| {
                let pin = pins
                    .iter_mut()
                    .find(|p| p.id == pin_id)
                    .ok_or_else(|| ServiceError::not_found("Pin"))?;
                pin.replies.push(reply);
                Ok(pin.clone())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tmp_path() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pins_{}.json", uuid::Uuid::new_v4()))
    }

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn create_assigns_dense_sequential_ids() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;

        let first = store.create(obj(json!({"text": "hi"}))).await?;
        let second = store.create(obj(json!({"text": "yo"}))).await?;
        let third = store.create(obj(json!({"text": "ok"}))).await?;
        assert_eq!((first.id, second.id, third.id), (1, 2, 3));
        assert!(first.replies.is_empty());

        // the freshly created pin is the last element of the listing
        let pins = store.list().await;
        assert_eq!(pins.len(), 3);
        assert_eq!(pins.last(), Some(&third));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn created_pin_serializes_with_id_first_and_replies_last() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;

        let pin = store.create(obj(json!({"text": "hi"}))).await?;
        assert_eq!(serde_json::to_string(&pin)?, r#"{"id":1,"text":"hi","replies":[]}"#);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn caller_supplied_id_and_replies_are_overwritten() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;

        let pin = store
            .create(obj(json!({"id": 999, "replies": ["bogus"], "text": "t"})))
            .await?;
        assert_eq!(pin.id, 1);
        assert!(pin.replies.is_empty());
        assert_eq!(serde_json::to_value(&pin)?, json!({"id": 1, "text": "t", "replies": []}));

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn add_reply_appends_to_the_target_pin_only() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;
        store.create(obj(json!({"text": "first"}))).await?;
        let second = store.create(obj(json!({"text": "second"}))).await?;

        let updated = store.add_reply(1, json!({"text": "nice"})).await?;
        assert_eq!(updated.id, 1);
        assert_eq!(updated.replies, vec![json!({"text": "nice"})]);

        let updated = store.add_reply(1, json!({"text": "again"})).await?;
        assert_eq!(updated.replies.last(), Some(&json!({"text": "again"})));

        // the other pin is untouched
        let pins = store.list().await;
        assert_eq!(pins[1], second);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn add_reply_unknown_id_leaves_the_file_untouched() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;
        store.create(obj(json!({"text": "only"}))).await?;
        let before = tokio::fs::read(&tmp).await?;

        let res = store.add_reply(99, json!({"text": "??"})).await;
        match res {
            Err(ServiceError::NotFound(msg)) => assert_eq!(msg, "Pin not found"),
            other => panic!("expected NotFound, got {other:?}"),
        }

        let after = tokio::fs::read(&tmp).await?;
        assert_eq!(before, after);
        assert_eq!(store.list().await.len(), 1);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn reopen_reads_back_what_was_written() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;
        store.create(obj(json!({"lat": 48.85, "lng": 2.35, "message": "here"}))).await?;
        store.add_reply(1, json!({"text": "seen"})).await?;

        let reloaded = PinStore::new(&tmp).await?;
        let pins = reloaded.list().await;
        assert_eq!(pins, store.list().await);
        assert_eq!(pins[0].fields.get("message"), Some(&json!("here")));
        assert_eq!(pins[0].replies, vec![json!({"text": "seen"})]);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn caller_field_order_survives_create_and_reload() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;

        // submission order is deliberately not alphabetical, so a store
        // that reorders keys cannot sneak past the exact-string assert
        let pin = store
            .create(obj(json!({"message": "m", "lat": 48.85, "lng": 2.35})))
            .await?;
        let expected = r#"{"id":1,"message":"m","lat":48.85,"lng":2.35,"replies":[]}"#;
        assert_eq!(serde_json::to_string(&pin)?, expected);

        // reloading from disk must not reorder the keys either
        let reloaded = PinStore::new(&tmp).await?;
        assert_eq!(serde_json::to_string(&reloaded.list().await[0])?, expected);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn concurrent_creates_never_reuse_an_id() -> Result<(), anyhow::Error> {
        let tmp = tmp_path();
        let store = PinStore::new(&tmp).await?;

        let mut handles = Vec::new();
        for n in 0..6 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { store.create(obj(json!({"n": n}))).await }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await??.id);
        }
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);

        // the file kept up with the last mutation
        let on_disk: Vec<Pin> = serde_json::from_slice(&tokio::fs::read(&tmp).await?)?;
        assert_eq!(on_disk, store.list().await);

        let _ = tokio::fs::remove_file(&tmp).await;
        Ok(())
    }

    #[tokio::test]
    async fn failed_create_does_not_occupy_an_id() -> Result<(), anyhow::Error> {
        let dir = std::env::temp_dir().join(format!("pins_{}", uuid::Uuid::new_v4()));
        let file = dir.join("pins.json");
        let store = PinStore::new(&file).await?;
        store.create(obj(json!({"text": "first"}))).await?;

        // swap the parent directory for a plain file so the next save fails
        tokio::fs::remove_dir_all(&dir).await?;
        tokio::fs::write(&dir, b"in the way").await?;
        let res = store.create(obj(json!({"text": "lost"}))).await;
        assert!(matches!(res, Err(ServiceError::Storage(_))));
        assert_eq!(store.list().await.len(), 1);

        // with the path restored, the next create takes id 2, not 3
        tokio::fs::remove_file(&dir).await?;
        tokio::fs::create_dir_all(&dir).await?;
        let pin = store.create(obj(json!({"text": "second"}))).await?;
        assert_eq!(pin.id, 2);

        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
