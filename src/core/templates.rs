//! # Template Updater Module / 模板更新模块
//!
//! Patches every operator-customizable (`@custom`) component template of a
//! cluster with fixed settings and mappings.
//!
//! 使用固定的设置和映射修补集群中每个可由运维人员自定义（`@custom`）的组件模板。
//!
//! The merge is shallow: top-level keys of the patch replace the template's
//! keys of the same name, everything else at the top level is kept.
//! 合并是浅层的：补丁的顶层键替换模板中同名的键，其余顶层键保持不变。

use std::future::Future;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Name suffix of templates that operators may customize.
pub const CUSTOM_SUFFIX: &str = "@custom";

/// One element of `GET /_component_template`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentTemplateEntry {
    pub name: String,
    pub component_template: Map<String, Value>,
}

/// The two component template calls the updater needs.
/// 更新器所需的两个组件模板调用。
pub trait ComponentTemplateApi {
    type Error: std::error::Error + Send + Sync + 'static;

    fn get_component_templates(
        &self,
    ) -> impl Future<Output = Result<Vec<ComponentTemplateEntry>, Self::Error>> + Send;

    fn put_component_template(
        &self,
        name: &str,
        body: &Value,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;
}

static CUSTOM_PATCH: Lazy<Map<String, Value>> = Lazy::new(|| {
    let patch = json!({
        "template": {
            "settings": {
                "index": {
                    "number_of_replicas": 1,
                    "number_of_shards": 1
                }
            },
            "mappings": {
                "runtime": {
                    "rally.doc_size": { "type": "long" },
                    "rally.message_size": { "type": "long" }
                },
                "properties": {
                    "event": {
                        "properties": {
                            "created": {
                                "type": "date",
                                "format": "strict_date_optional_time"
                            },
                            "ingested": {
                                "type": "date",
                                "format": "strict_date_optional_time"
                            }
                        }
                    }
                }
            }
        }
    });
    match patch {
        Value::Object(map) => map,
        _ => Map::new(),
    }
});

/// The fixed patch applied to every `@custom` template.
pub fn custom_patch() -> &'static Map<String, Value> {
    &CUSTOM_PATCH
}

/// Top-level keys of `patch` replace those of `existing`; nested values are not merged.
/// `patch` 的顶层键替换 `existing` 中的键；嵌套值不合并。
pub fn merge_shallow(existing: &Map<String, Value>, patch: &Map<String, Value>) -> Map<String, Value> {
    let mut merged = existing.clone();
    for (key, value) in patch {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Result reported back to the benchmark framework.
/// 返回给基准测试框架的结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateSummary {
    /// Number of templates written / 写入的模板数量
    pub weight: usize,
    pub unit: &'static str,
    pub success: bool,
}

impl UpdateSummary {
    fn ops(weight: usize) -> Self {
        Self {
            weight,
            unit: "ops",
            success: true,
        }
    }
}

/// Rewrites every `@custom` component template with [`custom_patch`] merged in.
///
/// Requests are issued one after another. The first failing write aborts the
/// batch; templates written before it stay written.
///
/// `_params` is the runner parameter block of the calling framework and is
/// not interpreted.
///
/// 依次发出请求。第一个失败的写入会中止整个批次；之前写入的模板保持已写入状态。
pub async fn update_custom_templates<C>(client: &C, _params: &Value) -> Result<UpdateSummary, C::Error>
where
    C: ComponentTemplateApi + Sync,
{
    let templates = client.get_component_templates().await?;
    let mut updated = 0;

    for template in templates.iter().filter(|t| t.name.ends_with(CUSTOM_SUFFIX)) {
        let body = Value::Object(merge_shallow(&template.component_template, custom_patch()));
        client.put_component_template(&template.name, &body).await?;
        tracing::info!(template = %template.name, "updated component template");
        updated += 1;
    }

    Ok(UpdateSummary::ops(updated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, thiserror::Error)]
    #[error("write rejected for {0}")]
    struct Rejected(String);

    #[derive(Default)]
    struct InMemoryTemplates {
        templates: Vec<ComponentTemplateEntry>,
        writes: Mutex<Vec<(String, Value)>>,
        reject: Option<String>,
    }

    impl InMemoryTemplates {
        fn with(names: &[(&str, Value)]) -> Self {
            let templates = names
                .iter()
                .map(|(name, body)| ComponentTemplateEntry {
                    name: name.to_string(),
                    component_template: body.as_object().cloned().unwrap_or_default(),
                })
                .collect();
            Self {
                templates,
                ..Self::default()
            }
        }

        fn written(&self) -> Vec<(String, Value)> {
            self.writes.lock().unwrap().clone()
        }
    }

    impl ComponentTemplateApi for InMemoryTemplates {
        type Error = Rejected;

        async fn get_component_templates(&self) -> Result<Vec<ComponentTemplateEntry>, Rejected> {
            Ok(self.templates.clone())
        }

        async fn put_component_template(&self, name: &str, body: &Value) -> Result<(), Rejected> {
            if self.reject.as_deref() == Some(name) {
                return Err(Rejected(name.to_string()));
            }
            self.writes.lock().unwrap().push((name.to_string(), body.clone()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_only_custom_templates_are_updated() {
        let client = InMemoryTemplates::with(&[
            ("logs@custom", json!({"template": {"settings": {}}})),
            ("logs@mappings", json!({"template": {"mappings": {}}})),
        ]);

        let summary = update_custom_templates(&client, &json!({})).await.unwrap();
        assert_eq!(summary, UpdateSummary::ops(1));
        assert_eq!(
            serde_json::to_value(&summary).unwrap(),
            json!({"weight": 1, "unit": "ops", "success": true})
        );

        let written = client.written();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].0, "logs@custom");
    }

    #[tokio::test]
    async fn test_merge_keeps_other_top_level_keys_and_replaces_template() {
        let client = InMemoryTemplates::with(&[(
            "metrics@custom",
            json!({
                "version": 3,
                "_meta": {"managed": false},
                "template": {"settings": {"index": {"codec": "best_compression"}}}
            }),
        )]);

        update_custom_templates(&client, &Value::Null).await.unwrap();
        let (_, body) = &client.written()[0];

        assert_eq!(body["version"], json!(3));
        assert_eq!(body["_meta"], json!({"managed": false}));
        assert_eq!(body["template"], custom_patch()["template"]);
        assert!(body["template"]["settings"]["index"].get("codec").is_none());
        assert_eq!(
            body["template"]["mappings"]["runtime"]["rally.doc_size"]["type"],
            json!("long")
        );
    }

    #[tokio::test]
    async fn test_no_custom_templates_means_zero_weight() {
        let client = InMemoryTemplates::with(&[("logs@settings", json!({}))]);
        let summary = update_custom_templates(&client, &json!({})).await.unwrap();
        assert_eq!(summary.weight, 0);
        assert!(summary.success);
        assert!(client.written().is_empty());
    }

    #[tokio::test]
    async fn test_failing_write_aborts_remaining_templates() {
        let mut client = InMemoryTemplates::with(&[
            ("a@custom", json!({})),
            ("b@custom", json!({})),
            ("c@custom", json!({})),
        ]);
        client.reject = Some("b@custom".to_string());

        let err = update_custom_templates(&client, &json!({})).await.unwrap_err();
        assert_eq!(err.to_string(), "write rejected for b@custom");
        let names: Vec<_> = client.written().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a@custom"]);
    }

    #[test]
    fn test_merge_shallow_is_idempotent() {
        let original = json!({"version": 1, "template": {"x": 1}});
        let original = original.as_object().unwrap();
        let once = merge_shallow(original, custom_patch());
        let twice = merge_shallow(&once, custom_patch());
        assert_eq!(once, twice);
    }
}
