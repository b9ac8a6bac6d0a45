//! `race-matrix update-templates`: patches the `@custom` component templates
//! of a live cluster and prints the summary as JSON.
//!
//! `race-matrix update-templates`：修补在线集群的 `@custom` 组件模板，并以 JSON 打印摘要。

use anyhow::{Context, Result};
use colored::*;
use serde_json::Value;

use crate::core::templates::update_custom_templates;
use crate::infra::es::{EsClient, EsConnection};
use crate::t;

pub async fn execute(connection: EsConnection, params: Option<String>, locale: &str) -> Result<()> {
    let params: Value = match params {
        Some(raw) => serde_json::from_str(&raw)
            .with_context(|| t!("templates_params_invalid", locale = locale).to_string())?,
        None => Value::Object(Default::default()),
    };

    let client = EsClient::new(&connection)?;
    println!(
        "{}",
        t!("templates_updating", locale = locale, url = client.base_url()).blue()
    );
    let summary = update_custom_templates(&client, &params)
        .await
        .with_context(|| t!("templates_failed", locale = locale).to_string())?;

    println!("{}", t!("templates_updated", locale = locale, count = summary.weight).green());
    println!("{}", serde_json::to_string(&summary)?);
    Ok(())
}
