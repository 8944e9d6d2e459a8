//! Saved object subcommands

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use futures::TryStreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Hit, SavedObjectRegistry, SavedObjectType};
use crate::infrastructure::services::SavedObjectService;

use super::Command;

/// Runs one subcommand against `service`, writing JSON to `out`
pub async fn execute<T, W>(
    service: &SavedObjectService<T>,
    registry: &SavedObjectRegistry,
    command: Command,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: SavedObjectType,
    W: Write,
{
    match command {
        Command::Types => write_json(out, registry.entries()),
        Command::Get { id } => {
            let record = service.get(Some(&id)).await?;
            write_json(out, &record)
        }
        Command::Find { search } => {
            let result = service.find(&search).await?;
            write_json(out, &result)
        }
        Command::Delete { ids } => {
            service.delete(ids.clone()).await?;
            write_json(out, &json!({ "deleted": ids }))
        }
        Command::Export { query, page_size } => export(service, &query, page_size, out).await,
        Command::Import { file } => {
            let imported = import(service, &file).await?;
            write_json(out, &json!({ "imported": imported }))
        }
        Command::Url { id } => {
            writeln!(out, "{}", service.url_for(&id))?;
            Ok(())
        }
    }
}

async fn export<T, W>(
    service: &SavedObjectService<T>,
    query: &str,
    page_size: usize,
    out: &mut W,
) -> anyhow::Result<()>
where
    T: SavedObjectType,
    W: Write,
{
    let mut records = service.scan_all(query, page_size);
    let mut exported = 0usize;

    while let Some(record) = records.try_next().await? {
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
        exported += 1;
    }

    info!(object_type = service.object_type(), exported, "Export finished");
    Ok(())
}

/// Saves every non-blank line of `path`; lines without an `id` get a new one
async fn import<T: SavedObjectType>(
    service: &SavedObjectService<T>,
    path: &Path,
) -> anyhow::Result<usize> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let mut imported = 0;

    for (number, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let hit = parse_line(line)
            .with_context(|| format!("Invalid object on line {}", number + 1))?;
        let record = service.map_hit(&hit);
        service.save(&record).await?;
        imported += 1;
    }

    Ok(imported)
}

fn parse_line(line: &str) -> anyhow::Result<Hit> {
    let mut source: Value = serde_json::from_str(line)?;
    let object = source.as_object_mut().context("Expected a JSON object")?;

    let id = match object.remove("id") {
        Some(Value::String(id)) => id,
        Some(other) => anyhow::bail!("Expected a string id, got {}", other),
        None => Uuid::new_v4().to_string(),
    };
    object.remove("url");

    Ok(Hit::new(id, source))
}

fn write_json<W: Write, V: Serialize + ?Sized>(out: &mut W, value: &V) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DocumentStore, SavedTemplate};
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::store::InMemoryDocumentStore;
    use std::sync::Arc;

    fn seeded() -> (Arc<InMemoryDocumentStore>, SavedObjectService<SavedTemplate>) {
        let store = Arc::new(
            InMemoryDocumentStore::new()
                .with_document(".kibi", "template", "a", json!({"title": "Alpha"}))
                .with_document(".kibi", "template", "b", json!({"title": "Beta"})),
        );
        let service =
            SavedObjectService::new(store.clone(), Arc::new(InMemoryCache::new()), ".kibi");
        (store, service)
    }

    async fn run(service: &SavedObjectService<SavedTemplate>, command: Command) -> String {
        let mut out = Vec::new();
        execute(service, &SavedObjectRegistry::default(), command, &mut out)
            .await
            .unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_get_prints_record() {
        let (_, service) = seeded();

        let output = run(&service, Command::Get { id: "a".to_string() }).await;
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value["id"], "a");
        assert_eq!(value["title"], "Alpha");
        assert_eq!(value["url"], "#/settings/templates/a");
    }

    #[tokio::test]
    async fn test_types_lists_registry() {
        let (_, service) = seeded();

        let output = run(&service, Command::Types).await;
        let value: Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value[0]["service"], "savedTemplates");
        assert_eq!(value[1]["object_type"], "search");
    }

    #[tokio::test]
    async fn test_export_writes_json_lines() {
        let (_, service) = seeded();

        let output = run(
            &service,
            Command::Export {
                query: String::new(),
                page_size: 1,
            },
        )
        .await;
        let ids: Vec<String> = output
            .lines()
            .map(|l| serde_json::from_str::<Value>(l).unwrap()["id"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_import_saves_each_line() {
        let (store, service) = seeded();
        let path = std::env::temp_dir().join(format!("saved-objects-{}.jsonl", Uuid::new_v4()));
        std::fs::write(
            &path,
            "{\"id\":\"c\",\"url\":\"#/settings/templates/c\",\"title\":\"Gamma\"}\n\n{\"title\":\"No id\"}\n",
        )
        .unwrap();

        let output = run(&service, Command::Import { file: path.clone() }).await;
        std::fs::remove_file(&path).ok();

        let value: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["imported"], 2);
        assert_eq!(store.document_count(".kibi", "template"), 4);

        let hit = store.get(".kibi", "template", "c").await.unwrap().unwrap();
        assert!(hit.source.get("url").is_none());
    }

    #[tokio::test]
    async fn test_import_keeps_fields_outside_the_type() {
        let (store, service) = seeded();
        let path = std::env::temp_dir().join(format!("saved-objects-{}.jsonl", Uuid::new_v4()));
        std::fs::write(
            &path,
            "{\"id\":\"d\",\"title\":\"Delta\",\"kibanaSavedObjectMeta\":{\"searchSourceJSON\":\"{}\"}}\n",
        )
        .unwrap();

        run(&service, Command::Import { file: path.clone() }).await;
        std::fs::remove_file(&path).ok();

        let hit = store.get(".kibi", "template", "d").await.unwrap().unwrap();
        assert_eq!(
            hit.source,
            json!({"title": "Delta", "kibanaSavedObjectMeta": {"searchSourceJSON": "{}"}})
        );
    }

    #[tokio::test]
    async fn test_delete_reports_ids() {
        let (store, service) = seeded();

        let output = run(&service, Command::Delete { ids: vec!["a".to_string()] }).await;

        assert!(output.contains("\"deleted\""));
        assert!(!store.contains(".kibi", "template", "a"));
    }

    #[tokio::test]
    async fn test_url_prints_route() {
        let (_, service) = seeded();

        let output = run(&service, Command::Url { id: "a b".to_string() }).await;

        assert_eq!(output, "#/settings/templates/a%20b\n");
    }

    #[test]
    fn test_parse_line_rejects_non_string_id() {
        assert!(parse_line("{\"id\": 3}").is_err());
        assert!(parse_line("[1]").is_err());
    }
}
