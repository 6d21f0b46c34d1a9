use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

use crate::{Result, Store};

/// Columns stored as JSON text that must be re-parsed into structured
/// values before emission.
const JSON_COLUMNS: &[&str] = &["local_artifact_paths", "meta_tags"];

fn value_from_column(raw: ValueRef<'_>) -> Value {
    match raw {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::from(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}

fn rows_to_values(conn: &Connection, query: &str) -> Result<Vec<Value>> {
    let mut stmt = conn.prepare(query)?;
    let column_names: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
    let mut rows = stmt.query([])?;
    let mut values = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = Map::new();
        for (index, name) in column_names.iter().enumerate() {
            let mut value = value_from_column(row.get_ref(index)?);
            if JSON_COLUMNS.contains(&name.as_str()) {
                if let Value::String(raw) = &value {
                    if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                        value = parsed;
                    }
                }
            }
            object.insert(name.clone(), value);
        }
        values.push(Value::Object(object));
    }
    Ok(values)
}

fn write_jsonl(path: &Path, rows: &[Value]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for row in rows {
        serde_json::to_writer(&mut writer, row)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn write_json_array(path: &Path, rows: &[Value]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, rows)?;
    writer.flush()?;
    Ok(())
}

impl Store {
    /// Dumps every table as newline-delimited records, plus JSON arrays
    /// for the two external registries, into `out_dir`.
    pub async fn export_all(&self, out_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(out_dir)?;
        let conn = self.lock().await;

        let jsonl_tables = [
            ("documents.jsonl", "SELECT * FROM documents"),
            ("faq_items.jsonl", "SELECT * FROM faq_items"),
            ("link_edges.jsonl", "SELECT * FROM link_edges"),
            ("assets.jsonl", "SELECT * FROM assets"),
        ];
        for (filename, query) in jsonl_tables {
            let path = out_dir.join(filename);
            let rows = rows_to_values(&conn, query)?;
            info!(path = %path.display(), rows = rows.len(), "exporting table");
            write_jsonl(&path, &rows)?;
        }

        let json_tables = [
            ("external_urls.json", "SELECT * FROM external_links_global"),
            ("external_domains.json", "SELECT * FROM external_domains_global"),
        ];
        for (filename, query) in json_tables {
            let path = out_dir.join(filename);
            let rows = rows_to_values(&conn, query)?;
            info!(path = %path.display(), rows = rows.len(), "exporting registry");
            write_json_array(&path, &rows)?;
        }

        Ok(())
    }
}
