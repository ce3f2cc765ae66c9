use serde_json::Value;

use crate::host::storage::entities::{Client, Fields, TimeEntry};

const MISSING: &str = "-";

/// `id  name  remaining fields as json`
pub fn client_line(client: &Client) -> String {
    format!(
        "{}\t{}\t{}",
        client.id,
        text_field(&client.fields, "name"),
        remaining_fields(&client.fields, &["name"])
    )
}

/// `id  client  remaining fields as json`
pub fn time_entry_line(entry: &TimeEntry) -> String {
    format!(
        "{}\t{}\t{}",
        entry.id,
        entry.client().map_or(MISSING, |id| id.as_str()),
        remaining_fields(&entry.fields, &[])
    )
}

fn text_field(fields: &Fields, key: &str) -> String {
    match fields.get(key) {
        Some(Value::String(v)) => v.clone(),
        Some(Value::Null) | None => MISSING.into(),
        Some(other) => other.to_string(),
    }
}

fn remaining_fields(fields: &Fields, shown: &[&str]) -> String {
    let rest = fields
        .iter()
        .filter(|(key, _)| !shown.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect::<Fields>();
    if rest.is_empty() {
        String::new()
    } else {
        Value::Object(rest).to_string()
    }
}
