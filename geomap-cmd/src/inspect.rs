//! Column and property inspection.

use crate::{flush_notices, Session};
use geomap_core::{classify_columns, ColumnRole};

/// Roles worth listing for a table; `Free` matches everything and
/// `NameGeoJSON` only applies to boundary properties.
const TABLE_ROLES: [ColumnRole; 5] = [
    ColumnRole::Name,
    ColumnRole::Value,
    ColumnRole::Latitude,
    ColumnRole::Longitude,
    ColumnRole::Time,
];

/// Candidate columns per role, plus the key and value columns a render would use.
pub fn classification_report(columns: &[String], key: Option<&str>, value: Option<&str>) -> String {
    let mut lines = Vec::new();
    for role in TABLE_ROLES {
        let candidates = classify_columns::<&str>(columns, role, &[]);
        lines.push(format!("{:<10} {}", format!("{:?}", role), candidates.join(", ")));
    }
    lines.push(format!("{:<10} {}", "key", key.unwrap_or("-")));
    lines.push(format!("{:<10} {}", "value", value.unwrap_or("-")));
    lines.join("\n")
}

pub async fn run_classify(session: &Session, table: &str) -> anyhow::Result<()> {
    let mut state = session.state()?;
    state.select_choropleth(table).await?;
    flush_notices(&mut state);
    let Some(loaded) = state.choropleth() else {
        anyhow::bail!("{} could not be loaded", table);
    };
    let selection = state.selection();
    println!(
        "{}",
        classification_report(
            &loaded.data.column_names(),
            selection.key_column.as_deref(),
            selection.value_column.as_deref(),
        )
    );
    Ok(())
}

pub async fn run_properties(session: &Session, geojson: &str, property: Option<&str>) -> anyhow::Result<()> {
    let mut state = session.state()?;
    state.select_boundaries(geojson).await?;
    flush_notices(&mut state);
    if state.boundaries().is_none() {
        anyhow::bail!("{} could not be loaded", geojson);
    }
    if let Some(property) = property {
        state.set_key_property(property);
    }
    let (key, values) = state.boundary_table()?;
    println!("{}", key);
    for value in values {
        println!("{}", value);
    }
    Ok(())
}
