//! Table rendering for terminals and JSON consumers

use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use dra_core::{DraError, Result, ResultTable};

/// Render rows verbatim as a terminal table
pub fn render_table(table: &ResultTable) -> String {
    let mut out = Table::new();
    out.load_preset(UTF8_FULL);
    out.set_content_arrangement(ContentArrangement::Dynamic);
    out.set_header(ResultTable::columns());
    for cells in table.cells() {
        out.add_row(cells);
    }
    out.to_string()
}

/// Render as pretty-printed JSON (`columns`, `rows`, `generated_at`)
pub fn render_json(table: &ResultTable) -> Result<String> {
    serde_json::to_string_pretty(table)
        .map_err(|e| DraError::Other(anyhow::Error::new(e).context("Failed to serialize table")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use dra_core::{EntityRecord, EntityType, GeocodeOutcome, Row};

    fn table() -> ResultTable {
        let mut table = ResultTable::new();
        table.push(Row {
            text: "123 Main St Springfield fire".to_string(),
            entities: EntityRecord::new()
                .with(EntityType::Street, "123 Main St")
                .with(EntityType::City, "Springfield"),
            address: "123 Main St, , Springfield".to_string(),
            geocode: GeocodeOutcome::NotFound,
        });
        table
    }

    #[test]
    fn test_render_table_has_headers_and_cells() {
        let rendered = render_table(&table());

        for column in ResultTable::columns() {
            assert!(rendered.contains(column), "missing column {column}");
        }
        assert!(rendered.contains("Springfield"));
    }

    #[test]
    fn test_render_empty_table_keeps_headers() {
        let rendered = render_table(&ResultTable::new());
        assert!(rendered.contains("EASTER_EGG_TAG"));
    }

    #[test]
    fn test_render_json() {
        let json = render_json(&table()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["columns"][0], "Text");
        assert_eq!(value["rows"][0]["STREET"], "123 Main St");
        assert!(value["rows"][0]["Coordinates"].is_null());
    }
}
