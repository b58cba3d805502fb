use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use crate::api::PipelineStatus;

/// Table and cell creation helpers
pub fn create_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Yes/no cell, red when the flag means the pipeline can't run.
fn blocking_flag_cell(value: bool) -> Cell {
    if value {
        Cell::new("yes").fg(TableColor::Red)
    } else {
        Cell::new("no").fg(TableColor::Green)
    }
}

fn schedulable_cell(value: bool) -> Cell {
    if value {
        Cell::new("yes").fg(TableColor::Green)
    } else {
        Cell::new("no").fg(TableColor::Yellow)
    }
}

/// One row per pipeline with its pause, lock and schedule state.
pub fn status_table(rows: &[(String, PipelineStatus)]) -> Table {
    let mut table = create_table();
    table.set_header(vec!["Pipeline", "Paused", "Locked", "Schedulable", "Pause cause"]);

    for (name, status) in rows {
        table.add_row(vec![
            Cell::new(name),
            blocking_flag_cell(status.paused),
            blocking_flag_cell(status.locked),
            schedulable_cell(status.schedulable),
            Cell::new(status.paused_cause.as_deref().unwrap_or("")),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_table_has_row_per_pipeline() {
        let rows = vec![
            (
                "Build".to_string(),
                PipelineStatus {
                    schedulable: true,
                    ..PipelineStatus::default()
                },
            ),
            (
                "Deploy".to_string(),
                PipelineStatus {
                    paused: true,
                    paused_cause: Some("maintenance".to_string()),
                    ..PipelineStatus::default()
                },
            ),
        ];

        let table = status_table(&rows);
        let rendered = table.to_string();

        assert!(rendered.contains("Build"));
        assert!(rendered.contains("maintenance"));
    }
}
