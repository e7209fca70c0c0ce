//! Grid schemas over the catalog tables, and a small seed data set.

use log::info;

use tabula_core::{CellValue, ForeignKeySpec, GridError, GridResult, Schema, SchemaColumn};

use crate::SqliteSession;

pub const DEMO_TABLES: [&str; 5] = ["model", "vehicle", "hub", "path", "movement"];

pub fn model_schema() -> GridResult<Schema> {
    Schema::new(
        "model",
        vec![
            SchemaColumn::new("model.model_id", "id", CellValue::Null),
            SchemaColumn::new("model.type_id", "type", 0),
            SchemaColumn::new("model.label", "label", ""),
            SchemaColumn::new("model.speed", "speed", 0.0),
        ],
    )
}

pub fn vehicle_schema() -> GridResult<Schema> {
    Schema::new(
        "vehicle",
        vec![
            SchemaColumn::new("vehicle.vehicle_id", "id", CellValue::Null),
            SchemaColumn::new("vehicle.label", "label", "--"),
            SchemaColumn::new("model.model_id", "model", 0).with_foreign_key(
                ForeignKeySpec::new("model", "vehicle.model_id = model.model_id", "model.model_id")
                    .display("model.label")
                    .auxiliary("model.speed", "speed"),
            ),
        ],
    )
}

pub fn hub_schema() -> GridResult<Schema> {
    Schema::new(
        "hub",
        vec![
            SchemaColumn::new("hub.hub_id", "id", CellValue::Null),
            SchemaColumn::new("hub.label", "label", ""),
            SchemaColumn::new("hub.posX", "x", 0.0),
            SchemaColumn::new("hub.posY", "y", 0.0),
        ],
    )
}

fn hub_end(alias: &str, column: &str, header: &str) -> SchemaColumn {
    SchemaColumn::new(format!("path.{column}"), header, 0).with_foreign_key(
        ForeignKeySpec::new(
            format!("hub AS {alias}"),
            format!("path.{column} = {alias}.hub_id"),
            format!("{alias}.hub_id"),
        )
        .display(format!("{alias}.label")),
    )
}

pub fn path_schema() -> GridResult<Schema> {
    Schema::new(
        "path",
        vec![
            SchemaColumn::new("path.path_id", "id", CellValue::Null),
            hub_end("start_hub", "start_hub_id", "from"),
            hub_end("end_hub", "end_hub_id", "to"),
        ],
    )
}

pub fn movement_schema() -> GridResult<Schema> {
    Schema::new(
        "movement",
        vec![
            SchemaColumn::new("movement.movement_id", "id", CellValue::Null),
            SchemaColumn::new("movement.ts", "time", 0),
            SchemaColumn::new("movement.vehicle_id", "vehicle", 0).with_foreign_key(
                ForeignKeySpec::new(
                    "vehicle",
                    "movement.vehicle_id = vehicle.vehicle_id",
                    "vehicle.vehicle_id",
                )
                .display("vehicle.label"),
            ),
            SchemaColumn::new("movement.path_id", "path", 0).with_foreign_key(
                ForeignKeySpec::new("path", "movement.path_id = path.path_id", "path.path_id")
                    .display("start_hub.label")
                    .display("end_hub.label")
                    .format("{0} -> {1}")
                    .join("LEFT JOIN hub AS start_hub ON path.start_hub_id = start_hub.hub_id")
                    .join("LEFT JOIN hub AS end_hub ON path.end_hub_id = end_hub.hub_id"),
            ),
        ],
    )
}

pub fn schema_for(table: &str) -> GridResult<Schema> {
    match table {
        "model" => model_schema(),
        "vehicle" => vehicle_schema(),
        "hub" => hub_schema(),
        "path" => path_schema(),
        "movement" => movement_schema(),
        other => Err(GridError::schema(format!(
            "no demo schema for table '{other}' (expected one of {})",
            DEMO_TABLES.join(", ")
        ))),
    }
}

/// Insert a small consistent data set. Expects empty catalog tables.
pub fn seed(session: &mut SqliteSession) -> GridResult<()> {
    let models: [(i64, &str, i64, f64); 3] = [
        (1, "Coupe", 1, 90.0),
        (2, "Sedan", 1, 120.0),
        (3, "Truck", 2, 80.0),
    ];
    for (id, label, type_id, speed) in models {
        session.execute(
            "INSERT INTO model (model_id, label, type_id, speed) VALUES (?, ?, ?, ?)",
            &[id.into(), label.into(), type_id.into(), speed.into()],
        )?;
    }
    let vehicles: [(i64, &str, i64); 3] = [(1, "Red", 1), (2, "Blue", 2), (3, "Hauler", 3)];
    for (id, label, model_id) in vehicles {
        session.execute(
            "INSERT INTO vehicle (vehicle_id, label, model_id) VALUES (?, ?, ?)",
            &[id.into(), label.into(), model_id.into()],
        )?;
    }
    let hubs: [(i64, &str, f64, f64); 3] = [
        (1, "Depot", 0.0, 0.0),
        (2, "Harbour", 10.0, 2.5),
        (3, "Airport", -4.0, 8.0),
    ];
    for (id, label, x, y) in hubs {
        session.execute(
            "INSERT INTO hub (hub_id, label, posX, posY) VALUES (?, ?, ?, ?)",
            &[id.into(), label.into(), x.into(), y.into()],
        )?;
    }
    let paths: [(i64, i64, i64); 3] = [(1, 1, 2), (2, 2, 3), (3, 3, 1)];
    for (id, start, end) in paths {
        session.execute(
            "INSERT INTO path (path_id, start_hub_id, end_hub_id) VALUES (?, ?, ?)",
            &[id.into(), start.into(), end.into()],
        )?;
    }
    let movements: [(i64, i64, i64, i64); 2] = [(1, 1_700_000_000, 1, 1), (2, 1_700_000_600, 3, 2)];
    for (id, ts, vehicle_id, path_id) in movements {
        session.execute(
            "INSERT INTO movement (movement_id, ts, vehicle_id, path_id) VALUES (?, ?, ?, ?)",
            &[id.into(), ts.into(), vehicle_id.into(), path_id.into()],
        )?;
    }
    info!("tabula: seeded demo tables");
    Ok(())
}
