use std::cell::RefCell;
use std::rc::Rc;

use tabula_core::{
    CellData, CellInput, CellValue, ErrorReporter, GridError, GridResult, Role, StatementKind,
    TabularModel, ValueGroup, VisualState,
};
use tabula_store::demo::{movement_schema, seed, vehicle_schema};
use tabula_store::{SqliteSession, ensure_catalog};
use tempfile::{TempDir, tempdir};

const LABEL: usize = 1;
const MODEL: usize = 2;
const SPEED: usize = 3;
const DELETE: usize = 4;

fn seeded() -> GridResult<(TempDir, SqliteSession)> {
    let dir = tempdir().expect("tempdir");
    let mut session = SqliteSession::open_datastore(dir.path())?;
    ensure_catalog(&mut session)?;
    seed(&mut session)?;
    Ok((dir, session))
}

fn display(model: &TabularModel, row: usize, column: usize) -> CellValue {
    match model.get(row, column, Role::Display).expect("cell") {
        CellData::Value(value) => value,
        other => panic!("expected a display value, got {other:?}"),
    }
}

#[derive(Clone, Default)]
struct Errors(Rc<RefCell<Vec<String>>>);

impl ErrorReporter for Errors {
    fn on_error(&mut self, error: &GridError) {
        self.0.borrow_mut().push(error.to_string());
    }

    fn clear_error(&mut self) {
        self.0.borrow_mut().clear();
    }
}

#[test]
fn loads_foreign_key_display_and_auxiliary_values() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let model = TabularModel::load(vehicle_schema()?, &mut session)?;
    assert_eq!(model.row_count(), 3);
    assert_eq!(model.column_count(), 5);
    assert_eq!(display(&model, 0, LABEL), CellValue::from("Red"));
    assert_eq!(display(&model, 0, MODEL), CellValue::from("Coupe"));
    assert_eq!(display(&model, 1, SPEED), CellValue::Real(120.0));
    Ok(())
}

#[test]
fn choosing_an_option_saves_only_the_foreign_key() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let mut model = TabularModel::load(vehicle_schema()?, &mut session)?;
    let CellData::ForeignKey(handle) = model.get(0, MODEL, Role::Edit)? else {
        panic!("expected a foreign key handle");
    };
    let options = handle.options(&mut session)?;
    assert_eq!(handle.current_position(&options), Some(0));
    let sedan = options
        .iter()
        .find(|option| option.label == "Sedan")
        .expect("sedan option");
    model.set(0, MODEL, sedan.group.clone())?;

    let pending = model.pending_statements()?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].sql, "UPDATE vehicle SET model_id = ? WHERE vehicle_id = ?");
    assert_eq!(pending[0].params, vec![CellValue::Integer(2), CellValue::Integer(1)]);

    assert_eq!(model.save(&mut session)?, 1);
    assert!(!model.has_changes());
    assert_eq!(display(&model, 0, MODEL), CellValue::from("Sedan"));
    assert_eq!(display(&model, 0, SPEED), CellValue::Real(120.0));
    assert_eq!(display(&model, 0, LABEL), CellValue::from("Red"));
    Ok(())
}

#[test]
fn appended_row_is_inserted_and_reloaded() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let mut model = TabularModel::load(vehicle_schema()?, &mut session)?;
    let row = model.append();
    model.set(row, LABEL, CellValue::from("Green"))?;
    model.set(
        row,
        MODEL,
        CellInput::Group(ValueGroup::new(vec![3.into(), "Truck".into(), 80.0.into()])),
    )?;
    assert_eq!(model.visual_state(row, LABEL)?, VisualState::Created);

    let pending = model.pending_statements()?;
    assert_eq!(pending[0].kind, StatementKind::Insert);
    assert_eq!(pending[0].sql, "INSERT INTO vehicle (label, model_id) VALUES (?, ?)");

    model.save(&mut session)?;
    assert_eq!(model.row_count(), 4);
    assert_eq!(model.rows()[3].key(), &CellValue::Integer(4));
    assert_eq!(display(&model, 3, LABEL), CellValue::from("Green"));
    assert_eq!(display(&model, 3, MODEL), CellValue::from("Truck"));
    assert_eq!(model.visual_state(3, LABEL)?, VisualState::Normal);
    Ok(())
}

#[test]
fn appended_and_deleted_row_never_reaches_storage() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let mut model = TabularModel::load(vehicle_schema()?, &mut session)?;
    let row = model.append();
    model.set(row, DELETE, CellInput::ToggleDelete)?;
    assert!(model.pending_statements()?.is_empty());
    model.save(&mut session)?;
    assert_eq!(model.row_count(), 3);
    Ok(())
}

#[test]
fn deleting_an_unreferenced_row_removes_it() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let mut model = TabularModel::load(vehicle_schema()?, &mut session)?;
    model.set(1, DELETE, CellInput::ToggleDelete)?;
    let pending = model.pending_statements()?;
    assert_eq!(pending[0].sql, "DELETE FROM vehicle WHERE vehicle_id = ?");
    assert_eq!(pending[0].params, vec![CellValue::Integer(2)]);
    model.save(&mut session)?;
    assert_eq!(model.row_count(), 2);
    assert_eq!(display(&model, 1, LABEL), CellValue::from("Hauler"));
    Ok(())
}

#[test]
fn failed_batch_rolls_back_and_keeps_edits() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let errors = Errors::default();
    let mut model =
        TabularModel::load(vehicle_schema()?, &mut session)?.with_reporter(errors.clone());
    model.set(0, LABEL, CellValue::from("Crimson"))?;
    // Vehicle 3 is still referenced by a movement.
    model.set(2, DELETE, CellInput::ToggleDelete)?;

    let err = model.save(&mut session).expect_err("foreign key violation");
    assert_eq!(err.statement(), Some("DELETE FROM vehicle WHERE vehicle_id = ?"));
    assert_eq!(errors.0.borrow().len(), 1);
    assert_eq!(display(&model, 0, LABEL), CellValue::from("Crimson"));
    assert_eq!(model.visual_state(2, LABEL)?, VisualState::Deleted);

    let fresh = TabularModel::load(vehicle_schema()?, &mut session)?;
    assert_eq!(display(&fresh, 0, LABEL), CellValue::from("Red"));
    assert_eq!(fresh.row_count(), 3);

    model.set(2, DELETE, CellInput::ToggleDelete)?;
    model.save(&mut session)?;
    assert!(errors.0.borrow().is_empty());
    assert_eq!(display(&model, 0, LABEL), CellValue::from("Crimson"));
    Ok(())
}

#[test]
fn reset_discards_edits_and_is_idempotent() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let mut model = TabularModel::load(vehicle_schema()?, &mut session)?;
    model.set(0, LABEL, CellValue::from("Scratch"))?;
    model.append();
    model.reset(&mut session)?;
    let first = model.rows().to_vec();
    model.reset(&mut session)?;
    assert_eq!(model.rows(), first.as_slice());
    assert_eq!(model.row_count(), 3);
    assert_eq!(display(&model, 0, LABEL), CellValue::from("Red"));
    assert!(!model.has_changes());
    Ok(())
}

#[test]
fn multi_hop_joins_format_path_labels() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let model = TabularModel::load(movement_schema()?, &mut session)?;
    assert_eq!(model.row_count(), 2);
    assert_eq!(display(&model, 0, 2), CellValue::from("Red"));
    assert_eq!(display(&model, 0, 3), CellValue::from("Depot -> Harbour"));
    assert_eq!(display(&model, 1, 3), CellValue::from("Harbour -> Airport"));
    Ok(())
}

#[test]
fn two_models_share_one_session() -> GridResult<()> {
    let (_dir, mut session) = seeded()?;
    let mut vehicles = TabularModel::load(vehicle_schema()?, &mut session)?;
    let mut movements = TabularModel::load(movement_schema()?, &mut session)?;
    vehicles.set(0, LABEL, CellValue::from("Scarlet"))?;
    vehicles.save(&mut session)?;
    movements.reset(&mut session)?;
    assert_eq!(display(&movements, 0, 2), CellValue::from("Scarlet"));
    Ok(())
}
