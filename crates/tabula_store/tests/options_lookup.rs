use tabula_core::{CellData, CellValue, GridResult, Role, TabularModel, load_options};
use tabula_store::demo::{path_schema, seed, vehicle_schema};
use tabula_store::{SqliteSession, ensure_catalog};
use tempfile::tempdir;

#[test]
fn lists_referenced_rows_in_id_order() -> GridResult<()> {
    let dir = tempdir().expect("tempdir");
    let mut session = SqliteSession::open_datastore(dir.path())?;
    ensure_catalog(&mut session)?;
    seed(&mut session)?;

    let schema = vehicle_schema()?;
    let spec = schema.columns()[2].foreign_key.clone().expect("foreign key");
    let options = load_options(&mut session, &spec)?;
    let labels: Vec<_> = options.iter().map(|option| option.label.as_str()).collect();
    assert_eq!(labels, vec!["Coupe", "Sedan", "Truck"]);
    assert_eq!(
        options[2].group.values(),
        &[CellValue::Integer(3), "Truck".into(), CellValue::Real(80.0)]
    );
    Ok(())
}

#[test]
fn aliased_reference_tables_list_options() -> GridResult<()> {
    let dir = tempdir().expect("tempdir");
    let mut session = SqliteSession::open_datastore(dir.path())?;
    ensure_catalog(&mut session)?;
    seed(&mut session)?;

    let model = TabularModel::load(path_schema()?, &mut session)?;
    let CellData::ForeignKey(handle) = model.get(1, 2, Role::Edit)? else {
        panic!("expected a foreign key handle");
    };
    let options = handle.options(&mut session)?;
    assert_eq!(options.len(), 3);
    assert_eq!(handle.current_position(&options), Some(2));
    assert_eq!(options[2].label, "Airport");
    Ok(())
}
