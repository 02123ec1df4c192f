//! End-to-End tests for structural alteration and import
//!
//! Tests the full lifecycle: declare -> fill -> alter -> migrate, and
//! delimited text -> typed table -> delimited text.

use tabula_schema::{
    build_definition_from_inferred, export_table, generate_typed_records_list, import_rows_into,
    read_delimited, write_delimited, Catalog, DataType, DelimitedFormat, DesignatorMode,
    ExportOptions, FieldDefinition, FieldKey, NoLinkLabels, TableDefinition, TableDefinitionId,
    TableId, TaggedValue, TypeRegistry, ViolationKind,
};

// =============================================================================
// HELPERS
// =============================================================================

fn person_catalog() -> (Catalog, TypeRegistry, TableDefinitionId, TableId) {
    let registry = TypeRegistry::with_predefined();
    let mut catalog = Catalog::new();
    let definition = TableDefinition::with_fields(
        "Person",
        vec![
            FieldDefinition::new("Name", DataType::text()),
            FieldDefinition::new("Age", DataType::number()),
        ],
    )
    .unwrap();
    let def_id = catalog.add_definition(definition);
    let table_id = catalog.create_table(&def_id, DesignatorMode::Owned).unwrap();
    (catalog, registry, def_id, table_id)
}

fn add_person(catalog: &mut Catalog, registry: &TypeRegistry, table_id: &TableId, name: &str, age: i64) {
    let (table, definition) = catalog.table_with_definition(table_id).unwrap();
    let outcomes = table
        .add_record(definition, registry)
        .unwrap()
        .set_values(
            definition,
            registry,
            vec![
                (FieldKey::Name("Name"), TaggedValue::from(name)),
                (FieldKey::Name("Age"), TaggedValue::from(age)),
            ],
        )
        .unwrap();
    assert!(outcomes.iter().all(|o| o.is_stored()));
}

fn column(
    catalog: &Catalog,
    registry: &TypeRegistry,
    def_id: &TableDefinitionId,
    table_id: &TableId,
    field: &str,
) -> Vec<TaggedValue> {
    let definition = catalog.definition(def_id).unwrap();
    catalog
        .table(table_id)
        .unwrap()
        .records()
        .iter()
        .map(|r| r.get(definition, registry, FieldKey::Name(field)).unwrap())
        .collect()
}

// =============================================================================
// ALTERATION SCENARIOS
// =============================================================================

/// Renaming keeps the value, retyping resets it to the new type's default
#[test]
fn test_rename_then_retype() {
    let (mut catalog, registry, def_id, table_id) = person_catalog();
    add_person(&mut catalog, &registry, &table_id, "Ann", 30);

    catalog
        .edit_definition(&def_id, true, &registry, |def| {
            def.field_mut(FieldKey::Name("Age"))?.rename("Years");
            Ok(())
        })
        .unwrap();
    assert_eq!(
        column(&catalog, &registry, &def_id, &table_id, "Years"),
        vec![TaggedValue::from(30)]
    );

    let report = catalog
        .edit_definition(&def_id, true, &registry, |def| {
            def.field_mut(FieldKey::Name("Years"))?
                .set_field_type(DataType::text());
            Ok(())
        })
        .unwrap();
    assert_eq!(report.values_reset, 1);
    let years = column(&catalog, &registry, &def_id, &table_id, "Years");
    assert_eq!(years, vec![TaggedValue::from("")]);
    assert_ne!(years, vec![TaggedValue::from("30")]);
    assert_eq!(
        column(&catalog, &registry, &def_id, &table_id, "Name"),
        vec![TaggedValue::from("Ann")]
    );
}

/// Reordering the logical list never moves stored data
#[test]
fn test_reorder_keeps_storage_and_values() {
    let (mut catalog, registry, def_id, table_id) = person_catalog();
    add_person(&mut catalog, &registry, &table_id, "Ann", 30);
    add_person(&mut catalog, &registry, &table_id, "Bob", 41);

    let raw_before: Vec<_> = catalog
        .table(&table_id)
        .unwrap()
        .records()
        .iter()
        .map(|r| r.raw_values().to_vec())
        .collect();

    let report = catalog
        .edit_definition(&def_id, true, &registry, |def| def.move_field(1, 0))
        .unwrap();
    assert_eq!(report.tables_altered, 0);

    let definition = catalog.definition(&def_id).unwrap();
    assert_eq!(definition.field_definitions()[0].name, "Age");
    assert_eq!(definition.field_definitions()[0].storage_index(), Some(1));

    let raw_after: Vec<_> = catalog
        .table(&table_id)
        .unwrap()
        .records()
        .iter()
        .map(|r| r.raw_values().to_vec())
        .collect();
    assert_eq!(raw_before, raw_after);
}

/// Removing a field clears only that field's values
#[test]
fn test_removal_is_isolated() {
    let (mut catalog, registry, def_id, table_id) = person_catalog();
    catalog
        .edit_definition(&def_id, true, &registry, |def| {
            def.insert_field(1, FieldDefinition::new("Born", DataType::date()))?;
            Ok(())
        })
        .unwrap();
    add_person(&mut catalog, &registry, &table_id, "Ann", 30);
    add_person(&mut catalog, &registry, &table_id, "Bob", 41);
    {
        let (table, definition) = catalog.table_with_definition(&table_id).unwrap();
        let first = table.records()[0].id().clone();
        table
            .record_mut(&first)
            .unwrap()
            .set(definition, &registry, FieldKey::Name("Born"), TaggedValue::from("1994-03-02"))
            .unwrap()
            .into_result()
            .unwrap();
    }

    let born = catalog
        .definition(&def_id)
        .unwrap()
        .field(FieldKey::Name("Born"))
        .unwrap()
        .id()
        .clone();
    let report = catalog
        .edit_definition(&def_id, true, &registry, |def| {
            def.remove_field(&born)?;
            Ok(())
        })
        .unwrap();
    assert_eq!(report.values_reset, 0);

    assert_eq!(
        column(&catalog, &registry, &def_id, &table_id, "Name"),
        vec![TaggedValue::from("Ann"), TaggedValue::from("Bob")]
    );
    assert_eq!(
        column(&catalog, &registry, &def_id, &table_id, "Age"),
        vec![TaggedValue::from(30), TaggedValue::from(41)]
    );
    let definition = catalog.definition(&def_id).unwrap();
    assert!(definition.field(FieldKey::Name("Born")).is_err());
    assert_eq!(definition.storage_structure().len(), 2);
}

/// Duplicate unique keys are reported, never dropped
#[test]
fn test_unique_key_duplicates_reported() {
    let (mut catalog, registry, def_id, table_id) = person_catalog();
    add_person(&mut catalog, &registry, &table_id, "Ann", 30);
    add_person(&mut catalog, &registry, &table_id, "Ann", 52);
    add_person(&mut catalog, &registry, &table_id, "Bob", 41);

    let report = catalog
        .edit_definition(&def_id, true, &registry, |def| {
            let name = def.field(FieldKey::Name("Name"))?.id().clone();
            def.set_unique_key(vec![name])
        })
        .unwrap();
    assert_eq!(report.duplicate_keys.len(), 1);
    assert_eq!(report.duplicate_keys[0].key, "Ann");
    assert_eq!(catalog.table(&table_id).unwrap().len(), 3);
}

// =============================================================================
// IMPORT / EXPORT SCENARIOS
// =============================================================================

/// A bad date is reported and left empty, never coerced into a valid date
#[test]
fn test_csv_import_with_bad_date() {
    let rows = read_delimited("1,2020-01-01\n2,bad-date\n", DelimitedFormat::Comma).unwrap();
    let registry = TypeRegistry::with_predefined();
    let definition =
        build_definition_from_inferred("Events", None, &[DataType::number(), DataType::date_time()])
            .unwrap();
    let mut catalog = Catalog::new();
    let def_id = catalog.add_definition(definition);
    let table_id = catalog.create_table(&def_id, DesignatorMode::Owned).unwrap();

    let (table, definition) = catalog.table_with_definition(&table_id).unwrap();
    let report = import_rows_into(table, definition, &registry, &rows).unwrap();

    assert_eq!(report.records_added, 2);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert_eq!((failure.row, failure.column), (1, 1));
    assert_eq!(failure.text, "bad-date");
    assert_eq!(failure.violation.kind, ViolationKind::ParseFailure);

    let first = table.records()[0]
        .get(definition, &registry, FieldKey::Index(1))
        .unwrap();
    assert!(first.as_date_time().is_some());
    let second = table.records()[1]
        .get(definition, &registry, FieldKey::Index(1))
        .unwrap();
    assert!(second.is_null());
}

/// Infer a schema from CSV, populate it, write it back as TSV
#[test]
fn test_infer_import_export_round_trip() {
    let text = "name,joined,score\nAnn,2020-01-01,12.5\nBob,2021-02-03,7\n";
    let rows = read_delimited(text, DelimitedFormat::Comma).unwrap();
    let typed = generate_typed_records_list(&rows, true);
    assert_eq!(
        typed.column_types,
        vec![DataType::text(), DataType::date_time(), DataType::number()]
    );

    let registry = TypeRegistry::with_predefined();
    let definition =
        build_definition_from_inferred("Scores", typed.headers.as_deref(), &typed.column_types)
            .unwrap();
    let mut table = tabula_schema::Table::owned(&definition);
    let report = import_rows_into(&mut table, &definition, &registry, &rows[1..]).unwrap();
    assert!(report.failures.is_empty());

    let exported = export_table(
        &table,
        &definition,
        &registry,
        &ExportOptions::default(),
        &NoLinkLabels,
        true,
    )
    .unwrap();
    let tsv = write_delimited(&exported, DelimitedFormat::Tab, &ExportOptions::default()).unwrap();
    assert_eq!(
        tsv,
        "name\tjoined\tscore\nAnn\t2020-01-01 00:00:00\t12.5\nBob\t2021-02-03 00:00:00\t7\n"
    );
}
