use orgstore_core::db::open_db_in_memory;
use orgstore_core::model::division::POSITIONS;
use orgstore_core::model::position::TITLES;
use orgstore_core::model::{
    Department, DepartmentColumn, Division, DivisionColumn, Position, PositionColumn, Title,
};
use orgstore_core::repo::{
    DepartmentRepository, DivisionRepository, Filter, OrderBy, Patch, QueryConfig, RepoError,
    Repository, SortDirection,
};
use rusqlite::types::Value;
use rusqlite::Connection;

fn seed_departments(conn: &Connection) -> Repository<'_, Department> {
    let repo = Repository::<Department>::new(conn);
    for name in ["Engineering", "Finance", "Operations"] {
        repo.insert(Department::new(name)).unwrap();
    }
    repo
}

fn department_names(rows: &[Department]) -> Vec<String> {
    rows.iter().map(|row| row.name.clone()).collect()
}

fn division_names(rows: &[Division]) -> Vec<String> {
    rows.iter().map(|row| row.name.clone()).collect()
}

#[test]
fn with_methods_leave_the_receiver_untouched() {
    let conn = open_db_in_memory().unwrap();
    let base = seed_departments(&conn);
    let before = format!("{:?}", base.config());

    let engineering = base.with_where(
        "departments.name = ?",
        [Value::Text("Engineering".to_string())],
    );
    let finance = base.with_filter(Filter::Eq(
        DepartmentColumn::Name,
        Value::Text("Finance".to_string()),
    ));
    let _ = base
        .with_limit(1)
        .with_cursor(2)
        .with_order(DepartmentColumn::Name, SortDirection::Desc)
        .with_unscoped()
        .with_preloads(["ghost"]);

    assert_eq!(format!("{:?}", base.config()), before);
    assert_eq!(department_names(&engineering.find_all().unwrap()), vec!["Engineering"]);
    assert_eq!(department_names(&finance.find_all().unwrap()), vec!["Finance"]);
    assert_eq!(base.find_all().unwrap().len(), 3);
    assert_eq!(engineering.config().predicates().len(), 1);
    assert!(base.config().predicates().is_empty());
}

#[test]
fn predicates_combine_conjunctively() {
    let conn = open_db_in_memory().unwrap();
    let repo = seed_departments(&conn);

    let rows = repo
        .with_filter(Filter::Like(DepartmentColumn::Name, "%i%".to_string()))
        .with_filter(Filter::NotEq(
            DepartmentColumn::Name,
            Value::Text("Finance".to_string()),
        ))
        .find_all()
        .unwrap();
    assert_eq!(department_names(&rows), vec!["Engineering", "Operations"]);

    let none = repo
        .with_filter(Filter::In(DepartmentColumn::Id, Vec::new()))
        .find_all()
        .unwrap();
    assert!(none.is_empty());
}

#[test]
fn default_order_is_id_ascending_and_explicit_order_replaces_it() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Department>::new(&conn);
    for name in ["Sales", "Audit", "Marketing"] {
        repo.insert(Department::new(name)).unwrap();
    }

    let by_id: Vec<i64> = repo.find_all().unwrap().iter().map(|row| row.id).collect();
    assert_eq!(by_id, vec![1, 2, 3]);

    let by_name = repo
        .with_order(DepartmentColumn::Id, SortDirection::Desc)
        .with_order(DepartmentColumn::Name, SortDirection::Asc)
        .find_all()
        .unwrap();
    assert_eq!(department_names(&by_name), vec!["Audit", "Marketing", "Sales"]);

    let first = repo
        .with_order_by(OrderBy::parse::<Department>("name", "DESC").unwrap())
        .find_one()
        .unwrap()
        .unwrap();
    assert_eq!(first.name, "Sales");
    assert!(OrderBy::parse::<Department>("salary", "asc").is_none());
    assert!(OrderBy::parse::<Department>("name", "sideways").is_none());
}

#[test]
fn keyset_pagination_visits_every_row_once_while_rows_are_appended() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Position>::new(&conn);
    for n in 1..=10 {
        repo.insert(Position::new(format!("Position {n}"))).unwrap();
    }

    let page = repo.with_limit(3);
    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let scoped = match cursor {
            Some(last) => page.with_cursor(last),
            None => page.clone(),
        };
        let rows = scoped.find_all().unwrap();
        if rows.is_empty() {
            break;
        }
        if seen.is_empty() {
            repo.insert(Position::new("Late arrival 1")).unwrap();
            repo.insert(Position::new("Late arrival 2")).unwrap();
        }
        cursor = rows.last().map(|row| row.id);
        seen.extend(rows.iter().map(|row| row.id));
    }

    assert_eq!(seen, (1..=12).collect::<Vec<i64>>());
}

#[test]
fn joins_filter_on_the_joined_table() {
    let conn = open_db_in_memory().unwrap();
    let departments = seed_departments(&conn);
    let divisions = Repository::<Division>::new(&conn);
    divisions.insert(Division::new("Platform", 1)).unwrap();
    divisions.insert(Division::new("Infrastructure", 1)).unwrap();
    divisions.insert(Division::new("Payroll", 2)).unwrap();
    assert_eq!(departments.count().unwrap(), 3);

    let in_engineering = divisions
        .with_joins(["JOIN departments ON departments.id = divisions.department_id"])
        .with_where(
            "departments.name = ?",
            [Value::Text("Engineering".to_string())],
        )
        .with_order(DivisionColumn::Name, SortDirection::Desc);

    let rows = in_engineering.find_all().unwrap();
    assert_eq!(division_names(&rows), vec!["Platform", "Infrastructure"]);
    assert_eq!(rows[0].code, "pla-001");
    assert_eq!(in_engineering.count().unwrap(), 2);
}

#[test]
fn count_ignores_limit_and_sum_defaults_to_zero() {
    let conn = open_db_in_memory().unwrap();
    seed_departments(&conn);
    let divisions = Repository::<Division>::new(&conn);
    divisions.insert(Division::new("Platform", 1)).unwrap();
    divisions.insert(Division::new("Infrastructure", 1)).unwrap();
    divisions.insert(Division::new("Payroll", 2)).unwrap();

    assert_eq!(divisions.with_limit(1).count().unwrap(), 3);
    assert_eq!(divisions.with_cursor(1).count().unwrap(), 2);
    assert_eq!(divisions.sum::<f64>(DivisionColumn::DepartmentId).unwrap(), 4.0);
    assert_eq!(divisions.sum::<i64>(DivisionColumn::DepartmentId).unwrap(), 4);

    let empty = divisions.with_filter(Filter::Gt(DivisionColumn::Id, Value::Integer(100)));
    assert_eq!(empty.count().unwrap(), 0);
    assert_eq!(empty.sum::<f64>(DivisionColumn::DepartmentId).unwrap(), 0.0);
}

#[test]
fn integer_sums_stay_exact_beyond_f64_precision() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Department>::new(&conn);
    for id in [2, (1_i64 << 53) + 1] {
        let mut department = Department::new(format!("Department {id}"));
        department.id = id;
        repo.insert(department).unwrap();
    }

    let expected = (1_i64 << 53) + 3;
    assert_eq!(repo.sum::<i64>(DepartmentColumn::Id).unwrap(), expected);
    assert_ne!(repo.sum::<f64>(DepartmentColumn::Id).unwrap() as i64, expected);
}

#[test]
fn find_by_id_ignores_cursor_and_limit() {
    let conn = open_db_in_memory().unwrap();
    let repo = seed_departments(&conn);

    let found = repo.with_cursor(2).with_limit(1).find_by_id(1).unwrap();
    assert_eq!(found.name, "Engineering");

    let err = repo.find_by_id(99).unwrap_err();
    assert!(matches!(err, RepoError::NotFound { table: "departments", id: 99 }));
}

#[test]
fn find_by_ids_returns_existing_rows_in_id_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = seed_departments(&conn);

    assert!(repo.find_by_ids(&[]).unwrap().is_empty());
    let rows = repo.find_by_ids(&[3, 1, 42]).unwrap();
    assert_eq!(department_names(&rows), vec!["Engineering", "Operations"]);
}

#[test]
fn unknown_preload_is_rejected_before_any_query() {
    let conn = open_db_in_memory().unwrap();
    let repo = seed_departments(&conn);

    let err = repo.with_preloads(["managers"]).find_all().unwrap_err();
    match err {
        RepoError::UnknownRelation { table, relation } => {
            assert_eq!(table, "departments");
            assert_eq!(relation, "managers");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn has_many_preload_skips_soft_deleted_children() {
    let conn = open_db_in_memory().unwrap();
    seed_departments(&conn);
    let divisions = Repository::<Division>::new(&conn);
    let platform = divisions.insert(Division::new("Platform", 1)).unwrap();
    let payroll = divisions.insert(Division::new("Payroll", 2)).unwrap();

    let positions = Repository::<Position>::new(&conn);
    for name in ["Backend", "Frontend", "Retired"] {
        let mut position = Position::new(name);
        position.division_id = Some(platform.id);
        positions.insert(position).unwrap();
    }
    positions.remove_by_id(3).unwrap();

    let rows = divisions.with_preloads([POSITIONS]).find_all().unwrap();
    assert_eq!(rows[0].position_ids, Some(vec![1, 2]));
    assert_eq!(rows[1].id, payroll.id);
    assert_eq!(rows[1].position_ids, Some(Vec::new()));

    let plain = divisions.find_by_id(platform.id).unwrap();
    assert_eq!(plain.position_ids, None);
}

#[test]
fn bulk_operations_reject_empty_input() {
    let conn = open_db_in_memory().unwrap();
    let repo = seed_departments(&conn);
    let patch = Patch::new().set(DepartmentColumn::Name, "Renamed".to_string());

    assert!(matches!(
        repo.insert_many(Vec::new()).unwrap_err(),
        RepoError::InvalidInput(_)
    ));
    assert!(matches!(
        repo.update_many(&[], &patch).unwrap_err(),
        RepoError::InvalidInput(_)
    ));
    assert!(matches!(
        repo.remove_many(&[]).unwrap_err(),
        RepoError::InvalidInput(_)
    ));
    assert!(matches!(
        repo.update_by_id(1, &Patch::new()).unwrap_err(),
        RepoError::InvalidInput(_)
    ));
    assert_eq!(repo.count().unwrap(), 3);
}

#[test]
fn update_many_honors_registered_predicates() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Position>::new(&conn);
    for name in ["Backend", "Frontend", "Designer"] {
        repo.insert(Position::new(name)).unwrap();
    }

    let changed = repo
        .with_filter(Filter::Like(PositionColumn::Name, "%end".to_string()))
        .update_many(
            &[1, 2, 3],
            &Patch::new().set(PositionColumn::Color, "#00ff00".to_string()),
        )
        .unwrap();
    assert_eq!(changed, 2);

    let colors: Vec<String> = repo
        .find_all()
        .unwrap()
        .into_iter()
        .map(|row| row.color)
        .collect();
    assert_eq!(colors, vec!["#00ff00", "#00ff00", ""]);
}

#[test]
fn update_many_with_replacements_honors_registered_predicates() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Position>::new(&conn);
    let titles = Repository::<Title>::new(&conn);
    for name in ["Backend", "Frontend", "Designer"] {
        let position = repo.insert(Position::new(name)).unwrap();
        let mut title = Title::new(format!("{name} Lead"));
        title.position_id = Some(position.id);
        titles.insert(title).unwrap();
    }

    let changed = repo
        .with_filter(Filter::Like(PositionColumn::Name, "%end".to_string()))
        .with_associations([TITLES])
        .with_replacement(TITLES, Vec::new())
        .update_many(
            &[1, 2, 3],
            &Patch::new().set(PositionColumn::Color, "#00ff00".to_string()),
        )
        .unwrap();
    assert_eq!(changed, 2);

    let rows = repo.with_preloads([TITLES]).find_all().unwrap();
    let colors: Vec<&str> = rows.iter().map(|row| row.color.as_str()).collect();
    assert_eq!(colors, vec!["#00ff00", "#00ff00", ""]);
    let title_ids: Vec<Option<Vec<i64>>> = rows.iter().map(|row| row.title_ids.clone()).collect();
    assert_eq!(title_ids, vec![Some(Vec::new()), Some(Vec::new()), Some(vec![3])]);

    let none = repo
        .with_filter(Filter::Eq(PositionColumn::Name, Value::Text("Nobody".to_string())))
        .with_associations([TITLES])
        .with_replacement(TITLES, vec![1])
        .update_many(&[1, 2, 3], &Patch::new())
        .unwrap();
    assert_eq!(none, 0);
    assert_eq!(titles.find_by_id(1).unwrap().position_id, None);
}

#[test]
fn update_by_id_returns_the_row_before_the_write() {
    let conn = open_db_in_memory().unwrap();
    let repo = seed_departments(&conn);

    let before = repo
        .update_by_id(
            2,
            &Patch::new().set(DepartmentColumn::Name, "Treasury".to_string()),
        )
        .unwrap();
    assert_eq!(before.name, "Finance");
    assert_eq!(repo.find_by_id(2).unwrap().name, "Treasury");
}

#[test]
fn configuration_templates_can_be_reused_across_repositories() {
    let conn = open_db_in_memory().unwrap();
    seed_departments(&conn);

    let template = QueryConfig::<Department>::new()
        .with_order(DepartmentColumn::Name, SortDirection::Desc)
        .with_limit(2);
    let rows = Repository::from_config(&conn, template.clone())
        .find_all()
        .unwrap();
    assert_eq!(department_names(&rows), vec!["Operations", "Finance"]);
    assert_eq!(template.limit(), Some(2));
}

#[test]
fn finders_respect_the_soft_delete_scope() {
    let conn = open_db_in_memory().unwrap();
    let departments: DepartmentRepository<'_> = seed_departments(&conn);
    let divisions = DivisionRepository::new(&conn);
    divisions.insert(Division::new("Platform", 1)).unwrap();
    divisions.insert(Division::new("Payroll", 2)).unwrap();
    divisions.insert(Division::new("Infrastructure", 1)).unwrap();

    let found = departments.find_by_code("fin-002").unwrap().unwrap();
    assert_eq!(found.name, "Finance");
    assert!(departments.find_by_code("xyz-999").unwrap().is_none());

    let paged = departments.with_cursor(2).with_limit(1);
    assert_eq!(paged.find_by_code("eng-001").unwrap().unwrap().id, 1);
    assert_eq!(department_names(&paged.find_all().unwrap()), vec!["Operations"]);

    let in_engineering = divisions.find_by_department(1).unwrap();
    assert_eq!(division_names(&in_engineering), vec!["Platform", "Infrastructure"]);

    divisions.remove_by_id(1).unwrap();
    assert_eq!(division_names(&divisions.find_by_department(1).unwrap()), vec!["Infrastructure"]);
    assert_eq!(divisions.with_unscoped().find_by_department(1).unwrap().len(), 2);
    assert!(divisions.find_by_code("pla-001").unwrap().is_none());
}
