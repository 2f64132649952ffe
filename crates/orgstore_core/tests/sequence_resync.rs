use orgstore_core::db::open_db_in_memory;
use orgstore_core::model::{Department, Level, Position};
use orgstore_core::repo::{sequence, RepoError, Repository};
use rusqlite::Connection;

fn seed_positions(conn: &Connection, count: usize) -> Vec<i64> {
    let repo = Repository::<Position>::new(conn);
    (1..=count)
        .map(|n| repo.insert(Position::new(format!("Position {n}"))).unwrap().id)
        .collect()
}

fn ids(rows: &[Position]) -> Vec<i64> {
    rows.iter().map(|row| row.id).collect()
}

#[test]
fn inserts_draw_ids_from_the_sequence() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(seed_positions(&conn, 3), vec![1, 2, 3]);
    assert_eq!(sequence::peek(&conn, "positions_seq").unwrap(), 4);
}

#[test]
fn purge_then_insert_reuses_the_deleted_max_id_and_soft_delete_keeps_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Position>::new(&conn);
    assert_eq!(seed_positions(&conn, 5), vec![1, 2, 3, 4, 5]);

    repo.with_unscoped().remove_by_id(5).unwrap();
    let inserted = repo.insert(Position::new("Replacement")).unwrap();
    assert_eq!(inserted.id, 5);
    assert_eq!(inserted.code, "5");

    repo.remove_by_id(3).unwrap();
    assert_eq!(ids(&repo.find_all().unwrap()), vec![1, 2, 4, 5]);
    assert_eq!(
        ids(&repo.with_unscoped().find_all().unwrap()),
        vec![1, 2, 3, 4, 5]
    );
}

#[test]
fn deleting_the_max_row_of_n_rows_makes_the_next_insert_receive_n() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Level>::new(&conn);
    for n in 1..=4 {
        repo.insert(Level::new(format!("L{n}"))).unwrap();
    }

    repo.with_unscoped().remove_by_id(4).unwrap();
    assert_eq!(sequence::peek(&conn, "levels_seq").unwrap(), 4);
    assert_eq!(repo.insert(Level::new("L-next")).unwrap().id, 4);
}

#[test]
fn bulk_purge_resyncs_with_the_same_convention() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Position>::new(&conn);
    seed_positions(&conn, 5);

    let removed = repo.with_unscoped().remove_many(&[4, 5]).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(sequence::peek(&conn, "positions_seq").unwrap(), 4);

    repo.with_unscoped().remove_many(&[1, 2, 3]).unwrap();
    assert_eq!(sequence::peek(&conn, "positions_seq").unwrap(), 1);
}

#[test]
fn deleting_a_middle_row_does_not_move_the_sequence() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Position>::new(&conn);
    seed_positions(&conn, 5);

    repo.with_unscoped().remove_by_id(2).unwrap();
    assert_eq!(sequence::peek(&conn, "positions_seq").unwrap(), 6);
}

#[test]
fn explicit_ids_advance_the_sequence() {
    let conn = open_db_in_memory().unwrap();
    let repo = Repository::<Department>::new(&conn);

    let mut explicit = Department::new("Finance");
    explicit.id = 10;
    assert_eq!(repo.insert(explicit).unwrap().id, 10);
    assert_eq!(repo.insert(Department::new("Legal")).unwrap().id, 11);

    let mut lower = Department::new("Audit");
    lower.id = 3;
    repo.insert(lower).unwrap();
    assert_eq!(sequence::peek(&conn, "departments_seq").unwrap(), 12);
}

#[test]
fn manual_drift_is_repaired_by_resync_all() {
    let conn = open_db_in_memory().unwrap();
    seed_positions(&conn, 3);
    conn.execute(
        "UPDATE sequences SET next_value = 40 WHERE name = 'positions_seq';",
        [],
    )
    .unwrap();

    let states = sequence::resync_all(&conn).unwrap();
    let positions = states
        .iter()
        .find(|state| state.table_name == "positions")
        .unwrap();
    assert_eq!(positions.next_value, 4);
    let users = states
        .iter()
        .find(|state| state.table_name == "users")
        .unwrap();
    assert_eq!(users.next_value, 1);
}

#[test]
fn resync_table_resolves_tables_through_the_registry() {
    let conn = open_db_in_memory().unwrap();
    seed_positions(&conn, 2);

    let state = sequence::resync_table(&conn, "positions").unwrap();
    assert_eq!(state.name, "positions_seq");
    assert_eq!(state.next_value, 3);

    let err = sequence::resync_table(&conn, "positions; DROP TABLE users").unwrap_err();
    assert!(matches!(err, RepoError::MissingSequence(_)));
}

#[test]
fn unknown_sequence_is_reported() {
    let conn = open_db_in_memory().unwrap();
    let err = sequence::next_value(&conn, "ghost_seq").unwrap_err();
    assert!(matches!(err, RepoError::MissingSequence(name) if name == "ghost_seq"));
}
