use orgstore_core::db::open_db_in_memory;
use orgstore_core::model::code::is_tombstone;
use orgstore_core::model::role::PERMISSIONS;
use orgstore_core::model::user::ROLES;
use orgstore_core::model::{
    Department, DepartmentColumn, Division, Permission, Role, RoleColumn, User, UserColumn,
};
use orgstore_core::repo::{Patch, UserRepository};
use orgstore_core::service::{
    AccessService, CatalogService, ConstraintKind, ListFilter, ServiceError, UserService,
    UserUpdate,
};

#[test]
fn department_codes_are_tombstoned_on_delete_and_regenerated_on_restore() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);

    let created = service.create(Department::new("Engineering")).unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.code.as_deref(), Some("eng-001"));

    service.delete(created.id, false).unwrap();
    assert!(service.get(created.id, &[]).unwrap_err().is_not_found());
    let buried = service
        .repository()
        .with_unscoped()
        .find_by_id(created.id)
        .unwrap();
    assert!(buried.deleted_at.is_some());
    let tombstone = buried.code.unwrap();
    assert!(is_tombstone("departments", &tombstone), "{tombstone}");
    assert!(tombstone.starts_with("departments-deleted-1-"));

    let restored = service.restore(created.id).unwrap();
    assert!(restored.deleted_at.is_none());
    assert_eq!(restored.code.as_deref(), Some("eng-001"));
}

#[test]
fn tombstoned_code_is_free_for_a_new_row() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);
    service.create(Department::new("Finance")).unwrap();
    service.delete(1, false).unwrap();

    let mut reuse = Department::new("Treasury");
    reuse.code = Some("fin-001".to_string());
    let created = service.create(reuse).unwrap();
    assert_eq!(created.id, 2);
    assert_eq!(created.code.as_deref(), Some("fin-001"));
}

#[test]
fn duplicate_department_name_is_a_unique_violation() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);
    service.create(Department::new("Engineering")).unwrap();

    let err = service.create(Department::new("Engineering")).unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
    assert_eq!(service.list(&ListFilter::default()).unwrap().len(), 1);
}

#[test]
fn restoring_through_update_regenerates_the_code() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);
    service.create(Department::new("Operations")).unwrap();
    service.delete(1, false).unwrap();

    let updated = service
        .update(
            1,
            Patch::new()
                .set_null(DepartmentColumn::DeletedAt)
                .set(DepartmentColumn::Name, "Ops".to_string()),
        )
        .unwrap();
    assert!(updated.deleted_at.is_none());
    assert_eq!(updated.name, "Ops");
    assert_eq!(updated.code.as_deref(), Some("ope-001"));
}

#[test]
fn list_filter_sorts_searches_and_shows_deleted_rows() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);
    for name in ["Engineering", "Finance", "Legal", "Sales"] {
        service.create(Department::new(name)).unwrap();
    }
    assert_eq!(service.delete_many(&[3, 4], false).unwrap(), 2);

    let sorted = service
        .list(&ListFilter {
            sort: Some("name".to_string()),
            order: Some("desc".to_string()),
            ..ListFilter::default()
        })
        .unwrap();
    let names: Vec<&str> = sorted.iter().map(|row| row.name.as_str()).collect();
    assert_eq!(names, vec!["Finance", "Engineering"]);

    let searched = service
        .list(&ListFilter {
            name: Some("ENG".to_string()),
            ..ListFilter::default()
        })
        .unwrap();
    assert_eq!(searched.len(), 1);
    assert_eq!(searched[0].name, "Engineering");

    let deleted = service
        .list(&ListFilter {
            show_deleted: true,
            ..ListFilter::default()
        })
        .unwrap();
    let ids: Vec<i64> = deleted.iter().map(|row| row.id).collect();
    assert_eq!(ids, vec![3, 4]);

    let err = service
        .list(&ListFilter {
            sort: Some("budget".to_string()),
            ..ListFilter::default()
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    assert_eq!(service.restore_many(&[3, 4, 1]).unwrap(), 2);
    assert_eq!(service.list(&ListFilter::default()).unwrap().len(), 4);
}

#[test]
fn list_filter_deserializes_with_defaults() {
    let filter: ListFilter =
        serde_json::from_str(r#"{"sort":"name","limit":10,"cursor":5}"#).unwrap();
    assert_eq!(filter.sort.as_deref(), Some("name"));
    assert_eq!(filter.limit, Some(10));
    assert_eq!(filter.cursor, Some(5));
    assert!(filter.preload.is_empty());
    assert!(!filter.show_deleted);
}

#[test]
fn find_by_email_ignores_a_configured_cursor() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(&conn);
    service.create(User::new("Ada", "ada@example.com", "secret")).unwrap();
    service.create(User::new("Brook", "brook@example.com", "secret")).unwrap();

    let paged = UserRepository::new(&conn).with_cursor(1).with_limit(1);
    let ada = paged.find_by_email("ada@example.com").unwrap().unwrap();
    assert_eq!(ada.name, "Ada");
    let page: Vec<String> = paged.find_all().unwrap().into_iter().map(|row| row.name).collect();
    assert_eq!(page, vec!["Brook"]);
}

#[test]
fn list_cursor_pages_only_under_id_ordering() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);
    for name in ["Zeta", "Alpha", "Mid", "Beta"] {
        service.create(Department::new(name)).unwrap();
    }

    let err = service
        .list(&ListFilter {
            sort: Some("name".to_string()),
            limit: Some(2),
            cursor: Some(0),
            ..ListFilter::default()
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let err = service
        .list(&ListFilter {
            order: Some("desc".to_string()),
            cursor: Some(0),
            ..ListFilter::default()
        })
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let mut names = Vec::new();
    let mut cursor = 0;
    loop {
        let page = service
            .list(&ListFilter {
                sort: Some("id".to_string()),
                order: Some("ASC".to_string()),
                limit: Some(2),
                cursor: Some(cursor),
                ..ListFilter::default()
            })
            .unwrap();
        let Some(last) = page.last() else {
            break;
        };
        cursor = last.id;
        names.extend(page.into_iter().map(|row| row.name));
    }
    assert_eq!(names, vec!["Zeta", "Alpha", "Mid", "Beta"]);
}

#[test]
fn permanent_delete_purges_the_row() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);
    service.create(Department::new("Engineering")).unwrap();
    service.create(Department::new("Finance")).unwrap();

    service.delete(2, true).unwrap();
    assert!(service
        .repository()
        .with_unscoped()
        .find_by_id(2)
        .unwrap_err()
        .is_not_found());
    assert_eq!(service.create(Department::new("Legal")).unwrap().id, 2);

    let err = service.delete_many(&[], true).unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));
}

#[test]
fn division_with_unknown_department_is_a_foreign_key_violation() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Division>::new(&conn);

    let err = service.create(Division::new("Platform", 99)).unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::ForeignKey));
}

#[test]
fn missing_rows_map_to_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = CatalogService::<Department>::new(&conn);

    let err = service
        .update(7, Patch::new().set(DepartmentColumn::Name, "Ghost".to_string()))
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::NotFound {
            table: "departments",
            id: 7
        }
    ));
    assert!(service.restore(7).unwrap_err().is_not_found());
}

#[test]
fn users_are_created_with_hashed_passwords_and_generated_codes() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(&conn);

    let user = service
        .create(User::new("Ada", "ada@example.com", "correct horse"))
        .unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.code.as_deref(), Some("KRY0001"));
    assert!(user.password.starts_with("$argon2"));
    assert!(user.is_password_default);

    let stored = service.get(1, &[]).unwrap();
    assert_eq!(stored.password, user.password);
    assert_ne!(stored.password, "correct horse");
}

#[test]
fn authentication_checks_email_and_password() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(&conn);
    service
        .create(User::new("Ada", "ada@example.com", "correct horse"))
        .unwrap();

    let user = service
        .authenticate(" ada@example.com ", "correct horse")
        .unwrap();
    assert_eq!(user.id, 1);
    assert!(matches!(
        service.authenticate("ada@example.com", "wrong").unwrap_err(),
        ServiceError::InvalidCredentials
    ));
    assert!(matches!(
        service.authenticate("nobody@example.com", "correct horse").unwrap_err(),
        ServiceError::InvalidCredentials
    ));

    service.delete(1, false).unwrap();
    assert!(service.find_by_email("ada@example.com").unwrap().is_none());
}

#[test]
fn change_password_requires_the_old_password() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(&conn);
    service
        .create(User::new("Ada", "ada@example.com", "first"))
        .unwrap();

    assert!(matches!(
        service.change_password(1, "guess", "second").unwrap_err(),
        ServiceError::InvalidCredentials
    ));
    service.change_password(1, "first", "second").unwrap();

    let user = service.authenticate("ada@example.com", "second").unwrap();
    assert!(!user.is_password_default);
    assert!(service.authenticate("ada@example.com", "first").is_err());
}

#[test]
fn bulk_user_creation_is_all_or_nothing() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(&conn);

    let err = service
        .create_many(vec![
            User::new("Ada", "ada@example.com", "secret"),
            User::new("Brook", "brook@example.com", ""),
        ])
        .unwrap_err();
    match err {
        ServiceError::InvalidInput(message) => assert!(message.contains("index 1"), "{message}"),
        other => panic!("unexpected error: {other}"),
    }

    let err = service
        .create_many(vec![
            User::new("Ada", "ada@example.com", "secret"),
            User::new("Ada Again", "ada@example.com", "secret"),
        ])
        .unwrap_err();
    assert_eq!(err.constraint_kind(), Some(ConstraintKind::Unique));
    assert_eq!(service.repository().with_unscoped().count().unwrap(), 0);
}

#[test]
fn user_update_hashes_passwords_and_replaces_roles() {
    let conn = open_db_in_memory().unwrap();
    let access = AccessService::new(&conn);
    let admin = access.create_role(Role::new("admin")).unwrap();
    let viewer = access.create_role(Role::new("viewer")).unwrap();

    let service = UserService::new(&conn);
    let mut ada = User::new("Ada", "ada@example.com", "secret");
    ada.role_ids = Some(vec![admin.id]);
    let created = service.create(ada).unwrap();
    assert_eq!(created.role_ids, Some(vec![admin.id]));

    let updated = service
        .update(
            created.id,
            UserUpdate::patch(Patch::new().set(UserColumn::Password, "rotated".to_string()))
                .with_roles(vec![viewer.id]),
        )
        .unwrap();
    assert_eq!(updated.role_ids, Some(vec![viewer.id]));
    assert!(updated.password.starts_with("$argon2"));
    assert!(service.authenticate("ada@example.com", "rotated").is_ok());

    let renamed = service
        .update(
            created.id,
            UserUpdate::patch(Patch::new().set(UserColumn::Name, "Ada L.".to_string())),
        )
        .unwrap();
    assert_eq!(renamed.name, "Ada L.");
    let reloaded = service.get(created.id, &[ROLES]).unwrap();
    assert_eq!(reloaded.role_ids, Some(vec![viewer.id]));
}

#[test]
fn deleted_user_is_restored_with_its_code() {
    let conn = open_db_in_memory().unwrap();
    let service = UserService::new(&conn);
    service
        .create(User::new("Ada", "ada@example.com", "secret"))
        .unwrap();

    service.delete(1, false).unwrap();
    let buried = service
        .repository()
        .with_unscoped()
        .find_by_id(1)
        .unwrap();
    assert!(is_tombstone("users", buried.code.as_deref().unwrap_or_default()));

    let restored = service.restore(1).unwrap();
    assert_eq!(restored.code.as_deref(), Some("KRY0001"));
}

#[test]
fn roles_and_permissions_link_both_ways() {
    let conn = open_db_in_memory().unwrap();
    let access = AccessService::new(&conn);
    let read = access.create_permission(Permission::new("read")).unwrap();
    let write = access.create_permission(Permission::new("write")).unwrap();

    let mut editor = Role::new("editor");
    editor.permission_ids = Some(vec![read.id, write.id]);
    let editor = access.create_role(editor).unwrap();
    let loaded = access.get_role(editor.id, &[PERMISSIONS]).unwrap();
    assert_eq!(loaded.permission_ids, Some(vec![read.id, write.id]));

    let updated = access
        .update_role(
            editor.id,
            Patch::new().set(RoleColumn::Name, "writer".to_string()),
            Some(vec![write.id]),
            None,
        )
        .unwrap();
    assert_eq!(updated.name, "writer");
    assert_eq!(updated.permission_ids, Some(vec![write.id]));
    assert_eq!(updated.user_ids, None);

    let mut audit = Permission::new("audit");
    audit.role_ids = Some(vec![editor.id]);
    let audit = access.create_permission(audit).unwrap();
    let loaded = access.get_role(editor.id, &[PERMISSIONS]).unwrap();
    assert_eq!(loaded.permission_ids, Some(vec![write.id, audit.id]));

    access.delete_permission(write.id).unwrap();
    let loaded = access.get_role(editor.id, &[PERMISSIONS]).unwrap();
    assert_eq!(loaded.permission_ids, Some(vec![audit.id]));
}

#[test]
fn deleting_a_role_removes_user_links() {
    let conn = open_db_in_memory().unwrap();
    let access = AccessService::new(&conn);
    let users = UserService::new(&conn);
    users
        .create(User::new("Ada", "ada@example.com", "secret"))
        .unwrap();

    let role = access
        .update_role(
            access.create_role(Role::new("admin")).unwrap().id,
            Patch::new(),
            None,
            Some(vec![1]),
        )
        .unwrap();
    assert_eq!(role.user_ids, Some(vec![1]));
    assert_eq!(users.get(1, &[ROLES]).unwrap().role_ids, Some(vec![role.id]));

    access.delete_role(role.id).unwrap();
    assert!(access.get_role(role.id, &[]).unwrap_err().is_not_found());
    assert_eq!(users.get(1, &[ROLES]).unwrap().role_ids, Some(Vec::new()));
    assert!(access.list_roles(&ListFilter::default()).unwrap().is_empty());
}
