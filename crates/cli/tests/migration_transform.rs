//! End-to-end tests of the migration transform pipeline: default mapping,
//! custom mapping files, and the dry-run-equivalent translation path over
//! realistic legacy rows. No database involved; the transform layer is
//! pure.

use chrono::{NaiveDate, TimeZone, Utc};
use referee_manager_cli::services::data_migration::{transform_row, MigratedRow, TransformContext};
use referee_manager_cli::services::mapping::MappingConfig;

fn context() -> TransformContext {
    let now = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let mut ctx = TransformContext::new(now);
    ctx.add_zone("Zone 1", 1);
    ctx.add_zone("Z1", 1);
    ctx.add_zone("Zone 2", 2);
    ctx.add_zone("Z2", 2);
    ctx.add_type("Regional", 3);
    ctx
}

#[test]
fn legacy_fixture_rows_translate_in_dependency_order() {
    let mapping = MappingConfig::default();
    let mut ctx = context();

    let users = [
        serde_json::json!({
            "id": 1, "name": " Anna Bianchi ", "email": "ANNA@golf.it",
            "phone": "333 123 4567", "zone": "Z1", "role": "referee",
            "created_at": "2019-02-11 09:00:00"
        }),
        serde_json::json!({
            "id": 2, "name": "Bruno Verdi", "email": "anna@golf.it",
            "zone": "zone 2", "role": "ADMIN"
        }),
    ];
    for row in &users {
        let migrated = transform_row(&mapping.tables["old_users"], row, &ctx).unwrap();
        ctx.register(&migrated);
    }

    let club_row = serde_json::json!({
        "id": 10, "code": "GC-RM", "name": "Golf Club Roma",
        "email": "info@gcroma.it", "zone": "Zone 1"
    });
    let club = transform_row(&mapping.tables["old_clubs"], &club_row, &ctx).unwrap();
    ctx.register(&club);

    let tournament_row = serde_json::json!({
        "id": 100, "name": "Spring Open", "club": 10, "zone": "Z1",
        "type": "regional", "start_date": "2024-05-01", "end_date": "2024-05-03"
    });
    let tournament = transform_row(&mapping.tables["old_tournaments"], &tournament_row, &ctx).unwrap();
    ctx.register(&tournament);

    let assignment_row = serde_json::json!({
        "id": 500, "tournament": 100, "user": 1, "role": "chief", "confirmed": 1
    });
    let assignment =
        transform_row(&mapping.tables["old_assignments"], &assignment_row, &ctx).unwrap();

    match assignment {
        MigratedRow::Assignment(a) => {
            assert_eq!(a.tournament_id, 100);
            assert_eq!(a.user_id, 1);
            assert_eq!(a.role, "chief");
            assert!(a.is_confirmed);
        }
        other => panic!("expected assignment, got {:?}", other),
    }

    match tournament {
        MigratedRow::Tournament(t) => {
            assert_eq!(t.club_id, Some(10));
            assert_eq!(t.zone_id, 1);
            assert_eq!(t.tournament_type_id, Some(3));
            assert_eq!(t.start_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        }
        other => panic!("expected tournament, got {:?}", other),
    }
}

#[test]
fn duplicate_emails_get_incrementing_suffixes() {
    let mapping = MappingConfig::default();
    let mut ctx = context();

    let mut emails = Vec::new();
    for id in 1..=3 {
        let row = serde_json::json!({
            "id": id, "name": format!("User {}", id),
            "email": "shared@golf.it", "zone": "Z1"
        });
        let migrated = transform_row(&mapping.tables["old_users"], &row, &ctx).unwrap();
        if let MigratedRow::User(user) = &migrated {
            emails.push(user.email.clone());
        }
        ctx.register(&migrated);
    }

    assert_eq!(emails, vec!["shared@golf.it", "shared1@golf.it", "shared2@golf.it"]);
}

#[test]
fn custom_mapping_file_renames_source_columns() {
    let path = std::env::temp_dir().join(format!("refman_custom_mapping_{}.json", std::process::id()));
    std::fs::write(
        &path,
        r#"{
            "tables": {
                "old_users": {
                    "target": "users",
                    "columns": {
                        "user_id": "id",
                        "full_name": "name",
                        "mail_address": "email",
                        "district": "zone_mapping"
                    }
                }
            }
        }"#,
    )
    .unwrap();

    let mapping = MappingConfig::load(Some(path.as_path())).unwrap();
    let ctx = context();
    let row = serde_json::json!({
        "user_id": 7, "full_name": "Carla Neri",
        "mail_address": "carla@golf.it", "district": "Zone 2"
    });
    match transform_row(&mapping.tables["old_users"], &row, &ctx).unwrap() {
        MigratedRow::User(user) => {
            assert_eq!(user.id, 7);
            assert_eq!(user.name, "Carla Neri");
            assert_eq!(user.zone_id, Some(2));
        }
        other => panic!("expected user, got {:?}", other),
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn bad_rows_fail_individually() {
    let mapping = MappingConfig::default();
    let ctx = context();

    // Unresolvable zone.
    let row = serde_json::json!({"id": 1, "name": "X", "zone": "Atlantis"});
    assert!(transform_row(&mapping.tables["old_users"], &row, &ctx).is_err());

    // The next row is unaffected by the previous failure.
    let row = serde_json::json!({"id": 2, "name": "Y", "zone": "Z1"});
    assert!(transform_row(&mapping.tables["old_users"], &row, &ctx).is_ok());
}
