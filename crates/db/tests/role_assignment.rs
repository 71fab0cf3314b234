//! Integration tests for role assignment and the audit trail.

use assert_matches::assert_matches;
use rolegate_core::audit::AuditAction;
use rolegate_db::models::role::Role;
use rolegate_db::models::user_role::{AssignOutcome, AssignRole};
use rolegate_db::repositories::{AuditRepo, RoleRepo, UserRoleRepo};
use sqlx::PgPool;
use uuid::Uuid;

async fn role(pool: &PgPool, name: &str) -> Role {
    RoleRepo::find_by_name(pool, name)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("seed role {name} missing"))
}

fn assign(user_id: Uuid, role: &Role, by: Option<Uuid>, expected: Option<Uuid>) -> AssignRole {
    AssignRole {
        user_id,
        role_id: role.id,
        assigned_by: by,
        expected_role_id: expected,
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_bootstrap_and_seed_roles(pool: PgPool) {
    rolegate_db::health_check(&pool).await.unwrap();

    let roles = RoleRepo::list(&pool).await.unwrap();
    let names: Vec<_> = roles.iter().map(|r| (r.name.as_str(), r.level)).collect();
    assert_eq!(
        names,
        vec![("user", 1), ("moderator", 2), ("admin", 3), ("super_admin", 4)]
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_first_assignment_inserts_and_audits(pool: PgPool) {
    let user = role(&pool, "user").await;
    let subject = Uuid::new_v4();

    let outcome = UserRoleRepo::assign(&pool, &assign(subject, &user, None, None))
        .await
        .unwrap();
    assert_matches!(
        outcome,
        AssignOutcome::Assigned { action: AuditAction::Insert, old_role_id: None, .. }
    );

    let current = UserRoleRepo::find_for_user(&pool, subject).await.unwrap().unwrap();
    assert_eq!(current.role_name, "user");
    assert_eq!(current.role_level, 1);

    let entries = AuditRepo::list_page(&pool, 50, 0).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].action, "INSERT");
    assert_eq!(entries[0].user_id, Some(subject));
    assert_eq!(entries[0].old_role_name, None);
    assert_eq!(entries[0].new_role_name.as_deref(), Some("user"));
    assert_eq!(entries[0].changed_by, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_reassignment_updates_and_records_old_role(pool: PgPool) {
    let user = role(&pool, "user").await;
    let moderator = role(&pool, "moderator").await;
    let subject = Uuid::new_v4();
    let actor = Uuid::new_v4();

    UserRoleRepo::assign(&pool, &assign(subject, &user, None, None))
        .await
        .unwrap();
    let outcome = UserRoleRepo::assign(&pool, &assign(subject, &moderator, Some(actor), Some(user.id)))
        .await
        .unwrap();

    assert_matches!(
        outcome,
        AssignOutcome::Assigned { action: AuditAction::Update, old_role_id: Some(old), ref user_role, .. }
            if old == user.id && user_role.updated_by == Some(actor)
    );

    let entries = AuditRepo::list_page(&pool, 50, 0).await.unwrap();
    assert_eq!(AuditRepo::count(&pool).await.unwrap(), 2);
    let newest = &entries[0];
    assert_eq!(newest.action, "UPDATE");
    assert_eq!(newest.old_role_name.as_deref(), Some("user"));
    assert_eq!(newest.old_role_level, Some(1));
    assert_eq!(newest.new_role_name.as_deref(), Some("moderator"));
    assert_eq!(newest.changed_by, Some(actor));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_same_role_is_unchanged_and_not_audited(pool: PgPool) {
    let user = role(&pool, "user").await;
    let subject = Uuid::new_v4();

    UserRoleRepo::assign(&pool, &assign(subject, &user, None, None))
        .await
        .unwrap();
    let outcome = UserRoleRepo::assign(&pool, &assign(subject, &user, None, Some(user.id)))
        .await
        .unwrap();

    assert_matches!(outcome, AssignOutcome::Unchanged(_));
    assert_eq!(AuditRepo::count(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_stale_expectation_writes_nothing(pool: PgPool) {
    let user = role(&pool, "user").await;
    let moderator = role(&pool, "moderator").await;
    let subject = Uuid::new_v4();

    UserRoleRepo::assign(&pool, &assign(subject, &moderator, None, None))
        .await
        .unwrap();

    // Caller still believes the user holds no role.
    let outcome = UserRoleRepo::assign(&pool, &assign(subject, &user, None, None))
        .await
        .unwrap();
    assert_matches!(
        outcome,
        AssignOutcome::Stale { current_role_id: Some(id) } if id == moderator.id
    );

    let current = UserRoleRepo::find_for_user(&pool, subject).await.unwrap().unwrap();
    assert_eq!(current.role_id, moderator.id);
    assert_eq!(AuditRepo::count(&pool).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_racing_first_assignments_write_once(pool: PgPool) {
    let user = role(&pool, "user").await;
    let moderator = role(&pool, "moderator").await;

    for _ in 0..10 {
        let subject = Uuid::new_v4();
        let first = assign(subject, &user, None, None);
        let second = assign(subject, &moderator, None, None);
        let (a, b) = tokio::join!(
            UserRoleRepo::assign(&pool, &first),
            UserRoleRepo::assign(&pool, &second),
        );
        let outcomes = [a.unwrap(), b.unwrap()];

        let assigned: Vec<_> = outcomes
            .iter()
            .filter_map(|o| match o {
                AssignOutcome::Assigned { user_role, .. } => Some(user_role.role_id),
                _ => None,
            })
            .collect();
        assert_eq!(assigned.len(), 1, "exactly one writer wins: {outcomes:?}");
        assert!(outcomes.iter().any(|o| matches!(
            o,
            AssignOutcome::Stale { current_role_id: Some(id) } if *id == assigned[0]
        )));

        let current = UserRoleRepo::find_for_user(&pool, subject).await.unwrap().unwrap();
        assert_eq!(current.role_id, assigned[0]);
    }

    assert_eq!(AuditRepo::count(&pool).await.unwrap(), 10);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_visible_filters_by_level(pool: PgPool) {
    let user = role(&pool, "user").await;
    let admin = role(&pool, "admin").await;
    let super_admin = role(&pool, "super_admin").await;

    for r in [&user, &admin, &super_admin] {
        UserRoleRepo::assign(&pool, &assign(Uuid::new_v4(), r, None, None))
            .await
            .unwrap();
    }

    let visible = UserRoleRepo::list_visible(&pool, admin.level).await.unwrap();
    let levels: Vec<i32> = visible.iter().map(|r| r.role_level).collect();
    assert_eq!(levels, vec![3, 1]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_audit_pages_are_newest_first(pool: PgPool) {
    let user = role(&pool, "user").await;
    let mut subjects = Vec::new();
    for _ in 0..3 {
        let subject = Uuid::new_v4();
        UserRoleRepo::assign(&pool, &assign(subject, &user, None, None))
            .await
            .unwrap();
        subjects.push(subject);
    }

    let first = AuditRepo::list_page(&pool, 2, 0).await.unwrap();
    let second = AuditRepo::list_page(&pool, 2, 2).await.unwrap();
    assert_eq!(first[0].user_id, Some(subjects[2]));
    assert_eq!(first[1].user_id, Some(subjects[1]));
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].user_id, Some(subjects[0]));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_audit_rows_cannot_be_changed(pool: PgPool) {
    let user = role(&pool, "user").await;
    UserRoleRepo::assign(&pool, &assign(Uuid::new_v4(), &user, None, None))
        .await
        .unwrap();

    let update = sqlx::query("UPDATE user_roles_audit SET changed_by = gen_random_uuid()")
        .execute(&pool)
        .await;
    assert!(update.is_err(), "audit rows must reject UPDATE");

    let delete = sqlx::query("DELETE FROM user_roles_audit").execute(&pool).await;
    assert!(delete.is_err(), "audit rows must reject DELETE");

    assert_eq!(AuditRepo::count(&pool).await.unwrap(), 1);
}
