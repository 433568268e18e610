mod common;

use inventory_pro::{database::Database, models::UserRole, seed_admin, state::AppState};

#[tokio::test]
async fn seeds_the_first_admin_once() {
    let mut config = common::test_config();
    config.admin_email = Some("root@test.cl".to_string());
    config.admin_password = Some("inicial123".to_string());
    let state = AppState::new(Database::memory(), config);

    seed_admin(&state).await.unwrap();
    seed_admin(&state).await.unwrap();

    assert_eq!(state.db.users.count().await.unwrap(), 1);
    let admin = state
        .db
        .users
        .find_by_email("root@test.cl")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, UserRole::Admin);
    assert!(admin.active);
}

#[tokio::test]
async fn seeding_without_credentials_is_a_no_op() {
    let state = AppState::new(Database::memory(), common::test_config());
    seed_admin(&state).await.unwrap();
    assert_eq!(state.db.users.count().await.unwrap(), 0);
}
