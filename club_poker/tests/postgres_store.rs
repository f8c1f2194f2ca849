//! Integration tests for the PostgreSQL tournament store.
//!
//! These need a live database and are ignored by default:
//!
//! ```text
//! DATABASE_URL=postgres://postgres@localhost/club_poker_test cargo test -- --ignored
//! ```

use club_poker::TournamentError;
use club_poker::db::{Database, DatabaseConfig, TournamentStore};
use club_poker::points::{NewPointsAllocation, NewPointsSystem};
use club_poker::settlement::RakePolicy;
use club_poker::tournament::{
    EliminationRequest, NewTournament, RegistrationUpdate, TournamentId, TournamentManager,
    TournamentStatus, TournamentUpdate,
};
use rust_decimal::Decimal;
use serial_test::serial;
use std::sync::Arc;

/// Helper to create a migrated test database
async fn setup_test_db() -> Database {
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://postgres@localhost/club_poker_test".to_string());

    let config = DatabaseConfig {
        database_url,
        max_connections: 5,
        min_connections: 1,
        connection_timeout_secs: 5,
        idle_timeout_secs: 300,
        max_lifetime_secs: 1800,
    };

    let db = Database::new(&config)
        .await
        .expect("Failed to create test database");
    db.migrate().await.expect("Failed to run migrations");
    db
}

/// Helper to cleanup a test tournament and everything hanging off it
async fn cleanup_tournament(db: &Database, tournament_id: TournamentId) {
    let _ = sqlx::query("DELETE FROM tournaments WHERE id = $1")
        .bind(tournament_id)
        .execute(db.pool())
        .await;
}

fn status(status: TournamentStatus) -> TournamentUpdate {
    TournamentUpdate {
        status: Some(status),
        ..Default::default()
    }
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_postgres_full_settlement() {
    let db = setup_test_db().await;
    let manager = TournamentManager::new(Arc::new(db.tournament_store()));

    let table = manager
        .create_points_system(&NewPointsSystem {
            season_id: 2026,
            name: "PG League".to_string(),
            participation_points: 10,
            knockout_points: 5,
            allocations: vec![
                NewPointsAllocation {
                    position: 1,
                    position_end: None,
                    points: 100,
                },
                NewPointsAllocation {
                    position: 2,
                    position_end: Some(3),
                    points: 60,
                },
            ],
        })
        .await
        .unwrap();

    let mut config = NewTournament::new(1, "PG Freezeout", Decimal::new(5000, 2));
    config.buy_in_rake = RakePolicy::percentage(Decimal::from(10));
    config.track_points = true;
    config.points_system_id = Some(table.system().id);
    let tournament = manager.create_tournament(&config).await.unwrap();

    manager
        .update_tournament(tournament.id, &status(TournamentStatus::Registration))
        .await
        .unwrap();
    let mut regs = Vec::new();
    for player in 1..=8 {
        regs.push(manager.register_player(tournament.id, player).await.unwrap());
    }
    manager
        .update_tournament(tournament.id, &status(TournamentStatus::InProgress))
        .await
        .unwrap();

    for reg in regs[3..].iter().rev() {
        manager
            .update_registration(
                reg.id,
                &RegistrationUpdate {
                    eliminate: Some(EliminationRequest {
                        eliminated_by: Some(regs[0].id),
                        at: None,
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let report = manager.finalize(tournament.id).await.unwrap();
    assert_eq!(report.summary.prize_pool.distributable(), Decimal::from(360));
    assert!(report.points_written);

    let stored = manager.get_registrations(tournament.id).await.unwrap();
    let winner = stored.iter().find(|r| r.id == regs[0].id).unwrap();
    assert_eq!(winner.final_position, Some(1));
    assert_eq!(winner.prize_amount, Some(Decimal::from(180)));
    assert_eq!(winner.knockouts, 5);
    assert_eq!(winner.points_awarded, Some(125));

    let positions: Vec<u32> = stored.iter().filter_map(|r| r.final_position).collect();
    assert_eq!(positions.len(), 8);

    let tournament = manager.get_tournament(tournament.id).await.unwrap();
    assert_eq!(tournament.status, TournamentStatus::Completed);

    cleanup_tournament(&db, tournament.id).await;
    let _ = sqlx::query("DELETE FROM points_systems WHERE id = $1")
        .bind(table.system().id)
        .execute(db.pool())
        .await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_postgres_duplicate_registration_maps_to_policy_error() {
    let db = setup_test_db().await;
    let manager = TournamentManager::new(Arc::new(db.tournament_store()));

    let tournament = manager
        .create_tournament(&NewTournament::new(1, "PG Dupes", Decimal::from(10)))
        .await
        .unwrap();
    manager
        .update_tournament(tournament.id, &status(TournamentStatus::Registration))
        .await
        .unwrap();
    manager.register_player(tournament.id, 77).await.unwrap();

    let err = manager.register_player(tournament.id, 77).await.unwrap_err();
    assert!(matches!(err, TournamentError::AlreadyRegistered { .. }));

    cleanup_tournament(&db, tournament.id).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_postgres_uncommitted_transaction_rolls_back() {
    let db = setup_test_db().await;
    let store = db.tournament_store();
    let manager = TournamentManager::new(Arc::new(store.clone()));

    let tournament = manager
        .create_tournament(&NewTournament::new(1, "PG Rollback", Decimal::from(10)))
        .await
        .unwrap();
    manager
        .update_tournament(tournament.id, &status(TournamentStatus::Registration))
        .await
        .unwrap();

    {
        let mut tx = store.begin().await.unwrap();
        tx.insert_registration(tournament.id, 5).await.unwrap();
        // Dropped without commit
    }

    let regs = manager.get_registrations(tournament.id).await.unwrap();
    assert!(regs.is_empty());

    cleanup_tournament(&db, tournament.id).await;
}

#[tokio::test]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_postgres_health_check() {
    let db = setup_test_db().await;
    assert!(db.tournament_store().health_check().await.is_ok());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires PostgreSQL"]
#[serial]
async fn test_postgres_parallel_deltas_are_all_applied() {
    let db = setup_test_db().await;
    let manager = TournamentManager::new(Arc::new(db.tournament_store()));

    let mut config = NewTournament::new(1, "PG Turbo Rebuy", Decimal::from(20));
    config.rebuy_amount = Some(Decimal::from(20));
    let tournament = manager.create_tournament(&config).await.unwrap();
    manager
        .update_tournament(tournament.id, &status(TournamentStatus::Registration))
        .await
        .unwrap();
    let reg = manager.register_player(tournament.id, 1).await.unwrap();
    manager
        .update_tournament(tournament.id, &status(TournamentStatus::InProgress))
        .await
        .unwrap();

    let tasks: u32 = 20;
    let mut handles = Vec::new();
    for task in 0..tasks {
        let manager = manager.clone();
        let update = if task % 2 == 0 {
            RegistrationUpdate {
                add_rebuys: 1,
                ..Default::default()
            }
        } else {
            RegistrationUpdate {
                add_knockouts: 1,
                ..Default::default()
            }
        };
        handles.push(tokio::spawn(async move {
            manager.update_registration(reg.id, &update).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let regs = manager.get_registrations(tournament.id).await.unwrap();
    assert_eq!(regs[0].rebuys, tasks / 2);
    assert_eq!(regs[0].knockouts, tasks / 2);

    cleanup_tournament(&db, tournament.id).await;
}
