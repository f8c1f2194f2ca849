//! Prize pool lock and status lifecycle, driven through the manager.

#[cfg(test)]
mod lifecycle_lock_tests {
    use club_poker::TournamentError;
    use club_poker::db::MemoryStore;
    use club_poker::settlement::{HighHandConfig, RakePolicy};
    use club_poker::tournament::{
        ActivityKind, DEFAULT_ACTIVITY_LIMIT, EliminationRequest, NewTournament,
        RegistrationUpdate, Tournament, TournamentManager, TournamentStatus, TournamentUpdate,
    };
    use rust_decimal::Decimal;
    use std::sync::Arc;

    fn manager() -> TournamentManager {
        TournamentManager::new(Arc::new(MemoryStore::new()))
    }

    fn status(status: TournamentStatus) -> TournamentUpdate {
        TournamentUpdate {
            status: Some(status),
            ..Default::default()
        }
    }

    fn lock() -> TournamentUpdate {
        TournamentUpdate {
            prize_pool_locked: Some(true),
            ..Default::default()
        }
    }

    async fn open_tournament(manager: &TournamentManager) -> Tournament {
        let mut config = NewTournament::new(7, "Sunday Deepstack", Decimal::from(100));
        config.rebuy_amount = Some(Decimal::from(100));
        config.addon_amount = Some(Decimal::from(50));
        config.high_hand = Some(HighHandConfig {
            amount: Decimal::from(10),
            rake: RakePolicy::none(),
            payout_count: 1,
        });
        let tournament = manager.create_tournament(&config).await.unwrap();
        manager
            .update_tournament(tournament.id, &status(TournamentStatus::Registration))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_locked_pool_rejects_registration_and_money_changes() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        let reg = manager.register_player(tournament.id, 1).await.unwrap();
        manager.register_player(tournament.id, 2).await.unwrap();

        let locked = manager.update_tournament(tournament.id, &lock()).await.unwrap();
        assert!(locked.prize_pool_locked);

        let err = manager.register_player(tournament.id, 3).await.unwrap_err();
        assert!(matches!(err, TournamentError::PrizePoolLocked { .. }));

        for update in [
            RegistrationUpdate {
                add_rebuys: 1,
                ..Default::default()
            },
            RegistrationUpdate {
                add_addons: 1,
                ..Default::default()
            },
            RegistrationUpdate {
                entering_high_hands: Some(true),
                ..Default::default()
            },
        ] {
            let err = manager.update_registration(reg.id, &update).await.unwrap_err();
            assert!(
                matches!(err, TournamentError::PrizePoolLocked { .. }),
                "expected lock rejection for {update:?}, got {err:?}"
            );
        }

        // Rejected changes left no trace
        let summary = manager.settlement_summary(tournament.id).await.unwrap();
        assert_eq!(summary.entrants, 2);
        assert_eq!(summary.prize_pool.gross, Decimal::from(200));
    }

    #[tokio::test]
    async fn test_locked_pool_still_allows_eliminations() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        let a = manager.register_player(tournament.id, 1).await.unwrap();
        let b = manager.register_player(tournament.id, 2).await.unwrap();
        manager
            .update_tournament(tournament.id, &status(TournamentStatus::InProgress))
            .await
            .unwrap();
        manager.update_tournament(tournament.id, &lock()).await.unwrap();

        let out = manager
            .update_registration(
                b.id,
                &RegistrationUpdate {
                    eliminate: Some(EliminationRequest {
                        eliminated_by: Some(a.id),
                        at: None,
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(out.is_eliminated);
        assert_eq!(out.final_position, Some(2));
        assert_eq!(out.eliminated_by, Some(a.id));

        let registrations = manager.get_registrations(tournament.id).await.unwrap();
        let knocker = registrations.iter().find(|r| r.id == a.id).unwrap();
        assert_eq!(knocker.knockouts, 1);
    }

    #[tokio::test]
    async fn test_unlock_is_rejected() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        manager.update_tournament(tournament.id, &lock()).await.unwrap();

        let unlock = TournamentUpdate {
            prize_pool_locked: Some(false),
            ..Default::default()
        };
        let err = manager
            .update_tournament(tournament.id, &unlock)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::PoolLockIrreversible));

        let tournament = manager.get_tournament(tournament.id).await.unwrap();
        assert!(tournament.prize_pool_locked);
    }

    #[tokio::test]
    async fn test_lock_survives_finalize() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        manager.register_player(tournament.id, 1).await.unwrap();
        manager
            .update_tournament(tournament.id, &status(TournamentStatus::InProgress))
            .await
            .unwrap();
        manager.update_tournament(tournament.id, &lock()).await.unwrap();
        manager.finalize(tournament.id).await.unwrap();

        let tournament = manager.get_tournament(tournament.id).await.unwrap();
        assert!(tournament.prize_pool_locked);
        assert_eq!(tournament.status, TournamentStatus::Completed);
    }

    #[tokio::test]
    async fn test_completed_tournament_rejects_registration_changes() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        let a = manager.register_player(tournament.id, 1).await.unwrap();
        let b = manager.register_player(tournament.id, 2).await.unwrap();
        let c = manager.register_player(tournament.id, 3).await.unwrap();
        manager
            .update_tournament(tournament.id, &status(TournamentStatus::InProgress))
            .await
            .unwrap();
        manager.finalize(tournament.id).await.unwrap();
        let settled = manager.get_registrations(tournament.id).await.unwrap();

        let rebuys = RegistrationUpdate {
            add_rebuys: 5,
            ..Default::default()
        };
        let err = manager.update_registration(a.id, &rebuys).await.unwrap_err();
        assert!(matches!(err, TournamentError::InvalidState { .. }), "{err:?}");

        let elimination = RegistrationUpdate {
            eliminate: Some(EliminationRequest {
                eliminated_by: Some(b.id),
                at: None,
            }),
            ..Default::default()
        };
        let err = manager
            .update_registration(c.id, &elimination)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidState { .. }), "{err:?}");

        let knockouts = RegistrationUpdate {
            add_knockouts: 1,
            ..Default::default()
        };
        let err = manager
            .update_registration(b.id, &knockouts)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidState { .. }), "{err:?}");

        // Settled rows are untouched
        let after = manager.get_registrations(tournament.id).await.unwrap();
        assert_eq!(after, settled);
        let summary = manager.settlement_summary(tournament.id).await.unwrap();
        assert_eq!(summary.prize_pool.gross, Decimal::from(300));
    }

    #[tokio::test]
    async fn test_completed_tournament_allows_high_hand_award() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        let a = manager.register_player(tournament.id, 1).await.unwrap();
        manager.register_player(tournament.id, 2).await.unwrap();
        let entering = RegistrationUpdate {
            entering_high_hands: Some(true),
            ..Default::default()
        };
        manager.update_registration(a.id, &entering).await.unwrap();
        manager
            .update_tournament(tournament.id, &status(TournamentStatus::InProgress))
            .await
            .unwrap();
        manager.finalize(tournament.id).await.unwrap();

        let winner = RegistrationUpdate {
            high_hand_winner: Some(true),
            ..Default::default()
        };
        let updated = manager.update_registration(a.id, &winner).await.unwrap();
        assert!(updated.high_hand_winner);
        assert_eq!(updated.high_hand_amount, Some(Decimal::from(10)));
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        manager.register_player(tournament.id, 9).await.unwrap();

        let err = manager.register_player(tournament.id, 9).await.unwrap_err();
        assert!(matches!(
            err,
            TournamentError::AlreadyRegistered { player_id: 9, .. }
        ));
    }

    #[tokio::test]
    async fn test_invalid_transitions_rejected() {
        let manager = manager();
        let tournament = manager
            .create_tournament(&NewTournament::new(1, "Skip Ahead", Decimal::from(10)))
            .await
            .unwrap();

        // Scheduled cannot jump straight to completed
        let err = manager
            .update_tournament(tournament.id, &status(TournamentStatus::Completed))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidTransition { .. }));

        manager
            .update_tournament(tournament.id, &status(TournamentStatus::Cancelled))
            .await
            .unwrap();
        let err = manager
            .update_tournament(tournament.id, &status(TournamentStatus::Registration))
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_manual_pool_rejects_set_and_clear_together() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        let update = TournamentUpdate {
            manual_prize_pool: Some(Decimal::from(500)),
            clear_manual_prize_pool: true,
            ..Default::default()
        };
        let err = manager
            .update_tournament(tournament.id, &update)
            .await
            .unwrap_err();
        assert!(matches!(err, TournamentError::Validation(_)));
    }

    #[tokio::test]
    async fn test_activity_log_records_changes_newest_first() {
        let manager = manager();
        let tournament = open_tournament(&manager).await;
        manager.register_player(tournament.id, 1).await.unwrap();
        manager.update_tournament(tournament.id, &lock()).await.unwrap();

        let activity = manager
            .activity(tournament.id, DEFAULT_ACTIVITY_LIMIT)
            .await
            .unwrap();
        let kinds: Vec<ActivityKind> = activity.iter().map(|entry| entry.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ActivityKind::PoolLock,
                ActivityKind::Registration,
                ActivityKind::StatusChange,
            ]
        );

        let limited = manager.activity(tournament.id, 1).await.unwrap();
        assert_eq!(limited.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let manager = manager();
        assert!(matches!(
            manager.get_tournament(404).await,
            Err(TournamentError::NotFound(404))
        ));
        assert!(matches!(
            manager
                .update_registration(
                    404,
                    &RegistrationUpdate {
                        add_knockouts: 1,
                        ..Default::default()
                    }
                )
                .await,
            Err(TournamentError::RegistrationNotFound(404))
        ));
    }
}
