//! PostgreSQL implementation of the tournament store.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Postgres, Row, Transaction};

use super::repository::{StoreTransaction, TournamentStore};
use super::timeouts::with_default_timeout;
use crate::points::{NewPointsSystem, PointsAllocation, PointsSystem, PointsTable};
use crate::settlement::{HighHandConfig, PayoutStructure, RakePolicy, RegistrationResult};
use crate::tournament::models::rake_type_from_str;
use crate::tournament::{
    ActivityEntry, NewActivity, NewTournament, PlayerId, Registration, RegistrationChange,
    RegistrationId, Tournament, TournamentChange, TournamentError, TournamentId,
    TournamentResult,
};

const TOURNAMENT_COLUMNS: &str = "id, club_id, season_id, name, buy_in_amount, rebuy_amount, \
     addon_amount, buy_in_rake_type, buy_in_rake_amount, rebuy_rake_type, rebuy_rake_amount, \
     addon_rake_type, addon_rake_amount, payout_structure, payout_percentages, track_points, \
     points_system_id, status, prize_pool_locked, manual_prize_pool, high_hand, created_at, \
     updated_at";

const REGISTRATION_COLUMNS: &str = "id, tournament_id, player_id, buy_ins, rebuys, addons, \
     is_eliminated, elimination_time, eliminated_by, elimination_seq, knockouts, final_position, \
     prize_amount, points_awarded, entering_high_hands, high_hand_winner, high_hand_amount, \
     registered_at";

const ACTIVITY_COLUMNS: &str =
    "id, tournament_id, registration_id, kind, description, created_at";

/// Default PostgreSQL implementation of `TournamentStore`
#[derive(Clone)]
pub struct PgTournamentStore {
    pool: PgPool,
}

impl PgTournamentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TournamentStore for PgTournamentStore {
    async fn begin(&self) -> TournamentResult<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgStoreTransaction { tx: Some(tx) }))
    }

    async fn create_tournament(&self, config: &NewTournament) -> TournamentResult<Tournament> {
        let payout_structure = config.validate()?;

        if let Some(system_id) = config.points_system_id {
            let exists = sqlx::query("SELECT 1 FROM points_systems WHERE id = $1")
                .bind(system_id)
                .fetch_optional(&self.pool)
                .await?;
            if exists.is_none() {
                return Err(TournamentError::PointsSystemNotFound(system_id));
            }
        }

        let percentages = match &payout_structure {
            PayoutStructure::Custom(percentages) => Some(serde_json::to_value(percentages)?),
            _ => None,
        };
        let high_hand = config
            .high_hand
            .as_ref()
            .map(serde_json::to_value)
            .transpose()?;

        let sql = format!(
            "INSERT INTO tournaments (club_id, season_id, name, buy_in_amount, rebuy_amount,
                 addon_amount, buy_in_rake_type, buy_in_rake_amount, rebuy_rake_type,
                 rebuy_rake_amount, addon_rake_type, addon_rake_amount, payout_structure,
                 payout_percentages, track_points, points_system_id, high_hand)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
             RETURNING {TOURNAMENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(config.club_id)
            .bind(config.season_id)
            .bind(&config.name)
            .bind(config.buy_in_amount)
            .bind(config.rebuy_amount)
            .bind(config.addon_amount)
            .bind(config.buy_in_rake.rake_type.as_str())
            .bind(config.buy_in_rake.amount)
            .bind(config.rebuy_rake.rake_type.as_str())
            .bind(config.rebuy_rake.amount)
            .bind(config.addon_rake.rake_type.as_str())
            .bind(config.addon_rake.amount)
            .bind(payout_structure.name())
            .bind(percentages)
            .bind(config.track_points)
            .bind(config.points_system_id)
            .bind(high_hand)
            .fetch_one(&self.pool)
            .await?;

        tournament_from_row(&row)
    }

    async fn create_points_system(
        &self,
        system: &NewPointsSystem,
    ) -> TournamentResult<PointsTable> {
        system.validate()?;

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            "INSERT INTO points_systems (season_id, name, participation_points, knockout_points)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(system.season_id)
        .bind(&system.name)
        .bind(system.participation_points)
        .bind(system.knockout_points)
        .fetch_one(&mut *tx)
        .await?;
        let id: i64 = row.get("id");

        let mut allocations = Vec::with_capacity(system.allocations.len());
        for allocation in &system.allocations {
            let row = sqlx::query(
                "INSERT INTO points_allocations (points_system_id, position, position_end, points)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
            )
            .bind(id)
            .bind(to_i32(allocation.position))
            .bind(allocation.position_end.map(to_i32))
            .bind(allocation.points)
            .fetch_one(&mut *tx)
            .await?;

            allocations.push(PointsAllocation {
                id: row.get("id"),
                points_system_id: id,
                position: allocation.position,
                position_end: allocation.position_end,
                points: allocation.points,
            });
        }

        tx.commit().await?;

        let points_system = PointsSystem {
            id,
            season_id: system.season_id,
            name: system.name.clone(),
            participation_points: system.participation_points,
            knockout_points: system.knockout_points,
        };
        PointsTable::new(points_system, allocations)
    }

    async fn health_check(&self) -> TournamentResult<()> {
        with_default_timeout(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok::<_, TournamentError>(())
        })
        .await
    }
}

/// Open database transaction; rolled back when dropped uncommitted
struct PgStoreTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreTransaction {
    fn conn(&mut self) -> TournamentResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| TournamentError::Storage("transaction already finished".to_string()))
    }

    async fn fetch_tournament(
        &mut self,
        id: TournamentId,
        for_update: bool,
    ) -> TournamentResult<Tournament> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let sql = format!("SELECT {TOURNAMENT_COLUMNS} FROM tournaments WHERE id = $1{lock}");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(TournamentError::NotFound(id))?;
        tournament_from_row(&row)
    }

    async fn fetch_registration(
        &mut self,
        id: RegistrationId,
        for_update: bool,
    ) -> TournamentResult<Registration> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1{lock}");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(TournamentError::RegistrationNotFound(id))?;
        Ok(registration_from_row(&row))
    }
}

#[async_trait]
impl StoreTransaction for PgStoreTransaction {
    async fn tournament(&mut self, id: TournamentId) -> TournamentResult<Tournament> {
        self.fetch_tournament(id, false).await
    }

    async fn lock_tournament(&mut self, id: TournamentId) -> TournamentResult<Tournament> {
        self.fetch_tournament(id, true).await
    }

    async fn registration(&mut self, id: RegistrationId) -> TournamentResult<Registration> {
        self.fetch_registration(id, false).await
    }

    async fn lock_registration(&mut self, id: RegistrationId) -> TournamentResult<Registration> {
        self.fetch_registration(id, true).await
    }

    async fn registrations(
        &mut self,
        tournament_id: TournamentId,
    ) -> TournamentResult<Vec<Registration>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE tournament_id = $1 ORDER BY id"
        );
        let rows = sqlx::query(&sql)
            .bind(tournament_id)
            .fetch_all(self.conn()?)
            .await?;
        Ok(rows.iter().map(registration_from_row).collect())
    }

    async fn find_registration_by_player(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Option<Registration>> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations
             WHERE tournament_id = $1 AND player_id = $2"
        );
        let row = sqlx::query(&sql)
            .bind(tournament_id)
            .bind(player_id)
            .fetch_optional(self.conn()?)
            .await?;
        Ok(row.as_ref().map(registration_from_row))
    }

    async fn points_table(&mut self, points_system_id: i64) -> TournamentResult<PointsTable> {
        let row = sqlx::query(
            "SELECT id, season_id, name, participation_points, knockout_points
             FROM points_systems WHERE id = $1",
        )
        .bind(points_system_id)
        .fetch_optional(self.conn()?)
        .await?
        .ok_or(TournamentError::PointsSystemNotFound(points_system_id))?;

        let system = PointsSystem {
            id: row.get("id"),
            season_id: row.get("season_id"),
            name: row.get("name"),
            participation_points: row.get("participation_points"),
            knockout_points: row.get("knockout_points"),
        };

        let rows = sqlx::query(
            "SELECT id, points_system_id, position, position_end, points
             FROM points_allocations WHERE points_system_id = $1",
        )
        .bind(points_system_id)
        .fetch_all(self.conn()?)
        .await?;

        let allocations = rows
            .iter()
            .map(|r| PointsAllocation {
                id: r.get("id"),
                points_system_id: r.get("points_system_id"),
                position: to_u32(r.get("position")),
                position_end: r.get::<Option<i32>, _>("position_end").map(to_u32),
                points: r.get("points"),
            })
            .collect();

        Ok(PointsTable::lenient(system, allocations))
    }

    async fn insert_registration(
        &mut self,
        tournament_id: TournamentId,
        player_id: PlayerId,
    ) -> TournamentResult<Registration> {
        let sql = format!(
            "INSERT INTO registrations (tournament_id, player_id)
             VALUES ($1, $2)
             RETURNING {REGISTRATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(tournament_id)
            .bind(player_id)
            .fetch_one(self.conn()?)
            .await
            .map_err(|e| {
                let duplicate = matches!(
                    &e,
                    sqlx::Error::Database(db) if db.constraint() == Some("registrations_player_unique")
                );
                if duplicate {
                    TournamentError::AlreadyRegistered {
                        tournament_id,
                        player_id,
                    }
                } else {
                    TournamentError::Database(e)
                }
            })?;
        Ok(registration_from_row(&row))
    }

    async fn apply_registration_change(
        &mut self,
        change: &RegistrationChange,
    ) -> TournamentResult<Registration> {
        let elimination = change.elimination.as_ref();
        let sql = format!(
            "UPDATE registrations SET
                 rebuys = rebuys + $2,
                 addons = addons + $3,
                 knockouts = knockouts + $4,
                 is_eliminated = is_eliminated OR $5,
                 elimination_time = CASE WHEN $5 THEN $6 ELSE elimination_time END,
                 eliminated_by = CASE WHEN $5 THEN $7 ELSE eliminated_by END,
                 elimination_seq = CASE WHEN $5 THEN $8 ELSE elimination_seq END,
                 final_position = CASE WHEN $5 THEN $9 ELSE final_position END,
                 entering_high_hands = COALESCE($10, entering_high_hands),
                 high_hand_winner = COALESCE($11, high_hand_winner),
                 high_hand_amount = CASE WHEN $12 THEN $13 ELSE high_hand_amount END
             WHERE id = $1
             RETURNING {REGISTRATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(change.registration_id)
            .bind(to_i32(change.add_rebuys))
            .bind(to_i32(change.add_addons))
            .bind(to_i32(change.add_knockouts))
            .bind(elimination.is_some())
            .bind(elimination.map(|e| e.at.naive_utc()))
            .bind(elimination.and_then(|e| e.eliminated_by))
            .bind(elimination.map(|e| e.seq))
            .bind(elimination.map(|e| to_i32(e.provisional_position)))
            .bind(change.entering_high_hands)
            .bind(change.high_hand_winner)
            .bind(change.high_hand_amount.is_some())
            .bind(change.high_hand_amount.flatten())
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(TournamentError::RegistrationNotFound(change.registration_id))?;
        Ok(registration_from_row(&row))
    }

    async fn set_final_position(
        &mut self,
        registration_id: RegistrationId,
        position: Option<u32>,
    ) -> TournamentResult<()> {
        let result = sqlx::query("UPDATE registrations SET final_position = $2 WHERE id = $1")
            .bind(registration_id)
            .bind(position.map(to_i32))
            .execute(self.conn()?)
            .await?;
        if result.rows_affected() == 0 {
            return Err(TournamentError::RegistrationNotFound(registration_id));
        }
        Ok(())
    }

    async fn next_elimination_seq(&mut self, tournament_id: TournamentId) -> TournamentResult<i64> {
        let row = sqlx::query(
            "SELECT COALESCE(MAX(elimination_seq), 0) + 1 AS next_seq
             FROM registrations WHERE tournament_id = $1",
        )
        .bind(tournament_id)
        .fetch_one(self.conn()?)
        .await?;
        Ok(row.get("next_seq"))
    }

    async fn write_settlement_result(
        &mut self,
        result: &RegistrationResult,
        write_points: bool,
    ) -> TournamentResult<()> {
        let outcome = sqlx::query(
            "UPDATE registrations SET
                 final_position = $2,
                 prize_amount = $3,
                 points_awarded = CASE WHEN $4 THEN $5 ELSE points_awarded END
             WHERE id = $1",
        )
        .bind(result.registration_id)
        .bind(to_i32(result.final_position))
        .bind(result.prize_amount)
        .bind(write_points)
        .bind(result.points_awarded)
        .execute(self.conn()?)
        .await?;

        if outcome.rows_affected() == 0 {
            return Err(TournamentError::RegistrationNotFound(result.registration_id));
        }
        Ok(())
    }

    async fn update_tournament(
        &mut self,
        id: TournamentId,
        change: &TournamentChange,
    ) -> TournamentResult<Tournament> {
        let sql = format!(
            "UPDATE tournaments SET
                 status = COALESCE($2, status),
                 prize_pool_locked = prize_pool_locked OR $3,
                 manual_prize_pool = CASE WHEN $4 THEN $5 ELSE manual_prize_pool END,
                 updated_at = NOW()
             WHERE id = $1
             RETURNING {TOURNAMENT_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .bind(change.status.map(|s| s.as_str()))
            .bind(change.lock_prize_pool)
            .bind(change.manual_prize_pool.is_some())
            .bind(change.manual_prize_pool.flatten())
            .fetch_optional(self.conn()?)
            .await?
            .ok_or(TournamentError::NotFound(id))?;
        tournament_from_row(&row)
    }

    async fn record_activity(&mut self, entry: &NewActivity) -> TournamentResult<ActivityEntry> {
        let sql = format!(
            "INSERT INTO tournament_activity (tournament_id, registration_id, kind, description)
             VALUES ($1, $2, $3, $4)
             RETURNING {ACTIVITY_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(entry.tournament_id)
            .bind(entry.registration_id)
            .bind(entry.kind.as_str())
            .bind(&entry.description)
            .fetch_one(self.conn()?)
            .await?;
        activity_from_row(&row)
    }

    async fn activity(
        &mut self,
        tournament_id: TournamentId,
        limit: i64,
    ) -> TournamentResult<Vec<ActivityEntry>> {
        let sql = format!(
            "SELECT {ACTIVITY_COLUMNS} FROM tournament_activity
             WHERE tournament_id = $1
             ORDER BY id DESC
             LIMIT $2"
        );
        let rows = sqlx::query(&sql)
            .bind(tournament_id)
            .bind(limit.max(0))
            .fetch_all(self.conn()?)
            .await?;
        rows.iter().map(activity_from_row).collect()
    }

    async fn commit(&mut self) -> TournamentResult<()> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| TournamentError::Storage("transaction already finished".to_string()))?;
        tx.commit().await?;
        Ok(())
    }
}

fn to_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

fn to_u32(value: i32) -> u32 {
    value.max(0) as u32
}

fn rake_from_row(row: &PgRow, prefix: &str) -> TournamentResult<RakePolicy> {
    let rake_type: String = row.get(format!("{prefix}_rake_type").as_str());
    Ok(RakePolicy {
        rake_type: rake_type_from_str(&rake_type)?,
        amount: row.get::<Decimal, _>(format!("{prefix}_rake_amount").as_str()),
    })
}

fn tournament_from_row(row: &PgRow) -> TournamentResult<Tournament> {
    let percentages = row
        .get::<Option<serde_json::Value>, _>("payout_percentages")
        .map(serde_json::from_value::<Vec<Decimal>>)
        .transpose()?;
    let structure_name: String = row.get("payout_structure");
    let high_hand = row
        .get::<Option<serde_json::Value>, _>("high_hand")
        .map(serde_json::from_value::<HighHandConfig>)
        .transpose()?;
    let status: String = row.get("status");

    Ok(Tournament {
        id: row.get("id"),
        club_id: row.get("club_id"),
        season_id: row.get("season_id"),
        name: row.get("name"),
        buy_in_amount: row.get("buy_in_amount"),
        rebuy_amount: row.get("rebuy_amount"),
        addon_amount: row.get("addon_amount"),
        buy_in_rake: rake_from_row(row, "buy_in")?,
        rebuy_rake: rake_from_row(row, "rebuy")?,
        addon_rake: rake_from_row(row, "addon")?,
        payout_structure: PayoutStructure::resolve_lenient(&structure_name, percentages),
        track_points: row.get("track_points"),
        points_system_id: row.get("points_system_id"),
        status: status.parse()?,
        prize_pool_locked: row.get("prize_pool_locked"),
        manual_prize_pool: row.get("manual_prize_pool"),
        high_hand,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
    })
}

fn registration_from_row(row: &PgRow) -> Registration {
    Registration {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        player_id: row.get("player_id"),
        buy_ins: to_u32(row.get("buy_ins")),
        rebuys: to_u32(row.get("rebuys")),
        addons: to_u32(row.get("addons")),
        is_eliminated: row.get("is_eliminated"),
        elimination_time: row
            .get::<Option<chrono::NaiveDateTime>, _>("elimination_time")
            .map(|dt| dt.and_utc()),
        eliminated_by: row.get("eliminated_by"),
        elimination_seq: row.get("elimination_seq"),
        knockouts: to_u32(row.get("knockouts")),
        final_position: row.get::<Option<i32>, _>("final_position").map(to_u32),
        prize_amount: row.get("prize_amount"),
        points_awarded: row.get("points_awarded"),
        entering_high_hands: row.get("entering_high_hands"),
        high_hand_winner: row.get("high_hand_winner"),
        high_hand_amount: row.get("high_hand_amount"),
        registered_at: row
            .get::<chrono::NaiveDateTime, _>("registered_at")
            .and_utc(),
    }
}

fn activity_from_row(row: &PgRow) -> TournamentResult<ActivityEntry> {
    let kind: String = row.get("kind");
    Ok(ActivityEntry {
        id: row.get("id"),
        tournament_id: row.get("tournament_id"),
        registration_id: row.get("registration_id"),
        kind: kind.parse()?,
        description: row.get("description"),
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}
