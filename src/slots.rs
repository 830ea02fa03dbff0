use chrono::{Datelike, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    auth::new_id,
    error::ApiError,
    models::{SlotRow, STATUS_BOOKED, STATUS_FREE},
};

pub const DEFAULT_DURATION: i64 = 120;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub from: String,
    pub to: String,
    pub time: String,
    pub duration: Option<i64>,
    /// ISO weekdays, Monday = 1 through Sunday = 7.
    pub days_of_week: Vec<u32>,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct BulkOutcome {
    pub created: u32,
    pub skipped: u32,
    pub conflicts: u32,
}

pub async fn list(pool: &SqlitePool, date: Option<&str>) -> Result<Vec<SlotRow>, ApiError> {
    let rows = match date {
        Some(date) => {
            sqlx::query_as::<_, SlotRow>(
                "SELECT id, date, time, duration, status FROM slots WHERE date = ? ORDER BY time",
            )
            .bind(date)
            .fetch_all(pool)
            .await?
        }
        None => {
            sqlx::query_as::<_, SlotRow>(
                "SELECT id, date, time, duration, status FROM slots ORDER BY date, time",
            )
            .fetch_all(pool)
            .await?
        }
    };
    Ok(rows)
}

/// Several slots may coexist at the same date and time; only the bulk
/// operation deduplicates.
pub async fn create(
    pool: &SqlitePool,
    date: &str,
    time: &str,
    duration: Option<i64>,
) -> Result<SlotRow, ApiError> {
    let date = parse_date(date)?.format("%Y-%m-%d").to_string();
    let time = parse_time(time)?.format("%H:%M").to_string();

    let id = new_id();
    sqlx::query("INSERT INTO slots (id, date, time, duration, status) VALUES (?, ?, ?, ?, ?)")
        .bind(&id)
        .bind(&date)
        .bind(&time)
        .bind(duration.unwrap_or(DEFAULT_DURATION))
        .bind(STATUS_FREE)
        .execute(pool)
        .await?;

    let row = sqlx::query_as::<_, SlotRow>(
        "SELECT id, date, time, duration, status FROM slots WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Walks the date range inside one transaction; a mid-range failure rolls
/// back every insert of the call.
pub async fn create_bulk(pool: &SqlitePool, request: &BulkRequest) -> Result<BulkOutcome, ApiError> {
    if request.days_of_week.is_empty() {
        return Err(ApiError::MissingFields);
    }
    let from = parse_date(&request.from)?;
    let to = parse_date(&request.to)?;
    let time = parse_time(&request.time)?.format("%H:%M").to_string();
    let duration = request.duration.unwrap_or(DEFAULT_DURATION);

    let mut outcome = BulkOutcome::default();
    let mut tx = pool.begin().await?;

    let mut day = from;
    while day <= to {
        if request
            .days_of_week
            .contains(&day.weekday().number_from_monday())
        {
            let date = day.format("%Y-%m-%d").to_string();
            let existing = sqlx::query_as::<_, (String,)>(
                "SELECT status FROM slots WHERE date = ? AND time = ? LIMIT 1",
            )
            .bind(&date)
            .bind(&time)
            .fetch_optional(&mut *tx)
            .await?;

            match existing {
                Some((status,)) if status == STATUS_BOOKED => outcome.conflicts += 1,
                Some(_) => outcome.skipped += 1,
                None => {
                    sqlx::query(
                        "INSERT INTO slots (id, date, time, duration, status) VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(new_id())
                    .bind(&date)
                    .bind(&time)
                    .bind(duration)
                    .bind(STATUS_FREE)
                    .execute(&mut *tx)
                    .await?;
                    outcome.created += 1;
                }
            }
        }
        day = match day.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }

    tx.commit().await?;
    Ok(outcome)
}

/// Returns the number of removed rows; a booked slot is never removed.
pub async fn delete(pool: &SqlitePool, id: &str) -> Result<u64, ApiError> {
    let result = sqlx::query("DELETE FROM slots WHERE id = ? AND status != ?")
        .bind(id)
        .bind(STATUS_BOOKED)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

fn parse_date(value: &str) -> Result<NaiveDate, ApiError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| ApiError::MissingFields)
}

fn parse_time(value: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M").map_err(|_| ApiError::MissingFields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn weekday_request(from: &str, to: &str) -> BulkRequest {
        BulkRequest {
            from: from.to_string(),
            to: to.to_string(),
            time: "08:00".to_string(),
            duration: Some(120),
            days_of_week: vec![1, 2, 3, 4, 5],
        }
    }

    async fn mark_booked(pool: &SqlitePool, id: &str) {
        sqlx::query("UPDATE slots SET status = 'booked' WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn create_and_list_ordered() {
        let pool = test_pool().await;
        create(&pool, "2025-03-02", "10:00", None).await.unwrap();
        create(&pool, "2025-03-01", "14:00", Some(60)).await.unwrap();
        create(&pool, "2025-03-01", "08:00", None).await.unwrap();

        let rows = list(&pool, None).await.unwrap();
        let order: Vec<(&str, &str)> = rows
            .iter()
            .map(|slot| (slot.date.as_str(), slot.time.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("2025-03-01", "08:00"),
                ("2025-03-01", "14:00"),
                ("2025-03-02", "10:00"),
            ]
        );

        let filtered = list(&pool, Some("2025-03-01")).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert!(filtered.iter().all(|slot| slot.status == STATUS_FREE));
    }

    #[actix_web::test]
    async fn create_rejects_malformed_input() {
        let pool = test_pool().await;
        assert!(matches!(
            create(&pool, "", "08:00", None).await,
            Err(ApiError::MissingFields)
        ));
        assert!(matches!(
            create(&pool, "2025-13-40", "08:00", None).await,
            Err(ApiError::MissingFields)
        ));
        assert!(matches!(
            create(&pool, "2025-03-01", "8 o'clock", None).await,
            Err(ApiError::MissingFields)
        ));
        assert!(list(&pool, None).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn bulk_creates_one_slot_per_weekday() {
        let pool = test_pool().await;
        let outcome = create_bulk(&pool, &weekday_request("2025-01-06", "2025-01-10"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            BulkOutcome {
                created: 5,
                skipped: 0,
                conflicts: 0
            }
        );
        assert_eq!(list(&pool, None).await.unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn bulk_skips_weekends() {
        let pool = test_pool().await;
        // 2025-01-04 is a Saturday, 2025-01-12 a Sunday.
        let outcome = create_bulk(&pool, &weekday_request("2025-01-04", "2025-01-12"))
            .await
            .unwrap();
        assert_eq!(outcome.created, 5);
        let rows = list(&pool, None).await.unwrap();
        assert!(rows.iter().all(|slot| {
            let day = NaiveDate::parse_from_str(&slot.date, "%Y-%m-%d").unwrap();
            day.weekday().number_from_monday() <= 5
        }));
    }

    #[actix_web::test]
    async fn bulk_counts_skipped_and_conflicts() {
        let pool = test_pool().await;
        create(&pool, "2025-01-06", "08:00", None).await.unwrap();
        let booked = create(&pool, "2025-01-07", "08:00", None).await.unwrap();
        mark_booked(&pool, &booked.id).await;

        let outcome = create_bulk(&pool, &weekday_request("2025-01-06", "2025-01-10"))
            .await
            .unwrap();
        assert_eq!(
            outcome,
            BulkOutcome {
                created: 3,
                skipped: 1,
                conflicts: 1
            }
        );
        assert_eq!(
            outcome.created + outcome.skipped + outcome.conflicts,
            5,
            "every weekday in range is accounted for"
        );
    }

    #[actix_web::test]
    async fn bulk_requires_weekday_selection() {
        let pool = test_pool().await;
        let mut request = weekday_request("2025-01-06", "2025-01-10");
        request.days_of_week.clear();
        assert!(matches!(
            create_bulk(&pool, &request).await,
            Err(ApiError::MissingFields)
        ));
    }

    #[actix_web::test]
    async fn bulk_empty_range_creates_nothing() {
        let pool = test_pool().await;
        let outcome = create_bulk(&pool, &weekday_request("2025-01-10", "2025-01-06"))
            .await
            .unwrap();
        assert_eq!(outcome, BulkOutcome::default());
    }

    #[actix_web::test]
    async fn delete_refuses_booked_slots() {
        let pool = test_pool().await;
        let free = create(&pool, "2025-02-01", "09:00", None).await.unwrap();
        let booked = create(&pool, "2025-02-01", "11:00", None).await.unwrap();
        mark_booked(&pool, &booked.id).await;

        assert_eq!(delete(&pool, &booked.id).await.unwrap(), 0);
        assert_eq!(delete(&pool, &free.id).await.unwrap(), 1);
        assert_eq!(delete(&pool, "no-such-slot").await.unwrap(), 0);

        let rows = list(&pool, None).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, booked.id);
        assert_eq!(rows[0].status, STATUS_BOOKED);
    }
}
