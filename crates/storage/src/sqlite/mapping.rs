use practice_core::level::LevelState;
use practice_core::model::{DifficultyLevel, LearnerId, ModuleId, ModuleKey, SessionSummary};
use sqlx::Row;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn learner_id_to_i64(id: LearnerId) -> Result<i64, StorageError> {
    i64::try_from(id.value())
        .map_err(|_| StorageError::Serialization("learner_id overflow".into()))
}

pub(crate) fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn parse_difficulty(s: &str) -> Result<DifficultyLevel, StorageError> {
    s.parse().map_err(ser)
}

pub(crate) fn map_key(row: &sqlx::sqlite::SqliteRow) -> Result<ModuleKey, StorageError> {
    let learner = LearnerId::new(i64_to_u64(
        "learner_id",
        row.try_get::<i64, _>("learner_id").map_err(ser)?,
    )?);
    let module = ModuleId::new(row.try_get::<String, _>("module_id").map_err(ser)?).map_err(ser)?;
    Ok(ModuleKey::new(learner, module))
}

pub(crate) fn map_summary_row(row: &sqlx::sqlite::SqliteRow) -> Result<SessionSummary, StorageError> {
    let key = map_key(row)?;
    let completed_at = row.try_get("completed_at").map_err(ser)?;
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total_problems = u32_from_i64(
        "total_problems",
        row.try_get::<i64, _>("total_problems").map_err(ser)?,
    )?;
    let time_spent_secs = i64_to_u64(
        "time_spent_secs",
        row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
    )?;
    let difficulty = parse_difficulty(&row.try_get::<String, _>("difficulty").map_err(ser)?)?;

    SessionSummary::from_persisted(
        key,
        completed_at,
        score,
        total_problems,
        time_spent_secs,
        difficulty,
    )
    .map_err(ser)
}

pub(crate) fn map_level_state_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LevelState, StorageError> {
    let level = parse_difficulty(&row.try_get::<String, _>("current_level").map_err(ser)?)?;
    let correct_streak = u32_from_i64(
        "correct_streak",
        row.try_get::<i64, _>("correct_streak").map_err(ser)?,
    )?;
    let incorrect_streak = u32_from_i64(
        "incorrect_streak",
        row.try_get::<i64, _>("incorrect_streak").map_err(ser)?,
    )?;
    let adaptive_enabled: bool = row.try_get("adaptive_enabled").map_err(ser)?;

    Ok(LevelState::from_persisted(
        level,
        correct_streak,
        incorrect_streak,
        adaptive_enabled,
    ))
}
