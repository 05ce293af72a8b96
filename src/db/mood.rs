//! Daily mood log

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};

use super::DbPool;
use crate::{Error, Result};

/// How the user felt on a given day, ordered from worst to best
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Angry,
    Sad,
    Neutral,
    Happy,
    Excited,
}

impl Mood {
    /// Every mood, in index order
    pub const ALL: [Self; 5] = [
        Self::Angry,
        Self::Sad,
        Self::Neutral,
        Self::Happy,
        Self::Excited,
    ];

    /// Position in the mood scale (0 = angry, 4 = excited)
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Self::Angry => 0,
            Self::Sad => 1,
            Self::Neutral => 2,
            Self::Happy => 3,
            Self::Excited => 4,
        }
    }

    #[must_use]
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(usize::from(index)).copied()
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Angry => "Angry",
            Self::Sad => "Sad",
            Self::Neutral => "Neutral",
            Self::Happy => "Happy",
            Self::Excited => "Excited",
        }
    }
}

/// Normalize a calendar date or timestamp to its UTC day
///
/// Accepts `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// # Errors
///
/// Returns `Error::InvalidInput` if the text is neither
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let input = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date);
    }

    DateTime::parse_from_rfc3339(input)
        .map(|ts| ts.with_timezone(&Utc).date_naive())
        .map_err(|_| Error::InvalidInput(format!("unrecognized date: {input}")))
}

/// Mood repository
#[derive(Clone)]
pub struct MoodRepo {
    pool: DbPool,
}

impl MoodRepo {
    /// Create a new mood repository
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Record the mood for a day, replacing any earlier entry for that day
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn save(&self, user_id: &str, date: NaiveDate, mood: Mood) -> Result<()> {
        let conn = super::conn(&self.pool)?;
        conn.execute(
            "INSERT INTO moods (user_id, date, mood, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, date) DO UPDATE SET mood = excluded.mood, updated_at = excluded.updated_at",
            rusqlite::params![
                user_id,
                date.format("%Y-%m-%d").to_string(),
                mood.index(),
                Utc::now().to_rfc3339()
            ],
        )?;

        tracing::debug!(user_id, %date, mood = mood.label(), "mood saved");
        Ok(())
    }

    /// Mood recorded for a single day
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn for_date(&self, user_id: &str, date: NaiveDate) -> Result<Option<Mood>> {
        let conn = super::conn(&self.pool)?;
        let index: Option<u8> = conn
            .query_row(
                "SELECT mood FROM moods WHERE user_id = ?1 AND date = ?2",
                rusqlite::params![user_id, date.format("%Y-%m-%d").to_string()],
                |row| row.get(0),
            )
            .optional()?;

        Ok(index.and_then(Mood::from_index))
    }

    /// Every recorded mood for a user, keyed by day
    ///
    /// # Errors
    ///
    /// Returns error if database operation fails
    pub fn all(&self, user_id: &str) -> Result<BTreeMap<NaiveDate, Mood>> {
        let conn = super::conn(&self.pool)?;
        let mut stmt = conn.prepare("SELECT date, mood FROM moods WHERE user_id = ?1")?;

        let rows = stmt
            .query_map([user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, u8>(1)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut moods = BTreeMap::new();
        for (raw_date, index) in rows {
            let date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
                .map_err(|e| Error::Database(format!("bad mood date {raw_date:?}: {e}")))?;
            match Mood::from_index(index) {
                Some(mood) => {
                    moods.insert(date, mood);
                }
                None => tracing::warn!(user_id, %date, index, "skipping out-of-range mood"),
            }
        }

        Ok(moods)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_memory;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn mood_index_round_trip() {
        for mood in Mood::ALL {
            assert_eq!(Mood::from_index(mood.index()), Some(mood));
        }
        assert_eq!(Mood::from_index(5), None);
    }

    #[test]
    fn parse_date_accepts_day_and_timestamp() {
        assert_eq!(parse_date("2026-03-14").unwrap(), day("2026-03-14"));
        assert_eq!(
            parse_date("2026-03-14T23:30:00-02:00").unwrap(),
            day("2026-03-15")
        );
        assert!(matches!(parse_date("yesterday"), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn save_replaces_same_day() {
        let repo = MoodRepo::new(init_memory().unwrap());
        let today = day("2026-10-01");

        repo.save("u1", today, Mood::Sad).unwrap();
        repo.save("u1", today, Mood::Happy).unwrap();

        assert_eq!(repo.for_date("u1", today).unwrap(), Some(Mood::Happy));
        assert_eq!(repo.all("u1").unwrap().len(), 1);
    }

    #[test]
    fn moods_are_scoped_per_user() {
        let repo = MoodRepo::new(init_memory().unwrap());
        repo.save("u1", day("2026-10-01"), Mood::Neutral).unwrap();
        repo.save("u1", day("2026-10-02"), Mood::Excited).unwrap();
        repo.save("u2", day("2026-10-01"), Mood::Angry).unwrap();

        let all = repo.all("u1").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&day("2026-10-02")], Mood::Excited);
        assert_eq!(repo.for_date("u2", day("2026-10-02")).unwrap(), None);
    }

    #[test]
    fn undecodable_rows_are_errors() {
        let pool = init_memory().unwrap();
        {
            let conn = pool.get().unwrap();
            conn.execute(
                "INSERT INTO moods (user_id, date, mood) VALUES ('u1', 'someday', 2)",
                [],
            )
            .unwrap();
        }

        let repo = MoodRepo::new(pool);
        assert!(matches!(repo.all("u1"), Err(Error::Database(_))));
    }
}
