use chrono::NaiveDate;

use crate::models::DailyRecord;
use crate::store::Column;

/// In-memory daily record table, keyed by `(user_id, date)`.
///
/// Row order is append order and carries no meaning beyond "last appended"
/// being the most recent save.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<DailyRecord>,
}

impl Table {
    #[must_use]
    pub fn empty(schema: &[Column]) -> Self {
        Self::from_rows(schema, Vec::new())
    }

    #[must_use]
    pub fn from_rows(schema: &[Column], rows: Vec<DailyRecord>) -> Self {
        Self {
            columns: schema.iter().map(|c| c.name.to_string()).collect(),
            rows,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[DailyRecord] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    #[must_use]
    pub fn get(&self, user_id: &str, date: NaiveDate) -> Option<&DailyRecord> {
        self.rows.iter().find(|r| r.has_key(user_id, date))
    }

    /// Insert `record`, replacing every row with the same key.
    ///
    /// The record is appended at the end. Returns true when a row was replaced.
    pub fn upsert(&mut self, record: DailyRecord) -> bool {
        let before = self.rows.len();
        self.rows.retain(|r| !r.has_key(&record.user_id, record.date));
        let replaced = self.rows.len() != before;
        self.rows.push(record);
        replaced
    }

    /// The row for `user_id` that was saved last.
    #[must_use]
    pub fn latest_for(&self, user_id: &str) -> Option<&DailyRecord> {
        self.rows.iter().rev().find(|r| r.user_id == user_id)
    }

    pub fn for_user<'a>(&'a self, user_id: &'a str) -> impl Iterator<Item = &'a DailyRecord> + 'a {
        self.rows.iter().filter(move |r| r.user_id == user_id)
    }
}
