use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::NaiveDate;
use log::info;

use crate::dashboard::{DashboardView, Goals, compute_dashboard};
use crate::media::{MediaCache, MediaItem, MediaSummary};
use crate::models::{DailyMetrics, DailyRecord, Profile, ProfileUpdate};
use crate::store::{RecordStore, SCHEMA};
use crate::table::Table;
use crate::users::{User, UserStore};

pub const RECORDS_FILE: &str = "synclife.csv";
pub const USERS_FILE: &str = "users.csv";

/// Entry point for front ends.
///
/// Every read goes back to disk, so the file is the only shared state
/// between calls. Media lives in memory only.
pub struct SyncLifeService {
    records: RecordStore,
    users: UserStore,
    media: MediaCache,
}

impl SyncLifeService {
    /// Service over `synclife.csv` and `users.csv` inside `data_dir`.
    pub fn open(data_dir: &Path) -> Self {
        Self::new(data_dir.join(RECORDS_FILE), data_dir.join(USERS_FILE))
    }

    pub fn new(records_path: impl Into<PathBuf>, users_path: impl Into<PathBuf>) -> Self {
        Self::with_stores(RecordStore::new(records_path), UserStore::new(users_path))
    }

    #[must_use]
    pub fn with_stores(records: RecordStore, users: UserStore) -> Self {
        Self {
            records,
            users,
            media: MediaCache::new(),
        }
    }

    #[must_use]
    pub fn records_path(&self) -> &Path {
        self.records.path()
    }

    #[must_use]
    pub fn load_table(&self) -> Table {
        self.records.load_all(SCHEMA)
    }

    // --- Records ---

    /// Upsert `record` and rewrite the table.
    pub fn save_entry(&self, record: DailyRecord) -> Result<DailyRecord> {
        let mut table = self.load_table();
        let replaced = table.upsert(record.clone());
        self.records.save_all(&table)?;
        info!(
            "{} entry for user '{}' on {}",
            if replaced { "replaced" } else { "saved" },
            record.user_id,
            record.date
        );
        Ok(record)
    }

    /// Build the day's record from the current profile plus `update`, then save
    /// it. Attached `media` goes to the session cache only.
    pub fn log_day(
        &mut self,
        user_id: &str,
        date: NaiveDate,
        update: ProfileUpdate,
        metrics: DailyMetrics,
        media: Vec<MediaItem>,
    ) -> Result<DailyRecord> {
        let profile = update.apply(&self.current_profile(user_id));
        let record = self.save_entry(metrics.into_record(user_id, date, &profile))?;
        self.media.store(user_id, date, media);
        Ok(record)
    }

    #[must_use]
    pub fn get_entry(&self, user_id: &str, date: NaiveDate) -> Option<DailyRecord> {
        self.load_table().get(user_id, date).cloned()
    }

    /// Journal text already saved for the day, empty when there is none.
    /// Front ends keep it when an edit leaves the notes out.
    #[must_use]
    pub fn saved_notes(&self, user_id: &str, date: NaiveDate) -> String {
        self.get_entry(user_id, date)
            .map(|r| r.notes)
            .unwrap_or_default()
    }

    /// Profile from the user's most recently saved row, or the defaults.
    #[must_use]
    pub fn current_profile(&self, user_id: &str) -> Profile {
        self.load_table()
            .latest_for(user_id)
            .map_or_else(Profile::default, DailyRecord::profile)
    }

    /// Dashboard for `(user_id, date)` against the user's current goals.
    /// `None` when nothing was saved for that day.
    #[must_use]
    pub fn dashboard(&self, user_id: &str, date: NaiveDate) -> Option<DashboardView> {
        let table = self.load_table();
        let record = table.get(user_id, date)?;
        let profile = table
            .latest_for(user_id)
            .map_or_else(Profile::default, DailyRecord::profile);
        Some(compute_dashboard(record, &Goals::from(&profile)))
    }

    /// The user's rows, newest date first, limited to the `days` days ending at
    /// `today` when given. A window of zero days is empty.
    #[must_use]
    pub fn history(&self, user_id: &str, days: Option<u32>, today: NaiveDate) -> Vec<DailyRecord> {
        if days == Some(0) {
            return Vec::new();
        }
        let cutoff = days.map(|d| today - chrono::Duration::days(i64::from(d.saturating_sub(1))));
        let table = self.load_table();
        let mut rows: Vec<DailyRecord> = table
            .for_user(user_id)
            .filter(|r| cutoff.is_none_or(|c| r.date >= c && r.date <= today))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }

    // --- Users ---

    pub fn register(&self, email: &str, name: &str, password: &str) -> Result<User> {
        self.users.register(email, name, password)
    }

    pub fn login(&self, email: &str, password: &str) -> Result<User> {
        self.users.authenticate(email, password)
    }

    pub fn find_user(&self, email: &str) -> Result<Option<User>> {
        self.users.find(email)
    }

    // --- Session media ---

    pub fn attach_media(&mut self, user_id: &str, date: NaiveDate, item: MediaItem) {
        self.media.append(user_id, date, item);
    }

    #[must_use]
    pub fn media_for(&self, user_id: &str, date: NaiveDate) -> Vec<MediaSummary> {
        self.media.summaries(user_id, date)
    }
}
