use std::fs;
use std::path::Path;
use std::sync::Arc;

use redb::{
    CommitError, Database, DatabaseError, ReadableTable, StorageError, TableDefinition,
    TableError, TransactionError,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::utils::now_ms;

const HISTORY_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("history");
const FAVORITES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("favorites");
const COMPLETED_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("completed_albums");

pub const LIST_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub user_id: String,
    pub artist_id: String,
    pub artist_name: String,
    pub visited_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumBookmark {
    pub id: String,
    pub user_id: String,
    pub album_id: String,
    pub album_name: String,
    pub album_image: Option<String>,
    pub album_tracks: String,
    pub saved_at: u64,
}

/// Favorites and completed albums share a row shape; only the table differs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookmarkKind {
    Favorite,
    Completed,
}

impl BookmarkKind {
    fn table(self) -> TableDefinition<'static, &'static str, &'static [u8]> {
        match self {
            BookmarkKind::Favorite => FAVORITES_TABLE,
            BookmarkKind::Completed => COMPLETED_TABLE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewBookmark {
    pub album_id: String,
    pub album_name: String,
    pub album_image: Option<String>,
    pub album_tracks: String,
}

#[derive(Debug)]
pub enum BookmarkInsert {
    Created(AlbumBookmark),
    Exists(AlbumBookmark),
}

#[derive(Clone)]
pub struct UserDataStore {
    db: Arc<Database>,
}

impl UserDataStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn init_tables(&self) -> Result<(), UserDataError> {
        let write_txn = self.db.begin_write()?;
        {
            let _ = write_txn.open_table(HISTORY_TABLE)?;
            let _ = write_txn.open_table(FAVORITES_TABLE)?;
            let _ = write_txn.open_table(COMPLETED_TABLE)?;
        }
        write_txn.commit()?;
        Ok(())
    }

    pub fn add_history(
        &self,
        user_id: &str,
        artist_id: &str,
        artist_name: &str,
    ) -> Result<HistoryEntry, UserDataError> {
        let entry = HistoryEntry {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            artist_id: artist_id.to_string(),
            artist_name: artist_name.to_string(),
            visited_at: now_ms(),
        };
        let key = row_key(user_id, &entry.id);
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(HISTORY_TABLE)?;
            let bytes = encode_value(&entry)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        write_txn.commit()?;
        Ok(entry)
    }

    /// Newest first, at most `limit` entries.
    pub fn list_history(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, UserDataError> {
        let mut items: Vec<HistoryEntry> = self.scan_user(HISTORY_TABLE, user_id)?;
        items.sort_by(|a, b| b.visited_at.cmp(&a.visited_at));
        items.truncate(limit);
        Ok(items)
    }

    /// Stores the album unless this user already has it under `kind`.
    pub fn add_bookmark(
        &self,
        kind: BookmarkKind,
        user_id: &str,
        album: NewBookmark,
    ) -> Result<BookmarkInsert, UserDataError> {
        let key = row_key(user_id, &album.album_id);
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(kind.table())?;
            let existing: Option<AlbumBookmark> = match table.get(key.as_str())? {
                Some(value) => Some(decode_value(value.value())?),
                None => None,
            };
            match existing {
                Some(bookmark) => BookmarkInsert::Exists(bookmark),
                None => {
                    let bookmark = AlbumBookmark {
                        id: Uuid::new_v4().to_string(),
                        user_id: user_id.to_string(),
                        album_id: album.album_id,
                        album_name: album.album_name,
                        album_image: album.album_image,
                        album_tracks: album.album_tracks,
                        saved_at: now_ms(),
                    };
                    let bytes = encode_value(&bookmark)?;
                    table.insert(key.as_str(), bytes.as_slice())?;
                    BookmarkInsert::Created(bookmark)
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    /// Returns whether a row was actually removed.
    pub fn remove_bookmark(
        &self,
        kind: BookmarkKind,
        user_id: &str,
        album_id: &str,
    ) -> Result<bool, UserDataError> {
        let key = row_key(user_id, album_id);
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(kind.table())?;
            let previous = table.remove(key.as_str())?;
            previous.is_some()
        };
        write_txn.commit()?;
        Ok(removed)
    }

    pub fn list_bookmarks(
        &self,
        kind: BookmarkKind,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<AlbumBookmark>, UserDataError> {
        let mut items: Vec<AlbumBookmark> = self.scan_user(kind.table(), user_id)?;
        items.sort_by(|a, b| b.saved_at.cmp(&a.saved_at));
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    /// The subset of `album_ids` this user has marked completed, in input order.
    pub fn completed_ids(
        &self,
        user_id: &str,
        album_ids: &[String],
    ) -> Result<Vec<String>, UserDataError> {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(COMPLETED_TABLE) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        let mut ids = Vec::new();
        for album_id in album_ids {
            let key = row_key(user_id, album_id);
            if table.get(key.as_str())?.is_some() && !ids.contains(album_id) {
                ids.push(album_id.clone());
            }
        }
        Ok(ids)
    }

    fn scan_user<T>(
        &self,
        definition: TableDefinition<'static, &'static str, &'static [u8]>,
        user_id: &str,
    ) -> Result<Vec<T>, UserDataError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let read_txn = self.db.begin_read()?;
        let table = match read_txn.open_table(definition) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        // ';' sorts right after ':', so this range is exactly the user's rows.
        let start = format!("{}:", user_id);
        let end = format!("{};", user_id);
        let mut items = Vec::new();
        for entry in table.range(start.as_str()..end.as_str())? {
            let entry = entry?;
            items.push(decode_value(entry.1.value())?);
        }
        Ok(items)
    }
}

fn row_key(user_id: &str, id: &str) -> String {
    format!("{}:{}", user_id, id)
}

pub fn open_or_create_db(path: &Path) -> Result<Database, UserDataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    if path.exists() {
        Ok(Database::open(path)?)
    } else {
        Ok(Database::create(path)?)
    }
}

#[derive(Debug)]
pub enum UserDataError {
    Io(std::io::Error),
    Database(DatabaseError),
    Table(TableError),
    Transaction(TransactionError),
    Storage(StorageError),
    Commit(CommitError),
    Bincode(Box<bincode::ErrorKind>),
}

impl From<std::io::Error> for UserDataError {
    fn from(err: std::io::Error) -> Self {
        UserDataError::Io(err)
    }
}

impl From<DatabaseError> for UserDataError {
    fn from(err: DatabaseError) -> Self {
        UserDataError::Database(err)
    }
}

impl From<TableError> for UserDataError {
    fn from(err: TableError) -> Self {
        UserDataError::Table(err)
    }
}

impl From<TransactionError> for UserDataError {
    fn from(err: TransactionError) -> Self {
        UserDataError::Transaction(err)
    }
}

impl From<StorageError> for UserDataError {
    fn from(err: StorageError) -> Self {
        UserDataError::Storage(err)
    }
}

impl From<CommitError> for UserDataError {
    fn from(err: CommitError) -> Self {
        UserDataError::Commit(err)
    }
}

impl From<Box<bincode::ErrorKind>> for UserDataError {
    fn from(err: Box<bincode::ErrorKind>) -> Self {
        UserDataError::Bincode(err)
    }
}

impl std::fmt::Display for UserDataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserDataError::Io(err) => write!(f, "io error: {}", err),
            UserDataError::Database(err) => write!(f, "redb database error: {}", err),
            UserDataError::Table(err) => write!(f, "redb table error: {}", err),
            UserDataError::Transaction(err) => write!(f, "redb transaction error: {}", err),
            UserDataError::Storage(err) => write!(f, "redb storage error: {}", err),
            UserDataError::Commit(err) => write!(f, "redb commit error: {}", err),
            UserDataError::Bincode(err) => write!(f, "bincode error: {}", err),
        }
    }
}

impl std::error::Error for UserDataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            UserDataError::Io(err) => Some(err),
            UserDataError::Database(err) => Some(err),
            UserDataError::Table(err) => Some(err),
            UserDataError::Transaction(err) => Some(err),
            UserDataError::Storage(err) => Some(err),
            UserDataError::Commit(err) => Some(err),
            UserDataError::Bincode(err) => Some(err),
        }
    }
}

fn encode_value<T: Serialize>(value: &T) -> Result<Vec<u8>, UserDataError> {
    Ok(bincode::serialize(value)?)
}

fn decode_value<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T, UserDataError> {
    Ok(bincode::deserialize(bytes)?)
}
