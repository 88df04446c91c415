// src/storage/memory.rs
use crate::domain::errors::{StorageError, StorageResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Persistent register holding the all-time peak balance
#[async_trait]
pub trait HighWaterMarkStore: Send + Sync {
    /// Stored mark, zero when nothing has been stored yet
    async fn load_high_water_mark(&self) -> StorageResult<Decimal>;

    /// Store `mark` unless a higher mark is already stored
    async fn save_high_water_mark(&self, mark: Decimal) -> StorageResult<()>;
}

/// Per-symbol trading cooldowns (symbol -> expiry)
pub type Cooldowns = HashMap<String, DateTime<Utc>>;

/// Persistent per-symbol cooldown expiries
#[async_trait]
pub trait CooldownStore: Send + Sync {
    async fn load_cooldowns(&self) -> StorageResult<Cooldowns>;

    async fn save_cooldowns(&self, cooldowns: &Cooldowns) -> StorageResult<()>;
}

/// On-disk layout of the bot memory file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotMemory {
    #[serde(default)]
    pub highest_balance: Decimal,
    #[serde(default)]
    pub cooldowns: Cooldowns,
}

/// JSON file backing the high-water mark and the cooldowns. Each writer
/// preserves the other key.
pub struct JsonMemoryStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonMemoryStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> StorageResult<BotMemory> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BotMemory::default()),
            Err(source) => {
                return Err(StorageError::Read {
                    path: self.path.display().to_string(),
                    source,
                })
            }
        };

        serde_json::from_str(&contents).map_err(|source| StorageError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })
    }

    async fn write(&self, memory: &BotMemory) -> StorageResult<()> {
        let contents = serde_json::to_string_pretty(memory).map_err(|source| StorageError::Corrupt {
            path: self.path.display().to_string(),
            source,
        })?;

        tokio::fs::write(&self.path, contents)
            .await
            .map_err(|source| StorageError::Write {
                path: self.path.display().to_string(),
                source,
            })
    }

    /// Read the memory file, treating a corrupt file as empty. Any other read
    /// failure is returned so the file is never rewritten from scratch.
    async fn read_or_default(&self) -> StorageResult<BotMemory> {
        match self.read().await {
            Err(e @ StorageError::Corrupt { .. }) => {
                log::error!("Bot memory unreadable, starting empty: {}", e);
                Ok(BotMemory::default())
            }
            other => other,
        }
    }
}

#[async_trait]
impl CooldownStore for JsonMemoryStore {
    async fn load_cooldowns(&self) -> StorageResult<Cooldowns> {
        let _guard = self.lock.lock().await;
        Ok(self.read_or_default().await?.cooldowns)
    }

    async fn save_cooldowns(&self, cooldowns: &Cooldowns) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut memory = self.read_or_default().await?;
        memory.cooldowns = cooldowns.clone();
        self.write(&memory).await
    }
}

#[async_trait]
impl HighWaterMarkStore for JsonMemoryStore {
    async fn load_high_water_mark(&self) -> StorageResult<Decimal> {
        let _guard = self.lock.lock().await;
        Ok(self.read_or_default().await?.highest_balance)
    }

    async fn save_high_water_mark(&self, mark: Decimal) -> StorageResult<()> {
        let _guard = self.lock.lock().await;
        let mut memory = self.read_or_default().await?;
        if mark <= memory.highest_balance {
            return Ok(());
        }
        memory.highest_balance = mark;
        self.write(&memory).await
    }
}

/// Volatile store for dry runs and tests
#[derive(Default)]
pub struct InMemoryStore {
    mark: Mutex<Decimal>,
    writes: Mutex<Vec<Decimal>>,
    cooldowns: Mutex<Cooldowns>,
}

impl InMemoryStore {
    pub fn with_mark(mark: Decimal) -> Self {
        Self {
            mark: Mutex::new(mark),
            ..Self::default()
        }
    }

    /// Every value saved so far, in order
    pub async fn writes(&self) -> Vec<Decimal> {
        self.writes.lock().await.clone()
    }
}

#[async_trait]
impl HighWaterMarkStore for InMemoryStore {
    async fn load_high_water_mark(&self) -> StorageResult<Decimal> {
        Ok(*self.mark.lock().await)
    }

    async fn save_high_water_mark(&self, mark: Decimal) -> StorageResult<()> {
        let mut stored = self.mark.lock().await;
        *stored = (*stored).max(mark);
        self.writes.lock().await.push(mark);
        Ok(())
    }
}

#[async_trait]
impl CooldownStore for InMemoryStore {
    async fn load_cooldowns(&self) -> StorageResult<Cooldowns> {
        Ok(self.cooldowns.lock().await.clone())
    }

    async fn save_cooldowns(&self, cooldowns: &Cooldowns) -> StorageResult<()> {
        *self.cooldowns.lock().await = cooldowns.clone();
        Ok(())
    }
}
