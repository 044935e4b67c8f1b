//! Best-score persistence
//!
//! A single best score survives between runs. Native builds keep it in a small
//! JSON file, the web build in LocalStorage. The simulation never touches storage;
//! the host session loads once at startup and saves at every episode end.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persistence failures. None of these may affect a running episode.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("high score must be a finite number, got {0}")]
    InvalidValue(f64),
    #[error("high score storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("high score encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("high score storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable storage for the best score
pub trait HighScoreStore {
    /// Stored best score, 0 when nothing usable is stored
    fn load_high_score(&self) -> f64;

    fn save_high_score(&mut self, value: f64) -> Result<(), PersistenceError>;
}

/// On-disk/on-storage representation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HighScoreRecord {
    pub best: f64,
}

impl HighScoreRecord {
    /// Parse a stored record. Accepts the JSON form and a bare number.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let best = match serde_json::from_str::<HighScoreRecord>(text) {
            Ok(record) => record.best,
            Err(_) => text.parse::<f64>().ok()?,
        };
        (best.is_finite() && best >= 0.0).then_some(Self { best })
    }

    /// Encode a value for storage; negative scores are stored as 0
    pub fn encode(value: f64) -> Result<String, PersistenceError> {
        if !value.is_finite() {
            return Err(PersistenceError::InvalidValue(value));
        }
        Ok(serde_json::to_string(&HighScoreRecord {
            best: value.max(0.0),
        })?)
    }
}

/// Running best score (monotonic max)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HighScore {
    best: f64,
}

impl HighScore {
    pub fn new(best: f64) -> Self {
        Self {
            best: if best.is_finite() { best.max(0.0) } else { 0.0 },
        }
    }

    pub fn best(&self) -> f64 {
        self.best
    }

    /// Fold a finished episode's score in. Returns true on a new record.
    pub fn record(&mut self, score: f64) -> bool {
        if score.is_finite() && score > self.best {
            self.best = score;
            true
        } else {
            false
        }
    }
}

/// JSON file store (native)
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Clone)]
pub struct FileStore {
    path: std::path::PathBuf,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileStore {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl HighScoreStore for FileStore {
    fn load_high_score(&self) -> f64 {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => match HighScoreRecord::parse(&text) {
                Some(record) => {
                    log::info!("Loaded high score {:.1} from {}", record.best, self.path.display());
                    record.best
                }
                None => {
                    log::warn!("Ignoring unreadable high score in {}", self.path.display());
                    0.0
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No high score file at {}, starting fresh", self.path.display());
                0.0
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", self.path.display(), e);
                0.0
            }
        }
    }

    /// Write to a temp file, then rename over the old record
    fn save_high_score(&mut self, value: f64) -> Result<(), PersistenceError> {
        let json = HighScoreRecord::encode(value)?;
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        log::debug!("High score {:.1} saved to {}", value, self.path.display());
        Ok(())
    }
}

/// LocalStorage store (web)
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Clone, Default)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    const STORAGE_KEY: &'static str = "halloween_run_highscore";

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl HighScoreStore for LocalStorageStore {
    fn load_high_score(&self) -> f64 {
        let stored = Self::storage().and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten());
        match stored.as_deref().and_then(HighScoreRecord::parse) {
            Some(record) => {
                log::info!("Loaded high score {:.1}", record.best);
                record.best
            }
            None => {
                log::info!("No high score found, starting fresh");
                0.0
            }
        }
    }

    fn save_high_score(&mut self, value: f64) -> Result<(), PersistenceError> {
        let json = HighScoreRecord::encode(value)?;
        let storage = Self::storage()
            .ok_or_else(|| PersistenceError::Unavailable("no LocalStorage".into()))?;
        storage
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|e| PersistenceError::Unavailable(format!("{:?}", e)))?;
        log::info!("High score saved ({:.1})", value);
        Ok(())
    }
}

/// In-memory store for tests and throwaway runs
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub value: Option<f64>,
    pub saves: u32,
    /// Make every save fail (exercises error paths)
    pub fail_saves: bool,
}

impl HighScoreStore for MemoryStore {
    fn load_high_score(&self) -> f64 {
        self.value.unwrap_or(0.0)
    }

    fn save_high_score(&mut self, value: f64) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::Unavailable("memory store set to fail".into()));
        }
        let json = HighScoreRecord::encode(value)?;
        self.value = HighScoreRecord::parse(&json).map(|r| r.best);
        self.saves += 1;
        Ok(())
    }
}
