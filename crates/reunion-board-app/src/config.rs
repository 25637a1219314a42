use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use reunion_board_core::date::iso_date;
use reunion_board_core::month::{MONTHS, MonthId};
use serde::Deserialize;
use time::Date;
use time::macros::date;

const CONFIG_DIR: &str = ".reunion-board";
const CONFIG_FILE: &str = "config.toml";
const DATA_FILE: &str = "board.json";
const DEFAULT_AUTHOR: &str = "ユーザー";

/// Top-level board configuration loaded from `.reunion-board/config.toml`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BoardConfig {
    /// `[board]` table.
    #[serde(default)]
    pub board: BoardSettings,
}

impl BoardConfig {
    /// Load configuration from a working directory.
    ///
    /// A missing file yields the defaults.
    pub fn from_workdir(workdir: impl AsRef<Path>) -> Result<Self> {
        let config_path = workdir.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);
        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&config_path)
            .with_context(|| format!("failed to read {}", config_path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", config_path.display()))?;
        config
            .validate()
            .with_context(|| format!("invalid configuration in {}", config_path.display()))?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        self.board.ensure_author()
    }

    /// Resolve the data file against the working directory.
    pub fn data_path(&self, workdir: impl AsRef<Path>) -> PathBuf {
        workdir.as_ref().join(&self.board.data_file)
    }
}

/// `[board]` block.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    current_month: MonthId,
    #[serde(with = "iso_date")]
    event_date: Date,
    author: String,
    data_file: PathBuf,
}

impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            current_month: MONTHS[4].id,
            event_date: date!(2026 - 10 - 17),
            author: DEFAULT_AUTHOR.to_owned(),
            data_file: Path::new(CONFIG_DIR).join(DATA_FILE),
        }
    }
}

impl BoardSettings {
    /// Month column highlighted as "now".
    pub const fn current_month(&self) -> MonthId {
        self.current_month
    }

    /// Date of the reunion, used for the countdown.
    pub const fn event_date(&self) -> Date {
        self.event_date
    }

    /// Author recorded on new comments.
    pub fn author(&self) -> &str {
        &self.author
    }

    /// Data file path, relative to the working directory unless absolute.
    pub fn data_file(&self) -> &Path {
        &self.data_file
    }

    fn ensure_author(&self) -> Result<()> {
        if self.author.trim().is_empty() {
            bail!("author must not be empty");
        }
        Ok(())
    }
}
