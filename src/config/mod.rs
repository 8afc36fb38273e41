use crate::core::roles::{RoleLimits, StaticDirectory};
use crate::core::rollover::RolloverSchedule;
use crate::core::store::RetentionPolicy;
use crate::errors::{AppError, AppResult};
use crate::models::record::MemberId;
use crate::models::role::RoleId;
use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TEAM_LEADER_ROLE: &str = "team_leader";
pub const DEFAULT_CHATTER_ROLE: &str = "chatter";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: String,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_minutes: u64,
    #[serde(default = "default_initial_sweep_delay")]
    pub initial_sweep_delay_secs: u64,
    #[serde(default)]
    pub rollover: RolloverSettings,
    #[serde(default = "default_role_limits")]
    pub role_limits: BTreeMap<String, f64>,
    #[serde(default)]
    pub retention: RetentionPolicy,
    #[serde(default)]
    pub notify_member_on_expiry: bool,
    #[serde(default = "default_keep_exports")]
    pub keep_exports: bool,
    #[serde(default)]
    pub members: Vec<MemberEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RolloverSettings {
    /// Weekday name or abbreviation ("Wednesday", "wed").
    pub weekday: String,
    /// Local time of day, "HH:MM".
    pub time: String,
    pub utc_offset_hours: i32,
}

impl Default for RolloverSettings {
    fn default() -> Self {
        Self {
            weekday: "Wednesday".to_string(),
            time: "06:00".to_string(),
            utc_offset_hours: 8,
        }
    }
}

/// Member entry of the static directory used by the bundled binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberEntry {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

fn default_export_dir() -> String {
    Config::config_dir()
        .join("csv")
        .to_string_lossy()
        .to_string()
}
fn default_sweep_interval() -> u64 {
    20
}
fn default_initial_sweep_delay() -> u64 {
    30
}
fn default_keep_exports() -> bool {
    true
}
fn default_role_limits() -> BTreeMap<String, f64> {
    BTreeMap::from([
        (DEFAULT_TEAM_LEADER_ROLE.to_string(), 12.25), // 12h 15m
        (DEFAULT_CHATTER_ROLE.to_string(), 16.25),     // 16h 15m
    ])
}

impl Default for Config {
    fn default() -> Self {
        Self::with_database(Self::database_file())
    }
}

impl Config {
    fn with_database(db_path: PathBuf) -> Self {
        Self {
            database: db_path.to_string_lossy().to_string(),
            export_dir: default_export_dir(),
            sweep_interval_minutes: default_sweep_interval(),
            initial_sweep_delay_secs: default_initial_sweep_delay(),
            rollover: RolloverSettings::default(),
            role_limits: default_role_limits(),
            retention: RetentionPolicy::default(),
            notify_member_on_expiry: false,
            keep_exports: default_keep_exports(),
            members: Vec::new(),
        }
    }

    /// Return the standard configuration directory (`~/.shiftclock`)
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".shiftclock")
    }

    /// Return the full path of the config file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("shiftclock.conf")
    }

    /// Return the full path of the SQLite database
    pub fn database_file() -> PathBuf {
        Self::config_dir().join("shiftclock.sqlite")
    }

    /// Load configuration from file, or return defaults if not found
    pub fn load() -> AppResult<Self> {
        Self::load_from(&Self::config_file())
    }

    pub fn load_from(path: &Path) -> AppResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        let cfg: Config = serde_yaml::from_str(&content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Initialize configuration and database files
    pub fn init_all(custom_db: Option<String>, is_test: bool) -> AppResult<Self> {
        let dir = Self::config_dir();

        let db_path = match custom_db {
            Some(name) => {
                let p = Path::new(&name);
                if p.is_absolute() {
                    p.to_path_buf()
                } else {
                    dir.join(p)
                }
            }
            None => Self::database_file(),
        };

        let config = Self::with_database(db_path.clone());

        if !is_test {
            fs::create_dir_all(&dir)?;
            let yaml = serde_yaml::to_string(&config)?;
            let mut file = fs::File::create(Self::config_file())?;
            file.write_all(yaml.as_bytes())?;
            println!("✅ Config file: {:?}", Self::config_file());
        }

        if let Some(parent) = db_path.parent() {
            fs::create_dir_all(parent)?;
        }
        if !db_path.exists() {
            fs::File::create(&db_path)?;
        }

        println!("✅ Database:    {:?}", db_path);

        Ok(config)
    }

    /// Check the values serde cannot check on its own.
    pub fn validate(&self) -> AppResult<()> {
        if self.sweep_interval_minutes == 0 {
            return Err(AppError::Config(
                "sweep_interval_minutes must be greater than zero".into(),
            ));
        }
        if self.sweep_interval_minutes.checked_mul(60).is_none() {
            return Err(AppError::Config(
                "sweep_interval_minutes is too large".into(),
            ));
        }
        self.role_limits()?;
        self.rollover_schedule()?;
        Ok(())
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_minutes.saturating_mul(60))
    }

    pub fn initial_sweep_delay(&self) -> Duration {
        Duration::from_secs(self.initial_sweep_delay_secs)
    }

    pub fn role_limits(&self) -> AppResult<RoleLimits> {
        RoleLimits::from_entries(
            self.role_limits
                .iter()
                .map(|(role, hours)| (RoleId::new(role.as_str()), *hours)),
        )
    }

    pub fn rollover_schedule(&self) -> AppResult<RolloverSchedule> {
        let weekday: Weekday = self.rollover.weekday.parse().map_err(|_| {
            AppError::Config(format!("Invalid rollover weekday '{}'", self.rollover.weekday))
        })?;
        let time = NaiveTime::parse_from_str(&self.rollover.time, "%H:%M").map_err(|_| {
            AppError::Config(format!("Invalid rollover time '{}'", self.rollover.time))
        })?;
        RolloverSchedule::new(weekday, time, self.rollover.utc_offset_hours)
    }

    pub fn directory(&self) -> StaticDirectory {
        let mut dir = StaticDirectory::default();
        for m in &self.members {
            dir.insert(
                MemberId::new(m.id.as_str()),
                m.display_name.clone(),
                m.roles.iter().map(|r| RoleId::new(r.as_str())),
            );
        }
        dir
    }
}
