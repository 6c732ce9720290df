use core::fmt;
use core::str::FromStr;

use std::fs;
use std::path::Path;

use log::debug;
use log::info;
use log::warn;

use serde::Deserialize;
use serde::Serialize;

use crate::document::Document;
use crate::document::Section;
use crate::error::ConfigError;
use crate::start_time::StartTime;

pub const OPENSPRINKLER: &str = "opensprinkler";
pub const DATABASE: &str = "database";
pub const IRRIGATION: &str = "irrigation";

/// Longest slot there can be.
pub const MAX_SLOT_MINUTES: u32 = 24 * 60;

/// A validated configuration.
///
/// Deserializing goes through the same checks as [`Config::from_document`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(try_from = "UncheckedConfig")]
pub struct Config {
    pub opensprinkler: OpenSprinkler,
    pub database: Database,
    pub irrigation: Irrigation,
}

#[derive(Deserialize)]
struct UncheckedConfig {
    opensprinkler: OpenSprinkler,
    database: Database,
    irrigation: Irrigation,
}
impl TryFrom<UncheckedConfig> for Config {
    type Error = ConfigError;

    fn try_from(unchecked: UncheckedConfig) -> Result<Config, ConfigError> {
        let UncheckedConfig {
            opensprinkler,
            database,
            irrigation,
        } = unchecked;
        let config = Config {
            opensprinkler,
            database,
            irrigation,
        };
        Config::from_document(&config.to_document()?)
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct OpenSprinkler {
    /// Base URL of the controller, e.g. `http://192.168.1.20`.
    pub controller: String,
    pub password: Password,
}

/// Controller credential; never shown by `Debug` or `Display`.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Password(String);
impl Password {
    pub fn new(password: impl Into<String>) -> Password {
        Password(password.into())
    }
    pub fn expose(&self) -> &str {
        &self.0
    }
}
impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "Password(***)")
    }
}
impl fmt::Display for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "***")
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Database {
    /// Connection string handed to the database driver.
    pub config: String,
    /// Table holding the irrigation lines, optionally schema-qualified.
    pub table: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Irrigation {
    /// Length of each watering slot.
    pub slot_minutes: u32,
    /// Prefix of the names of generated programs, may be empty.
    #[serde(default)]
    pub program_name_prefix: String,
    /// One entry per daily slot, in order.
    pub slots: Vec<Slot>,
}
impl Irrigation {
    pub fn daily_slots(&self) -> usize {
        self.slots.len()
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct Slot {
    pub name: String,
    pub time: StartTime,
}

fn slot_name_key(n: usize) -> String {
    format!("slot_{n}_name")
}
fn slot_time_key(n: usize) -> String {
    format!("slot_{n}_time")
}

impl Config {
    /// Reads and validates a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = contents.parse::<Config>()?;
        info!(
            "loaded {} with {} daily slots",
            path.display(),
            config.irrigation.daily_slots()
        );
        Ok(config)
    }

    pub fn from_document(doc: &Document) -> Result<Config, ConfigError> {
        for (name, _) in doc.sections() {
            if ![OPENSPRINKLER, DATABASE, IRRIGATION].contains(&name) {
                debug!("ignoring unknown section [{name}]");
            }
        }
        let opensprinkler = OpenSprinkler::from_section(require_section(doc, OPENSPRINKLER)?)?;
        let database = Database::from_section(require_section(doc, DATABASE)?)?;
        let irrigation = Irrigation::from_section(require_section(doc, IRRIGATION)?)?;
        Ok(Config {
            opensprinkler,
            database,
            irrigation,
        })
    }

    /// The document this configuration is written as.
    ///
    /// Fails for values the INI format cannot carry, such as a slot name
    /// containing ` #`.
    pub fn to_document(&self) -> Result<Document, ConfigError> {
        let mut doc = Document::new();
        doc.set(OPENSPRINKLER, "controller", &self.opensprinkler.controller)?;
        doc.set(OPENSPRINKLER, "password", self.opensprinkler.password.expose())?;
        doc.set(DATABASE, "config", &self.database.config)?;
        doc.set(DATABASE, "table", &self.database.table)?;
        let irrigation = &self.irrigation;
        doc.set(IRRIGATION, "daily_slots", irrigation.daily_slots().to_string())?;
        doc.set(IRRIGATION, "slot_minutes", irrigation.slot_minutes.to_string())?;
        doc.set(
            IRRIGATION,
            "program_name_prefix",
            &irrigation.program_name_prefix,
        )?;
        for (i, slot) in irrigation.slots.iter().enumerate() {
            doc.set(IRRIGATION, &slot_name_key(i + 1), &slot.name)?;
            doc.set(IRRIGATION, &slot_time_key(i + 1), slot.time.encode().to_string())?;
        }
        Ok(doc)
    }
}
impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Config, ConfigError> {
        Config::from_document(&Document::parse(s)?)
    }
}

fn require_section<'a>(doc: &'a Document, name: &str) -> Result<&'a Section, ConfigError> {
    doc.section(name).ok_or_else(|| ConfigError::MissingSection {
        section: name.to_string(),
    })
}

fn require<'a>(section: &'a Section, section_name: &str, key: &str) -> Result<&'a str, ConfigError> {
    section
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| ConfigError::missing_key(section_name, key))
}

fn require_positive(
    section: &Section,
    section_name: &str,
    key: &str,
    max: u32,
) -> Result<u32, ConfigError> {
    let value = require(section, section_name, key)?;
    let n = value
        .parse::<u32>()
        .map_err(|_| ConfigError::malformed_integer(section_name, key, value))?;
    if n == 0 {
        return Err(ConfigError::invalid_value(section_name, key, "must be positive"));
    }
    if n > max {
        return Err(ConfigError::invalid_value(
            section_name,
            key,
            format!("must be at most {max}"),
        ));
    }
    Ok(n)
}

impl OpenSprinkler {
    fn from_section(section: &Section) -> Result<OpenSprinkler, ConfigError> {
        let controller = require(section, OPENSPRINKLER, "controller")?;
        check_url(controller)
            .map_err(|reason| ConfigError::invalid_value(OPENSPRINKLER, "controller", reason))?;
        let password = require(section, OPENSPRINKLER, "password")?;
        if password.is_empty() {
            return Err(ConfigError::invalid_value(
                OPENSPRINKLER,
                "password",
                "must not be empty",
            ));
        }
        Ok(OpenSprinkler {
            controller: controller.to_string(),
            password: Password::new(password),
        })
    }
}

/// Accepts `http://host[:port][/path]` and the `https` equivalent.
fn check_url(url: &str) -> Result<(), String> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| format!("{url:?} is not an http or https URL"))?;
    let authority = rest.split('/').next().unwrap_or_default();
    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed
            .split_once(']')
            .ok_or_else(|| format!("{url:?} has an unterminated IPv6 address"))?;
        match after {
            "" => (host, None),
            _ => match after.strip_prefix(':') {
                Some(port) => (host, Some(port)),
                None => return Err(format!("{url:?} has no valid host")),
            },
        }
    } else {
        match authority.split_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };
    if let Some(port) = port {
        if port.parse::<u16>().is_err() {
            return Err(format!("{port:?} is not a valid port"));
        }
    }
    if host.is_empty() || host.chars().any(char::is_whitespace) {
        return Err(format!("{url:?} has no valid host"));
    }
    Ok(())
}

impl Database {
    fn from_section(section: &Section) -> Result<Database, ConfigError> {
        let config = require(section, DATABASE, "config")?;
        if config.is_empty() {
            return Err(ConfigError::invalid_value(
                DATABASE,
                "config",
                "must not be empty",
            ));
        }
        let table = require(section, DATABASE, "table")?;
        if !is_qualified_identifier(table) {
            return Err(ConfigError::invalid_value(
                DATABASE,
                "table",
                format!("{table:?} is not a table name of the form [schema.]table"),
            ));
        }
        Ok(Database {
            config: config.to_string(),
            table: table.to_string(),
        })
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        }
        _ => false,
    }
}

fn is_qualified_identifier(s: &str) -> bool {
    let parts = s.split('.').collect::<Vec<_>>();
    parts.len() <= 2 && parts.iter().all(|p| is_identifier(p))
}

impl Irrigation {
    fn from_section(section: &Section) -> Result<Irrigation, ConfigError> {
        let daily_slots = require_positive(section, IRRIGATION, "daily_slots", u32::MAX)? as usize;
        let slot_minutes = require_positive(section, IRRIGATION, "slot_minutes", MAX_SLOT_MINUTES)?;
        let program_name_prefix = section
            .get("program_name_prefix")
            .cloned()
            .unwrap_or_default();

        // Count from the keys present, daily_slots may be far larger.
        let is_complete =
            |n: usize| section.contains_key(&slot_name_key(n)) && section.contains_key(&slot_time_key(n));
        let complete = section
            .keys()
            .filter_map(|key| key.strip_suffix("_name").and(slot_index(key)))
            .filter(|&n| 1 <= n && n <= daily_slots && is_complete(n))
            .count();
        if complete < daily_slots {
            let first_gap = (1..=daily_slots).find(|&n| !is_complete(n)).unwrap_or(1);
            let missing = if section.contains_key(&slot_name_key(first_gap)) {
                slot_time_key(first_gap)
            } else {
                slot_name_key(first_gap)
            };
            return Err(ConfigError::SlotCountMismatch {
                expected: daily_slots,
                found: complete,
                missing,
            });
        }

        let mut slots = Vec::with_capacity(daily_slots);
        for n in 1..=daily_slots {
            let name = require(section, IRRIGATION, &slot_name_key(n))?;
            let time_key = slot_time_key(n);
            let time_text = require(section, IRRIGATION, &time_key)?;
            let value = time_text
                .parse::<u16>()
                .map_err(|_| ConfigError::malformed_integer(IRRIGATION, &time_key, time_text))?;
            let time = StartTime::decode(value).map_err(|source| {
                ConfigError::InvalidTimeEncoding {
                    section: IRRIGATION.to_string(),
                    key: time_key.clone(),
                    value,
                    source,
                }
            })?;
            debug!("slot {n}: {name} at {time}");
            slots.push(Slot {
                name: name.to_string(),
                time,
            });
        }

        for key in section.keys() {
            if is_known_key(key, daily_slots) {
                continue;
            }
            if slot_index(key).is_some() {
                warn!("ignoring {key}, there are only {daily_slots} daily slots");
            } else {
                debug!("ignoring unknown key {key} in [{IRRIGATION}]");
            }
        }

        Ok(Irrigation {
            slot_minutes,
            program_name_prefix,
            slots,
        })
    }
}

/// Slot number of a `slot_N_name` or `slot_N_time` key.
fn slot_index(key: &str) -> Option<usize> {
    let rest = key.strip_prefix("slot_")?;
    let digits = rest
        .strip_suffix("_name")
        .or_else(|| rest.strip_suffix("_time"))?;
    digits.parse().ok()
}

fn is_known_key(key: &str, daily_slots: usize) -> bool {
    match key {
        "daily_slots" | "slot_minutes" | "program_name_prefix" => true,
        _ => slot_index(key).map_or(false, |n| 1 <= n && n <= daily_slots),
    }
}
