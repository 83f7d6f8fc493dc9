//! The local configuration file.
//!
//! A flat `key=value` file holding the account credentials, followed by a
//! `[devices]` section with one `did=product;mac;alias` line per device.
//! The two halves are read and written independently: saving credentials
//! leaves the device section untouched and rebuilding the registry leaves
//! the credential lines untouched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

pub const DEVICES_SECTION: &str = "[devices]";
const TOKEN_SENTINEL: &str = "null";

/// Get the default path of the configuration file (~/.heatzy.conf)
pub fn default_config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Failed to determine home directory",
        ))
    })?;
    Ok(home.join(".heatzy.conf"))
}

/// Handle on the configuration file backing credentials and devices.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    path: PathBuf,
}

/// Raw lines of the file, split at the `[devices]` marker, with the line
/// terminator the file uses so it is written back the same way.
#[derive(Debug)]
struct Sections {
    head: Vec<String>,
    devices: Option<Vec<String>>,
    newline: &'static str,
    trailing_newline: bool,
}

impl Default for Sections {
    fn default() -> Self {
        Self {
            head: Vec::new(),
            devices: None,
            newline: "\n",
            trailing_newline: true,
        }
    }
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Sections> {
        if !self.path.exists() {
            return Err(Error::ConfigMissing(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path)?;

        let mut sections = Sections {
            newline: if content.contains("\r\n") { "\r\n" } else { "\n" },
            trailing_newline: content.is_empty() || content.ends_with('\n'),
            ..Sections::default()
        };
        for line in content.lines() {
            match sections.devices.as_mut() {
                Some(devices) => devices.push(line.to_string()),
                None if line.trim() == DEVICES_SECTION => sections.devices = Some(Vec::new()),
                None => sections.head.push(line.to_string()),
            }
        }
        Ok(sections)
    }

    /// Replace the whole file. The new content is staged in a temporary file
    /// next to the target and renamed over it; the temporary file is removed
    /// if anything fails before the rename.
    fn write(&self, sections: &Sections) -> Result<()> {
        let mut lines: Vec<&str> = sections.head.iter().map(String::as_str).collect();
        if let Some(devices) = &sections.devices {
            lines.push(DEVICES_SECTION);
            lines.extend(devices.iter().map(String::as_str));
        }
        let mut content = lines.join(sections.newline);
        if sections.trailing_newline && !lines.is_empty() {
            content.push_str(sections.newline);
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut staged = NamedTempFile::new_in(dir)?;
        staged.write_all(content.as_bytes())?;
        staged.flush()?;
        staged.persist(&self.path).map_err(|e| e.error)?;

        debug!("Wrote configuration file: {}", self.path.display());
        Ok(())
    }
}

/// Account credentials and the current session token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
    pub appid: String,
    /// `None` until the first successful authentication.
    pub token: Option<String>,
    /// Display form of the token expiry. Advisory only.
    pub expiry: Option<String>,
}

impl Credentials {
    /// Read credentials from `config`. `login` and `password`, when given,
    /// take precedence over the stored values.
    pub fn load(config: &ConfigFile, login: Option<String>, password: Option<String>) -> Result<Self> {
        let sections = config.read()?;

        let mut credentials = Credentials::default();
        for line in &sections.head {
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let value = value.to_string();
            match key.trim() {
                "login" => credentials.login = value,
                "password" => credentials.password = value,
                "appid" => credentials.appid = value,
                "token" => credentials.token = non_sentinel(value),
                "expiry" => credentials.expiry = non_sentinel(value),
                _ => {}
            }
        }

        // A token belongs to the stored account; overriding the account
        // means logging in again.
        let mut switched = false;
        if let Some(login) = login {
            switched |= login != credentials.login;
            credentials.login = login;
        }
        if let Some(password) = password {
            switched |= password != credentials.password;
            credentials.password = password;
        }
        if switched {
            debug!("Credentials overridden, discarding stored token");
            credentials.token = None;
            credentials.expiry = None;
        }

        if credentials.appid.is_empty() {
            return Err(Error::AppIdMissing);
        }
        if credentials.login.is_empty() || credentials.password.is_empty() {
            return Err(Error::CredentialsMissing);
        }

        debug!("Loaded credentials for user: {}", credentials.login);
        Ok(credentials)
    }

    /// Overwrite login, password, token and expiry in `config`. Other lines,
    /// including `appid` and the device section, are kept as they are.
    pub fn save(&self, config: &ConfigFile) -> Result<()> {
        let mut sections = config.read()?;

        let mut fields = [
            ("login", self.login.clone(), false),
            ("password", self.password.clone(), false),
            (
                "token",
                self.token.clone().unwrap_or_else(|| TOKEN_SENTINEL.to_string()),
                false,
            ),
            (
                "expiry",
                self.expiry.clone().unwrap_or_else(|| TOKEN_SENTINEL.to_string()),
                false,
            ),
        ];

        for line in sections.head.iter_mut() {
            let Some((key, _)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            if let Some((name, value, written)) = fields.iter_mut().find(|(name, _, _)| *name == key) {
                *line = format!("{}={}", name, value);
                *written = true;
            }
        }
        for (name, value, written) in &fields {
            if !written {
                sections.head.push(format!("{}={}", name, value));
            }
        }

        config.write(&sections)?;
        debug!("Saved credentials for user: {}", self.login);
        Ok(())
    }
}

fn non_sentinel(value: String) -> Option<String> {
    if value.is_empty() || value == TOKEN_SENTINEL {
        None
    } else {
        Some(value)
    }
}

/// A device known to the local registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub did: String,
    /// Product family name as reported by the cloud, e.g. `Heatzy`.
    pub product: String,
    pub mac: String,
    pub alias: String,
}

impl DeviceRecord {
    fn parse(line: &str) -> Option<Self> {
        let (did, rest) = line.split_once('=')?;
        let did = did.trim();
        if did.is_empty() {
            return None;
        }
        let mut fields = rest.splitn(3, ';');
        Some(Self {
            did: did.to_string(),
            product: fields.next().unwrap_or_default().trim().to_string(),
            mac: fields.next().unwrap_or_default().trim().to_string(),
            alias: fields.next().unwrap_or_default().trim().to_string(),
        })
    }

    fn to_line(&self) -> String {
        format!(
            "{}={};{};{}",
            self.did,
            clean_field(&self.product),
            clean_field(&self.mac),
            self.alias.replace(['\r', '\n'], " ")
        )
    }
}

fn clean_field(value: &str) -> String {
    value.replace(['\r', '\n', ';'], " ")
}

/// Devices by identifier, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    devices: Vec<DeviceRecord>,
}

impl Registry {
    /// Read the `[devices]` section. A missing section is an empty registry.
    pub fn load(config: &ConfigFile) -> Result<Self> {
        let sections = config.read()?;
        let mut registry = Registry::default();

        for line in sections.devices.iter().flatten() {
            if line.trim().is_empty() {
                continue;
            }
            match DeviceRecord::parse(line) {
                Some(record) if registry.get(&record.did).is_some() => {
                    warn!("Ignoring duplicate device entry: {}", record.did);
                }
                Some(record) => registry.devices.push(record),
                None => warn!("Ignoring malformed device entry: {}", line),
            }
        }

        debug!("Loaded {} devices", registry.devices.len());
        Ok(registry)
    }

    /// Replace the `[devices]` section wholesale with `records`.
    pub fn rebuild(config: &ConfigFile, records: Vec<DeviceRecord>) -> Result<Self> {
        let mut registry = Registry::default();
        for record in records {
            if registry.get(&record.did).is_some() {
                warn!("Cloud listed device {} twice, keeping the first", record.did);
                continue;
            }
            registry.devices.push(record);
        }

        let mut sections = config.read()?;
        sections.devices = Some(registry.devices.iter().map(DeviceRecord::to_line).collect());
        config.write(&sections)?;

        debug!("Rebuilt registry with {} devices", registry.devices.len());
        Ok(registry)
    }

    fn get(&self, did: &str) -> Option<&DeviceRecord> {
        self.devices.iter().find(|d| d.did == did)
    }

    pub fn lookup(&self, did: &str) -> Result<&DeviceRecord> {
        self.get(did)
            .ok_or_else(|| Error::UnknownDevice(did.to_string()))
    }

    pub fn devices(&self) -> &[DeviceRecord] {
        &self.devices
    }

    pub fn ids(&self) -> Vec<&str> {
        self.devices.iter().map(|d| d.did.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
