//! INI file configuration adapter.

use crate::domain::error::PivotraderError;
use crate::ports::config_port::{ConfigPort, ValueKind, parse_bool};
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PivotraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config
            .load(path)
            .map_err(|reason| PivotraderError::ConfigParse {
                file: path.display().to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, PivotraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| PivotraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(parse_bool)
            .unwrap_or(default)
    }

    fn check_value(&self, section: &str, key: &str, kind: ValueKind) -> Result<(), String> {
        let parsed = match kind {
            ValueKind::Int => self.config.getint(section, key).map(|_| ()),
            ValueKind::Float => self.config.getfloat(section, key).map(|_| ()),
            ValueKind::Bool => match self.config.get(section, key) {
                Some(v) if parse_bool(&v).is_none() => Err(format!("'{}' is not a boolean", v)),
                _ => Ok(()),
            },
        };
        parsed.map_err(|reason| format!("expected a {}: {}", kind, reason))
    }
}
