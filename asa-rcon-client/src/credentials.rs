use crate::{start_param_value, GameUserSettings, DEFAULT_GAME_USER_SETTINGS_PATH, START_PARAMS_ENV};
use std::path::{Path, PathBuf};

/// Environment variable that switches RCON on or off regardless of the server configuration.
pub const RCON_ENABLED_ENV: &str = "RCON_ENABLED";

pub const PASSWORD_KEY: &str = "ServerAdminPassword";
pub const PORT_KEY: &str = "RCONPort";
pub const RCON_ENABLED_KEY: &str = "RCONEnabled";

/// Everything needed to open an RCON session to the local server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub password: String,
    pub port: u16,
}

/// Discovers RCON credentials from the server's start parameters, falling back to
/// `GameUserSettings.ini`.
///
/// Nothing is cached: the settings file is read again on every lookup.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    start_params: Option<String>,
    rcon_enabled: Option<String>,
    settings_path: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    StartParams,
    Settings,
}

impl CredentialResolver {
    pub fn new(start_params: Option<String>, settings_path: impl Into<PathBuf>) -> Self {
        CredentialResolver {
            start_params,
            rcon_enabled: None,
            settings_path: settings_path.into(),
        }
    }

    /// Creates a resolver reading `ASA_START_PARAMS` and `RCON_ENABLED` from the environment and
    /// the settings file from its default location.
    pub fn from_env() -> Self {
        CredentialResolver::new(
            std::env::var(START_PARAMS_ENV).ok(),
            DEFAULT_GAME_USER_SETTINGS_PATH,
        )
        .with_rcon_enabled(std::env::var(RCON_ENABLED_ENV).ok())
    }

    /// Sets an explicit RCON on/off value that takes precedence over both configuration sources.
    pub fn with_rcon_enabled(mut self, rcon_enabled: Option<String>) -> Self {
        self.rcon_enabled = rcon_enabled;
        self
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    pub fn resolve(&self) -> crate::Result<Credentials> {
        Ok(Credentials {
            password: self.resolve_password()?,
            port: self.resolve_port()?,
        })
    }

    pub fn resolve_password(&self) -> crate::Result<String> {
        match self.lookup(PASSWORD_KEY)? {
            Some((password, source)) => {
                log::debug!("Using RCON password from {:?}", source);
                Ok(password)
            }
            None => Err(crate::Error::PasswordNotFound),
        }
    }

    pub fn resolve_port(&self) -> crate::Result<u16> {
        let (value, source) = self.lookup(PORT_KEY)?.ok_or(crate::Error::PortNotFound)?;

        match value.trim().parse::<u16>() {
            Ok(port) if port != 0 => {
                log::debug!("Using RCON port {} from {:?}", port, source);
                Ok(port)
            }
            _ => Err(crate::Error::InvalidPort(value)),
        }
    }

    /// Returns whether RCON is switched on. Servers that do not say otherwise are assumed to have
    /// it enabled.
    pub fn resolve_rcon_enabled(&self) -> crate::Result<bool> {
        if let Some(value) = self.rcon_enabled.as_deref().filter(|value| !value.is_empty()) {
            return Ok(parse_flag(value));
        }

        Ok(self
            .lookup(RCON_ENABLED_KEY)?
            .map_or(true, |(value, _)| parse_flag(&value)))
    }

    fn lookup(&self, key: &str) -> crate::Result<Option<(String, Source)>> {
        if let Some(value) = self
            .start_params
            .as_deref()
            .and_then(|params| start_param_value(params, key))
        {
            return Ok(Some((value.to_string(), Source::StartParams)));
        }

        let settings = match GameUserSettings::load(&self.settings_path)? {
            Some(settings) => settings,
            None => return Ok(None),
        };

        Ok(settings
            .server_setting(key)
            .map(|value| (value.to_string(), Source::Settings)))
    }
}

fn parse_flag(value: &str) -> bool {
    let value = value.trim();
    value == "1" || value.eq_ignore_ascii_case("true") || value.eq_ignore_ascii_case("yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn settings_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn resolver(start_params: Option<&str>, settings: &NamedTempFile) -> CredentialResolver {
        CredentialResolver::new(start_params.map(String::from), settings.path())
    }

    fn no_settings() -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GameUserSettings.ini");
        (dir, path)
    }

    #[test]
    fn test_start_params_win() {
        let settings = settings_file("[ServerSettings]\nServerAdminPassword=IniPass\nRCONPort=27025\n");
        let resolver = resolver(Some("?ServerAdminPassword=EnvPass?RCONPort=27020"), &settings);

        assert_eq!(resolver.resolve_password().unwrap(), "EnvPass");
        assert_eq!(resolver.resolve_port().unwrap(), 27020);
    }

    #[test]
    fn test_falls_back_to_settings() {
        let settings = settings_file("[ServerSettings]\nServerAdminPassword=IniPassword456\nRCONPort=27020\n");
        let resolver = resolver(Some("TheIsland_WP?listen?Port=7777"), &settings);

        assert_eq!(
            resolver.resolve().unwrap(),
            Credentials {
                password: "IniPassword456".to_string(),
                port: 27020,
            }
        );
    }

    #[test]
    fn test_sources_are_independent_per_key() {
        let settings = settings_file("[ServerSettings]\nServerAdminPassword=IniPass\n");
        let resolver = resolver(Some("?RCONPort=27020"), &settings);

        assert_eq!(resolver.resolve_password().unwrap(), "IniPass");
        assert_eq!(resolver.resolve_port().unwrap(), 27020);
    }

    #[test]
    fn test_password_not_found() {
        let (_dir, path) = no_settings();
        let resolver = CredentialResolver::new(Some("?RCONPort=27020".to_string()), path);

        assert!(matches!(
            resolver.resolve_password(),
            Err(crate::Error::PasswordNotFound)
        ));
        assert!(matches!(resolver.resolve(), Err(crate::Error::PasswordNotFound)));
    }

    #[test]
    fn test_port_not_found() {
        let settings = settings_file("[ServerSettings]\nServerAdminPassword=IniPass\n");
        let resolver = resolver(None, &settings);

        assert!(matches!(resolver.resolve_port(), Err(crate::Error::PortNotFound)));
    }

    #[test]
    fn test_missing_section() {
        let settings = settings_file("[SessionSettings]\nSessionName=My Server\n");
        let resolver = resolver(None, &settings);

        assert!(matches!(
            resolver.resolve_password(),
            Err(crate::Error::PasswordNotFound)
        ));
    }

    #[test]
    fn test_invalid_port() {
        let (_dir, path) = no_settings();

        for value in ["abc", "70000", "0"] {
            let resolver = CredentialResolver::new(Some(format!("?RCONPort={}", value)), &path);
            match resolver.resolve_port() {
                Err(crate::Error::InvalidPort(found)) => assert_eq!(found, value),
                other => panic!("unexpected result for {}: {:?}", value, other),
            }
        }
    }

    #[test]
    fn test_unparsable_settings() {
        let settings = settings_file("[ServerSettings]\nRCONPort\n");

        let from_settings = resolver(None, &settings);
        assert!(matches!(from_settings.resolve_port(), Err(crate::Error::Settings(_))));
        assert!(matches!(from_settings.resolve_password(), Err(crate::Error::Settings(_))));

        // The file is not read when the start parameters have the key
        let from_params = resolver(Some("TheIsland_WP?listen?RCONPort=27020"), &settings);
        assert_eq!(from_params.resolve_port().unwrap(), 27020);
    }

    #[test]
    fn test_settings_are_reread() {
        let settings = settings_file("[ServerSettings]\nRCONPort=27020\n");
        let resolver = resolver(None, &settings);
        assert_eq!(resolver.resolve_port().unwrap(), 27020);

        std::fs::write(settings.path(), "[ServerSettings]\nRCONPort=27021\n").unwrap();
        assert_eq!(resolver.resolve_port().unwrap(), 27021);
    }

    #[test]
    fn test_rcon_enabled_by_default() {
        let (_dir, path) = no_settings();
        assert!(CredentialResolver::new(None, path).resolve_rcon_enabled().unwrap());
    }

    #[test]
    fn test_rcon_enabled_sources() {
        let settings = settings_file("[ServerSettings]\nRCONEnabled=True\n");

        assert!(resolver(None, &settings).resolve_rcon_enabled().unwrap());
        assert!(!resolver(Some("?RCONEnabled=False"), &settings)
            .resolve_rcon_enabled()
            .unwrap());
        assert!(!resolver(Some("?RCONEnabled=True"), &settings)
            .with_rcon_enabled(Some("0".to_string()))
            .resolve_rcon_enabled()
            .unwrap());
        assert!(resolver(None, &settings)
            .with_rcon_enabled(Some("1".to_string()))
            .resolve_rcon_enabled()
            .unwrap());
    }

    #[test]
    fn test_flag_values() {
        assert!(parse_flag("true"));
        assert!(parse_flag("True"));
        assert!(parse_flag("1"));
        assert!(parse_flag(" YES "));
        assert!(!parse_flag("false"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }
}
