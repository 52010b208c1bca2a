use ini::{Ini, ParseOption};
use std::path::Path;

/// Location of `GameUserSettings.ini` inside the server container.
pub const DEFAULT_GAME_USER_SETTINGS_PATH: &str =
    "/home/gameserver/server-files/ShooterGame/Saved/Config/WindowsServer/GameUserSettings.ini";

/// Section of `GameUserSettings.ini` that holds the RCON settings.
pub const SERVER_SETTINGS_SECTION: &str = "ServerSettings";

/// A parsed `GameUserSettings.ini`.
#[derive(Debug)]
pub struct GameUserSettings {
    ini: Ini,
}

// Values are taken verbatim, passwords may contain quotes and backslashes.
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

impl GameUserSettings {
    /// Loads the settings file at `path`, or returns `None` if there is no such file.
    pub fn load(path: &Path) -> crate::Result<Option<Self>> {
        if !path.exists() {
            log::debug!("No settings file at {}", path.display());
            return Ok(None);
        }

        let ini = Ini::load_from_file_opt(path, parse_option()).map_err(crate::Error::Settings)?;
        Ok(Some(GameUserSettings { ini }))
    }

    pub fn parse(contents: &str) -> crate::Result<Self> {
        let ini = Ini::load_from_str_opt(contents, parse_option())
            .map_err(|err| crate::Error::Settings(ini::Error::Parse(err)))?;
        Ok(GameUserSettings { ini })
    }

    /// Looks up `key` in the `[ServerSettings]` section. Key names are matched ignoring ASCII
    /// case; empty values count as missing.
    pub fn server_setting(&self, key: &str) -> Option<&str> {
        self.ini
            .section(Some(SERVER_SETTINGS_SECTION))?
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value)
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
[ServerSettings]
ServerAdminPassword=IniPassword456
RCONEnabled=True
RCONPort=27025
MaxPlayers=70

[/Script/Engine.GameSession]
MaxPlayers=70
";

    #[test]
    fn test_server_setting_lookup() {
        let settings = GameUserSettings::parse(SAMPLE).unwrap();

        assert_eq!(settings.server_setting("ServerAdminPassword"), Some("IniPassword456"));
        assert_eq!(settings.server_setting("RCONPort"), Some("27025"));
        assert_eq!(settings.server_setting("Missing"), None);
    }

    #[test]
    fn test_key_case_is_ignored() {
        let settings = GameUserSettings::parse(SAMPLE).unwrap();
        assert_eq!(settings.server_setting("rconport"), Some("27025"));
    }

    #[test]
    fn test_other_sections_are_ignored() {
        let settings = GameUserSettings::parse("[SessionSettings]\nRCONPort=1234\n").unwrap();
        assert_eq!(settings.server_setting("RCONPort"), None);
    }

    #[test]
    fn test_empty_value_is_missing() {
        let settings = GameUserSettings::parse("[ServerSettings]\nServerAdminPassword=\n").unwrap();
        assert_eq!(settings.server_setting("ServerAdminPassword"), None);
    }

    #[test]
    fn test_values_are_verbatim() {
        let settings =
            GameUserSettings::parse("[ServerSettings]\nServerAdminPassword=a\\b\"c'd\n").unwrap();
        assert_eq!(settings.server_setting("ServerAdminPassword"), Some("a\\b\"c'd"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = GameUserSettings::load(&dir.path().join("GameUserSettings.ini")).unwrap();
        assert!(settings.is_none());
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let settings = GameUserSettings::load(file.path()).unwrap().unwrap();
        assert_eq!(settings.server_setting("RCONEnabled"), Some("True"));
    }

    #[test]
    fn test_load_unparsable_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[ServerSettings]\nRCONPort\n").unwrap();

        assert!(matches!(
            GameUserSettings::load(file.path()),
            Err(crate::Error::Settings(_))
        ));
    }
}
