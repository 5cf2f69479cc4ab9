use gotham_derive::StateData;

/// Application wide settings defined in configuration file.
#[derive(Deserialize, StateData, Clone)]
pub struct Settings {
    /// Postgres database url
    pub database_url: String,
    /// IP address to bind to
    pub host_address: String,
    /// Cookie settings
    pub cookie: Cookie,
}

impl Settings {
    pub fn from_slice(data: &[u8]) -> Result<Self, toml::de::Error> {
        toml::from_slice(data)
    }
}

/// Cookie related settings
#[derive(Deserialize, Clone)]
pub struct Cookie {
    /// Require HTTPS for cookies
    pub secure: bool,
    /// Restrict cookies to given domain if set
    pub domain: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn parse_config() {
        let data = br#"
            database_url = "postgres://quill@localhost/quill"
            host_address = "127.0.0.1:8080"

            [cookie]
            secure = false
        "#;
        let settings = Settings::from_slice(data).unwrap();
        assert_eq!(settings.host_address, "127.0.0.1:8080");
        assert!(settings.cookie.domain.is_none());
    }
}
