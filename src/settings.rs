use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use qrcode::EcLevel;
use serde::Deserialize;

use crate::cards::qr;
use crate::error::{DeckError, DeckResult};

const CONFIG_FILE: &str = "songdeck";
const ENV_PREFIX: &str = "SONGDECK";
const DEFAULT_PAGE_CAPACITY: NonZeroUsize = NonZeroUsize::new(12).unwrap();

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub api_base: String,
    pub token_url: String,
    pub batch_delay_ms: u64,
    pub page_capacity: NonZeroUsize,
    pub qr_error_correction: String,
    pub front_template: PathBuf,
    pub back_template: PathBuf,
    pub stylesheet: PathBuf,
    pub background: PathBuf,
    pub imported_dir: PathBuf,
    pub generated_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            api_base: "https://api.spotify.com/v1".into(),
            token_url: "https://accounts.spotify.com/api/token".into(),
            batch_delay_ms: 150,
            page_capacity: DEFAULT_PAGE_CAPACITY,
            qr_error_correction: "H".into(),
            front_template: "templates/cards_front_template.html".into(),
            back_template: "templates/cards_back_template.html".into(),
            stylesheet: "templates/cards.css".into(),
            background: "assets/card_bg_04.png".into(),
            imported_dir: "imported_tracks".into(),
            generated_dir: "generated_cards".into(),
        }
    }
}

impl Settings {
    /// `songdeck.toml` (optional) overlaid by `SONGDECK_*` environment variables.
    pub fn load() -> DeckResult<Self> {
        Self::build(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX)),
        )
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> DeckResult<Self> {
        let settings: Settings = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| DeckError::config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> DeckResult<()> {
        self.ec_level().map(|_| ())
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn ec_level(&self) -> DeckResult<EcLevel> {
        qr::parse_ec_level(&self.qr_error_correction).ok_or_else(|| {
            DeckError::config(format!(
                "qr_error_correction must be one of L, M, Q, H (got {:?})",
                self.qr_error_correction
            ))
        })
    }

    /// Client id and secret, both required for the token exchange.
    pub fn credentials(&self) -> DeckResult<(&str, &str)> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(DeckError::config(format!(
                "{ENV_PREFIX}_CLIENT_ID and {ENV_PREFIX}_CLIENT_SECRET must be set"
            ))),
        }
    }
}
