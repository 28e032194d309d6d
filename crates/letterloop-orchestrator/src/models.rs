//! The main and translation model handles for a run.

use std::sync::Arc;

use letterloop_llm::{HttpModel, LanguageModel, ModelError, ModelSettings};
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{LetterError, Result};

/// Models used by one run.
///
/// The translation model is a separate handle; it is the main model itself
/// when no dedicated one was configured or the dedicated one failed to
/// initialize.
#[derive(Clone)]
pub struct ModelSet {
    main: Arc<dyn LanguageModel>,
    translation: Arc<dyn LanguageModel>,
    dedicated_translation: bool,
}

impl std::fmt::Debug for ModelSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSet")
            .field("main", &self.main.describe())
            .field("translation", &self.translation.describe())
            .field("dedicated_translation", &self.dedicated_translation)
            .finish()
    }
}

impl ModelSet {
    /// Uses one model for every role.
    #[must_use]
    pub fn single(main: Arc<dyn LanguageModel>) -> Self {
        Self {
            translation: Arc::clone(&main),
            main,
            dedicated_translation: false,
        }
    }

    /// Uses a dedicated translation model when it initialized, otherwise
    /// falls back to the main model with a warning.
    #[must_use]
    pub fn with_translation(
        main: Arc<dyn LanguageModel>,
        translation: std::result::Result<Arc<dyn LanguageModel>, ModelError>,
    ) -> Self {
        match translation {
            Ok(translation) => Self {
                main,
                translation,
                dedicated_translation: true,
            },
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = %main.describe(),
                    "Translation model failed to initialize, using the main model"
                );
                Self::single(main)
            }
        }
    }

    /// Builds HTTP models from configuration.
    ///
    /// # Errors
    ///
    /// Returns `LetterError::ModelUnavailable` if the main model cannot be
    /// initialized. A failing translation model is not an error.
    pub fn from_config(config: &Config) -> Result<Self> {
        let main = build(&config.model).map_err(|source| LetterError::ModelUnavailable {
            model: config.model.to_string(),
            source,
        })?;
        info!(model = %main.describe(), "Main model ready");

        Ok(match &config.translation_model {
            Some(settings) => Self::with_translation(main, build(settings)),
            None => Self::single(main),
        })
    }

    /// Model used for writing and reviewing.
    #[must_use]
    pub fn main(&self) -> &dyn LanguageModel {
        self.main.as_ref()
    }

    /// Model used for translating.
    #[must_use]
    pub fn translation(&self) -> &dyn LanguageModel {
        self.translation.as_ref()
    }

    /// Returns `true` if translation runs on its own model.
    #[must_use]
    pub const fn has_dedicated_translation(&self) -> bool {
        self.dedicated_translation
    }
}

fn build(settings: &ModelSettings) -> std::result::Result<Arc<dyn LanguageModel>, ModelError> {
    let model = HttpModel::from_settings(settings.clone())?;
    Ok(Arc::new(model))
}
