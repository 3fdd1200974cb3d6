//! Build the batch collaborators from configuration.
//!
//! Maps the `[universe]`, `[events]` and `[prices]` sections onto concrete
//! providers. Price providers are returned boxed so the batch does not care
//! which source is active.

use crate::config::{BatchConfig, PriceSourceConfig};
use earnlab_core::data::{
    CachedUniverseResolver, CircuitBreaker, CsvEventProvider, CsvPriceProvider, DataError,
    PriceProvider, SyntheticPriceProvider, Universe, YahooProvider,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Event provider for the configured events directory.
pub fn event_provider(config: &BatchConfig) -> CsvEventProvider {
    CsvEventProvider::new(&config.events.dir, config.events.unknown_timing)
}

/// Price provider for the configured source.
pub fn price_provider(config: &BatchConfig) -> Result<Box<dyn PriceProvider>, DataError> {
    match &config.prices {
        PriceSourceConfig::Yahoo { timeout_secs } => {
            let breaker = Arc::new(CircuitBreaker::default_provider());
            let provider = YahooProvider::new(breaker, Duration::from_secs(*timeout_secs))?;
            Ok(Box::new(provider))
        }
        PriceSourceConfig::Csv { dir } => {
            info!(dir = %dir.display(), "using CSV price files");
            Ok(Box::new(CsvPriceProvider::new(dir)))
        }
        PriceSourceConfig::Synthetic => {
            warn!("using synthetic prices; aligned closes are not real market data");
            Ok(Box::new(SyntheticPriceProvider::new()))
        }
    }
}

/// Universe resolver cached under the output directory.
pub fn universe_resolver(
    config: &BatchConfig,
) -> Result<CachedUniverseResolver<Universe>, DataError> {
    let universe = match &config.universe.file {
        Some(path) => Universe::from_file(path)?,
        None => Universe::default_us(),
    };
    Ok(CachedUniverseResolver::new(
        universe,
        &config.output_dir,
        config.universe.use_cache,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use earnlab_core::data::{DataSource, EventProvider, UniverseResolver};
    use earnlab_core::UnknownTiming;
    use std::path::PathBuf;

    #[test]
    fn price_source_selection() {
        let mut config = BatchConfig::default();
        assert_eq!(
            price_provider(&config).unwrap().source(),
            DataSource::YahooFinance
        );

        config.prices = PriceSourceConfig::Csv {
            dir: PathBuf::from("prices"),
        };
        assert_eq!(price_provider(&config).unwrap().source(), DataSource::CsvImport);

        config.prices = PriceSourceConfig::Synthetic;
        assert_eq!(price_provider(&config).unwrap().source(), DataSource::Synthetic);
    }

    #[test]
    fn event_policy_comes_from_config() {
        let mut config = BatchConfig::default();
        config.events.unknown_timing = UnknownTiming::BeforeOpen;
        assert_eq!(event_provider(&config).unknown_timing(), UnknownTiming::BeforeOpen);
    }

    #[test]
    fn universe_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("universe.toml");
        std::fs::write(&file, "[groups]\ncustom = [\"ZZZ\", \"AAA\"]\n").unwrap();

        let mut config = BatchConfig::default();
        config.output_dir = dir.path().join("earnings");
        config.universe.file = Some(file);

        let run_date = chrono::NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let universe = universe_resolver(&config).unwrap().resolve(run_date).unwrap();
        assert_eq!(universe.symbols(), vec!["AAA", "ZZZ"]);
    }

    #[test]
    fn missing_universe_file_is_error() {
        let mut config = BatchConfig::default();
        config.universe.file = Some(PathBuf::from("/nonexistent/universe.toml"));
        assert!(universe_resolver(&config).is_err());
    }
}
