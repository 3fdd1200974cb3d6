//! Equity universe: named symbol lists and their per-run resolution.
//!
//! The universe config is a TOML file of named groups (index memberships
//! such as `sp400`, `sp500`, `sp600`) and their member tickers. Resolving it
//! for a run date yields an [`EntityUniverse`]: every symbol once, sorted,
//! tagged with the group it came from. [`CachedUniverseResolver`] pins the
//! resolved universe to the run date on disk so reruns on the same day see
//! the same symbols.

use super::provider::DataError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File name of the cached universe inside a run directory.
pub const UNIVERSE_FILE: &str = "_universe.csv";

/// One symbol of a resolved universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseMember {
    pub symbol: String,
    /// Group the symbol was listed under (first one wins on overlap).
    pub source: String,
}

/// Ordered, de-duplicated set of symbols for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityUniverse {
    members: Vec<UniverseMember>,
}

impl EntityUniverse {
    /// Sorts by symbol and keeps the first occurrence of each symbol.
    pub fn new(members: impl IntoIterator<Item = UniverseMember>) -> Self {
        let mut by_symbol: BTreeMap<String, String> = BTreeMap::new();
        for m in members {
            let symbol = m.symbol.trim().to_ascii_uppercase();
            if symbol.is_empty() {
                continue;
            }
            by_symbol.entry(symbol).or_insert(m.source);
        }
        Self {
            members: by_symbol
                .into_iter()
                .map(|(symbol, source)| UniverseMember { symbol, source })
                .collect(),
        }
    }

    pub fn from_symbols<S: AsRef<str>>(symbols: &[S], source: &str) -> Self {
        Self::new(symbols.iter().map(|s| UniverseMember {
            symbol: s.as_ref().to_string(),
            source: source.to_string(),
        }))
    }

    pub fn members(&self) -> &[UniverseMember] {
        &self.members
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.symbol.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Produces the universe for a run date.
pub trait UniverseResolver: Send + Sync {
    fn resolve(&self, run_date: NaiveDate) -> Result<EntityUniverse, DataError>;
}

/// The universe configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Universe {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl Universe {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, DataError> {
        let content = fs::read_to_string(path)
            .map_err(|e| DataError::Other(format!("read universe file {}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, DataError> {
        toml::from_str(content).map_err(|e| DataError::Parse {
            source_name: "universe".into(),
            reason: e.to_string(),
        })
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, DataError> {
        toml::to_string_pretty(self).map_err(|e| DataError::Other(format!("serialize universe: {e}")))
    }

    /// Get tickers for a specific group.
    pub fn group_tickers(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(|v| v.as_slice())
    }

    pub fn group_names(&self) -> Vec<&str> {
        self.groups.keys().map(|s| s.as_str()).collect()
    }

    /// Total number of listed tickers, counting overlaps between groups.
    pub fn ticker_count(&self) -> usize {
        self.groups.values().map(|v| v.len()).sum()
    }

    /// A small default universe of large-, mid- and small-cap US equities.
    pub fn default_us() -> Self {
        let group = |tickers: &[&str]| tickers.iter().map(|t| t.to_string()).collect::<Vec<_>>();
        let mut groups = BTreeMap::new();

        groups.insert(
            "sp500".into(),
            group(&[
                "AAPL", "MSFT", "GOOGL", "AMZN", "NVDA", "META", "AVGO", "CRM", "ADBE", "ORCL",
                "JNJ", "UNH", "PFE", "ABBV", "MRK", "LLY", "JPM", "BAC", "WFC", "GS", "MS",
                "XOM", "CVX", "COP", "WMT", "PG", "KO", "PEP", "COST", "HD", "MCD", "NKE",
            ]),
        );
        groups.insert(
            "sp400".into(),
            group(&[
                "WSM", "RS", "CSL", "EME", "GGG", "LII", "MANH", "RPM", "TOL", "WSO",
            ]),
        );
        groups.insert(
            "sp600".into(),
            group(&[
                "AEIS", "ANF", "BCC", "CALM", "FN", "IBP", "MLI", "SPSC", "SM", "WDFC",
            ]),
        );

        Self { groups }
    }
}

impl UniverseResolver for Universe {
    fn resolve(&self, _run_date: NaiveDate) -> Result<EntityUniverse, DataError> {
        Ok(EntityUniverse::new(self.groups.iter().flat_map(
            |(group, tickers)| {
                tickers.iter().map(move |t| UniverseMember {
                    symbol: t.clone(),
                    source: group.clone(),
                })
            },
        )))
    }
}

/// Caches another resolver's output as `{root}/{run_date}/_universe.csv`.
pub struct CachedUniverseResolver<R> {
    inner: R,
    root: PathBuf,
    use_cache: bool,
}

impl<R: UniverseResolver> CachedUniverseResolver<R> {
    pub fn new(inner: R, root: impl Into<PathBuf>, use_cache: bool) -> Self {
        Self {
            inner,
            root: root.into(),
            use_cache,
        }
    }

    fn cache_path(&self, run_date: NaiveDate) -> PathBuf {
        self.root
            .join(run_date.format("%Y-%m-%d").to_string())
            .join(UNIVERSE_FILE)
    }

    fn read_cached(path: &Path) -> Result<EntityUniverse, DataError> {
        let mut reader = csv::Reader::from_path(path)
            .map_err(|e| DataError::CacheError(format!("open {}: {e}", path.display())))?;
        let members = reader
            .deserialize::<UniverseMember>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DataError::CacheError(format!("read {}: {e}", path.display())))?;
        Ok(EntityUniverse::new(members))
    }

    fn write_cached(path: &Path, universe: &EntityUniverse) -> Result<(), DataError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;
        }
        let tmp_path = path.with_extension("csv.tmp");
        let mut writer = csv::Writer::from_path(&tmp_path)
            .map_err(|e| DataError::CacheError(format!("create {}: {e}", tmp_path.display())))?;
        for member in universe.members() {
            writer
                .serialize(member)
                .map_err(|e| DataError::CacheError(format!("write universe: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| DataError::CacheError(format!("flush universe: {e}")))?;
        drop(writer);
        fs::rename(&tmp_path, path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })
    }
}

impl<R: UniverseResolver> UniverseResolver for CachedUniverseResolver<R> {
    fn resolve(&self, run_date: NaiveDate) -> Result<EntityUniverse, DataError> {
        let path = self.cache_path(run_date);
        if self.use_cache && path.is_file() {
            debug!(path = %path.display(), "using cached universe");
            return Self::read_cached(&path);
        }

        let universe = self.inner.resolve(run_date)?;
        Self::write_cached(&path, &universe)?;
        info!(symbols = universe.len(), %run_date, "universe resolved");
        Ok(universe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    static TEST_COUNTER: AtomicU64 = AtomicU64::new(0);

    fn temp_dir() -> PathBuf {
        let id = TEST_COUNTER.fetch_add(1, Ordering::Relaxed);
        let dir =
            std::env::temp_dir().join(format!("earnlab_universe_{}_{id}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    #[test]
    fn default_universe_has_groups() {
        let u = Universe::default_us();
        assert_eq!(u.group_names(), vec!["sp400", "sp500", "sp600"]);
        assert!(u.ticker_count() > 40);
        assert!(u.group_tickers("sp500").unwrap().contains(&"COST".to_string()));
    }

    #[test]
    fn toml_roundtrip() {
        let u = Universe::default_us();
        let parsed = Universe::from_toml(&u.to_toml().unwrap()).unwrap();
        assert_eq!(u.ticker_count(), parsed.ticker_count());
    }

    #[test]
    fn resolution_sorts_and_dedups() {
        let u = Universe::from_toml(
            r#"
            [groups]
            sp500 = ["MSFT", "AAPL"]
            sp400 = ["aapl", "WSM", " "]
            "#,
        )
        .unwrap();
        let resolved = u.resolve(run_date()).unwrap();
        assert_eq!(resolved.symbols(), vec!["AAPL", "MSFT", "WSM"]);
        // BTreeMap iterates sp400 before sp500
        assert_eq!(resolved.members()[0].source, "sp400");
    }

    struct CountingResolver {
        calls: AtomicUsize,
    }

    impl UniverseResolver for CountingResolver {
        fn resolve(&self, _run_date: NaiveDate) -> Result<EntityUniverse, DataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(EntityUniverse::from_symbols(&["KO", "PEP"], "test"))
        }
    }

    #[test]
    fn cached_resolver_reuses_run_date_file() {
        let dir = temp_dir();
        let resolver = CachedUniverseResolver::new(
            CountingResolver {
                calls: AtomicUsize::new(0),
            },
            &dir,
            true,
        );

        let first = resolver.resolve(run_date()).unwrap();
        let second = resolver.resolve(run_date()).unwrap();

        assert_eq!(first, second);
        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 1);
        assert!(dir.join("2024-06-03").join(UNIVERSE_FILE).is_file());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn cache_disabled_always_resolves() {
        let dir = temp_dir();
        let resolver = CachedUniverseResolver::new(
            CountingResolver {
                calls: AtomicUsize::new(0),
            },
            &dir,
            false,
        );
        resolver.resolve(run_date()).unwrap();
        resolver.resolve(run_date()).unwrap();
        assert_eq!(resolver.inner.calls.load(Ordering::SeqCst), 2);

        let _ = fs::remove_dir_all(&dir);
    }
}
