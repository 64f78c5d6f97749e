//! Merged crypto CSV data adapter.
//!
//! An asset's series is assembled from three files: its daily prices, its
//! daily volatility and the market-wide fear & greed index. The price file's
//! dates form the axis of the series; volatility and sentiment are aligned to
//! it and their gaps interpolated. Prices are never filled in.

use crate::domain::config_validation::parse_delimiter;
use crate::domain::error::SpreadtesterError;
use crate::domain::price_bar::{ensure_ordered, Asset, PriceBar};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::MarketDataPort;
use chrono::{NaiveDate, NaiveDateTime};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%b %d, %Y"];
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

#[derive(Debug, Clone)]
struct AssetFiles {
    prices: PathBuf,
    volatility: PathBuf,
}

pub struct CryptoCsvAdapter {
    fear_and_greed: PathBuf,
    assets: HashMap<Asset, AssetFiles>,
    volatility_delimiter: u8,
}

impl CryptoCsvAdapter {
    pub fn new(fear_and_greed: impl Into<PathBuf>) -> Self {
        Self {
            fear_and_greed: fear_and_greed.into(),
            assets: HashMap::new(),
            volatility_delimiter: b',',
        }
    }

    pub fn with_asset(
        mut self,
        asset: Asset,
        prices: impl Into<PathBuf>,
        volatility: impl Into<PathBuf>,
    ) -> Self {
        self.assets.insert(
            asset,
            AssetFiles {
                prices: prices.into(),
                volatility: volatility.into(),
            },
        );
        self
    }

    pub fn with_volatility_delimiter(mut self, delimiter: u8) -> Self {
        self.volatility_delimiter = delimiter;
        self
    }

    /// Reads the `[data]` section. Relative paths are resolved against
    /// `base_dir`; assets without both files configured are left out.
    pub fn from_config(config: &dyn ConfigPort, base_dir: &Path) -> Result<Self, SpreadtesterError> {
        let fear_and_greed = config.get_non_empty("data", "fear_and_greed").ok_or_else(|| {
            SpreadtesterError::ConfigMissing {
                section: "data".to_string(),
                key: "fear_and_greed".to_string(),
            }
        })?;

        let mut adapter = Self::new(base_dir.join(fear_and_greed))
            .with_volatility_delimiter(parse_delimiter(config)?);

        for asset in Asset::ALL {
            let prefix = asset.data_prefix();
            let prices = config.get_non_empty("data", &format!("{prefix}_prices"));
            let volatility = config.get_non_empty("data", &format!("{prefix}_volatility"));
            if let (Some(prices), Some(volatility)) = (prices, volatility) {
                adapter = adapter.with_asset(asset, base_dir.join(prices), base_dir.join(volatility));
            }
        }
        Ok(adapter)
    }

    fn files(&self, asset: Asset) -> Result<&AssetFiles, SpreadtesterError> {
        self.assets
            .get(&asset)
            .ok_or_else(|| SpreadtesterError::ConfigMissing {
                section: "data".to_string(),
                key: format!("{}_prices", asset.data_prefix()),
            })
    }
}

impl MarketDataPort for CryptoCsvAdapter {
    fn load_series(&self, asset: Asset) -> Result<Vec<PriceBar>, SpreadtesterError> {
        let files = self.files(asset)?;
        let prices = Source::read(&files.prices, b',')?;
        let volatility = Source::read(&files.volatility, self.volatility_delimiter)?;
        let fear_and_greed = Source::read(&self.fear_and_greed, b',')?;

        let bars = merge(&prices, &volatility, &fear_and_greed)?;
        ensure_ordered(&bars, asset.code())?;
        if bars.is_empty() {
            return Err(SpreadtesterError::NoData {
                asset: asset.to_string(),
            });
        }
        debug!(
            "loaded {} {} bars from {} to {}",
            bars.len(),
            asset,
            bars[0].date,
            bars[bars.len() - 1].date
        );
        Ok(bars)
    }
}

/// One CSV file keyed by date. Cells that do not parse as numbers are absent.
struct Source {
    name: String,
    headers: Vec<String>,
    rows: BTreeMap<NaiveDate, Vec<Option<f64>>>,
}

impl Source {
    fn read(path: &Path, delimiter: u8) -> Result<Self, SpreadtesterError> {
        let name = path.display().to_string();
        let file = File::open(path).map_err(|e| io::Error::new(e.kind(), format!("{name}: {e}")))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers: Vec<String> = reader.headers()?.iter().map(normalize_header).collect();
        let date_column = headers
            .iter()
            .position(|h| h == "date")
            .ok_or_else(|| contract(&name, "no date column"))?;

        let mut rows = BTreeMap::new();
        for (line, record) in reader.records().enumerate() {
            let record = record?;
            let raw_date = record.get(date_column).unwrap_or_default();
            if raw_date.is_empty() {
                continue;
            }
            let date = parse_date(raw_date).ok_or_else(|| {
                contract(&name, format!("unparsable date '{raw_date}' on line {}", line + 2))
            })?;
            let values = (0..headers.len())
                .map(|i| {
                    if i == date_column {
                        None
                    } else {
                        record.get(i).and_then(parse_cell)
                    }
                })
                .collect();
            if rows.insert(date, values).is_some() {
                return Err(contract(&name, format!("duplicate date {date}")));
            }
        }

        Ok(Self {
            name,
            headers,
            rows,
        })
    }

    /// Values of the first candidate column present in the file.
    fn column(&self, candidates: &[&str]) -> Result<BTreeMap<NaiveDate, f64>, SpreadtesterError> {
        let index = candidates
            .iter()
            .find_map(|c| self.headers.iter().position(|h| h == c))
            .ok_or_else(|| {
                contract(&self.name, format!("missing column {}", candidates.join(" or ")))
            })?;
        Ok(self
            .rows
            .iter()
            .filter_map(|(date, values)| values[index].map(|v| (*date, v)))
            .collect())
    }
}

fn merge(
    prices: &Source,
    volatility: &Source,
    fear_and_greed: &Source,
) -> Result<Vec<PriceBar>, SpreadtesterError> {
    let dates: Vec<NaiveDate> = prices.rows.keys().copied().collect();
    let align = |column: BTreeMap<NaiveDate, f64>| -> Vec<Option<f64>> {
        dates.iter().map(|d| column.get(d).copied()).collect()
    };

    let open = align(prices.column(&["open"])?);
    let high = align(prices.column(&["high"])?);
    let low = align(prices.column(&["low"])?);
    let close = align(prices.column(&["close", "price"])?);
    let vol = interpolate(align(volatility.column(&["volatility"])?));
    let fng = interpolate(align(
        fear_and_greed.column(&["fear_and_greed", "index", "value"])?,
    ));

    let mut bars = Vec::with_capacity(dates.len());
    let mut dropped = 0usize;
    for (i, date) in dates.iter().enumerate() {
        match (open[i], high[i], low[i], close[i]) {
            (Some(open), Some(high), Some(low), Some(close)) => bars.push(PriceBar {
                date: *date,
                open,
                high,
                low,
                close,
                volatility: vol[i].map(round2),
                fear_and_greed: fng[i],
            }),
            _ => dropped += 1,
        }
    }
    if dropped > 0 {
        warn!(
            "dropped {dropped} rows with incomplete prices in {}",
            prices.name
        );
    }
    Ok(bars)
}

/// Fills interior gaps linearly by position and carries the last known value
/// over trailing gaps. Leading gaps stay empty.
fn interpolate(mut values: Vec<Option<f64>>) -> Vec<Option<f64>> {
    let mut previous: Option<(usize, f64)> = None;
    for i in 0..values.len() {
        let Some(current) = values[i] else {
            continue;
        };
        if let Some((start, from)) = previous {
            let span = (i - start) as f64;
            for (offset, slot) in values[start + 1..i].iter_mut().enumerate() {
                let t = (offset + 1) as f64 / span;
                *slot = Some(from + (current - from) * t);
            }
        }
        previous = Some((i, current));
    }
    if let Some((last, value)) = previous {
        values[last + 1..].fill(Some(value));
    }
    values
}

fn normalize_header(raw: &str) -> String {
    raw.trim()
        .trim_start_matches('\u{feff}')
        .to_lowercase()
        .replace(' ', "_")
        .replace(['®', '"', '\''], "")
}

fn parse_cell(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if let Some(percent) = cleaned.strip_suffix('%') {
        return percent.trim().parse::<f64>().ok().map(|v| v / 100.0);
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
                .map(|dt| dt.date())
        })
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn contract(source_name: &str, reason: impl Into<String>) -> SpreadtesterError {
    SpreadtesterError::DataContract {
        source_name: source_name.to_string(),
        reason: reason.into(),
    }
}
