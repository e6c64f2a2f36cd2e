use std::collections::BTreeMap;

use strum::{Display, EnumString};

use crate::types::{ConfigError, SeriesError};

/// Width of a time bin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum Granularity {
    #[strum(serialize = "s", serialize = "sec", serialize = "second")]
    Second,
    #[strum(serialize = "m", serialize = "min", serialize = "minute")]
    Minute,
    #[strum(serialize = "h", serialize = "hour")]
    Hour,
}

impl Granularity {
    pub fn bin_width_secs(self) -> i64 {
        match self {
            Granularity::Second => 1,
            Granularity::Minute => 60,
            Granularity::Hour => 3600,
        }
    }
}

/// Binning parameters shared by every series of a run.
#[derive(Debug, Clone, Copy)]
pub struct SeriesParams {
    pub granularity: Granularity,
    pub max_span_hours: u32,
}

impl SeriesParams {
    pub fn resolve(bucket: &str, max_span_hours: u32) -> Result<Self, ConfigError> {
        let granularity = bucket
            .parse::<Granularity>()
            .map_err(|_| ConfigError::InvalidBucket(bucket.to_string()))?;
        Ok(Self {
            granularity,
            max_span_hours,
        })
    }

    pub fn bin_width_secs(&self) -> i64 {
        self.granularity.bin_width_secs()
    }

    /// Index of the last bin every output series is padded out to, so that
    /// campaigns of different lengths stay comparable.
    pub fn max_bin(&self) -> i64 {
        i64::from(self.max_span_hours) * 3600 / self.bin_width_secs()
    }
}

/// Maps an observation timestamp onto its bin relative to the campaign
/// start. Plain floor division: an observation predating the start lands in
/// a negative bin rather than being rejected; callers decide what negative
/// bins mean.
pub fn bin_of(observed_at: i64, start_time: i64, bin_width_secs: i64) -> i64 {
    (observed_at - start_time).div_euclid(bin_width_secs)
}

/// The cumulative series an analysis can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SeriesKind {
    Entries,
    Edges,
    NovelPathsBucketed,
    NovelPathsRaw,
    Crashes,
    UniqueCrashes,
    RealPaths,
    EdgesFound,
}

/// Sparse cumulative series: bin index to the cumulative value at the end
/// of that bin. Only bins where the value changed are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesBinMap(BTreeMap<i64, u64>);

impl SeriesBinMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the cumulative value at a bin. A later write to the same bin
    /// replaces the earlier one, so feeding observations in chronological
    /// order leaves each bin holding its end-of-bin value.
    pub fn record(&mut self, bin: i64, value: u64) {
        self.0.insert(bin, value);
    }

    pub fn get(&self, bin: i64) -> Option<u64> {
        self.0.get(&bin).copied()
    }

    /// Pins the origin: a series with no bin 0 gets an explicit zero there,
    /// which is what carry-forward filling starts from.
    pub fn ensure_origin(&mut self) {
        self.0.entry(0).or_insert(0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, u64)> + '_ {
        self.0.iter().map(|(&bin, &value)| (bin, value))
    }
}

impl FromIterator<(i64, u64)> for SeriesBinMap {
    fn from_iter<T: IntoIterator<Item = (i64, u64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Collects every series of one target during a single chronological pass
/// over its entries.
#[derive(Debug, Default)]
pub struct SeriesAggregator {
    series: BTreeMap<SeriesKind, SeriesBinMap>,
}

impl SeriesAggregator {
    /// Pre-registers the series a run will produce, so a target with no
    /// qualifying entries still emits complete all-zero series.
    pub fn new(kinds: impl IntoIterator<Item = SeriesKind>) -> Self {
        Self {
            series: kinds
                .into_iter()
                .map(|kind| (kind, SeriesBinMap::new()))
                .collect(),
        }
    }

    pub fn record(&mut self, kind: SeriesKind, bin: i64, value: u64) {
        self.series.entry(kind).or_default().record(bin, value);
    }

    /// Closes the pass. Every series gets its origin pinned, so downstream
    /// filling always has a bin 0 to carry forward from.
    pub fn finalize(mut self) -> BTreeMap<SeriesKind, SeriesBinMap> {
        for series in self.series.values_mut() {
            series.ensure_origin();
        }
        self.series
    }
}

/// Expands a sparse cumulative series into a dense vector over bins
/// `0..=max_bin`, carrying the last seen value across gaps. Bins outside
/// that range (including negative ones) are ignored. A missing bin 0 means
/// finalization was skipped upstream and is reported as an error rather
/// than papered over.
pub fn fill(sparse: &SeriesBinMap, max_bin: i64) -> Result<Vec<u64>, SeriesError> {
    let mut value = sparse.get(0).ok_or(SeriesError::MissingOrigin)?;
    let mut dense = Vec::with_capacity(max_bin.max(0) as usize + 1);
    for bin in 0..=max_bin {
        if let Some(v) = sparse.get(bin) {
            value = v;
        }
        dense.push(value);
    }
    Ok(dense)
}
