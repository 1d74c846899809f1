//! Data behind the report charts.
//!
//! Each projection returns `None` when its inputs are missing or nothing
//! would be plotted; the caller skips that chart. Projections serialise to
//! JSON for plotting.

use claims_core::columns::ColumnSpec;
use claims_core::config::AnalysisConfig;
use claims_core::stats::{percentile, round_to, sorted};
use claims_core::table::Table;
use serde::Serialize;

use crate::aggregator::{rank_descending, ClaimAggregator};

// ── Claim amount distribution ─────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width histogram of per-claim billed amounts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AmountDistribution {
    pub bins: Vec<HistogramBin>,
}

impl AmountDistribution {
    pub const DEFAULT_BINS: usize = 50;

    /// Bins span `[min, max]`; the last bin is closed on the right. A
    /// single distinct value gets the range `value ± 0.5`.
    pub fn project(cleaned: &Table, spec: &ColumnSpec, bins: usize) -> Option<Self> {
        let billed = spec.billed(cleaned)?;
        let values: Vec<f64> = cleaned.numbers(billed)?.into_iter().flatten().collect();
        let data = sorted(&values);
        let (&first, &last) = (data.first()?, data.last()?);

        let bin_count = bins.max(1);
        let (lower, upper) = if first == last {
            (first - 0.5, last + 0.5)
        } else {
            (first, last)
        };
        let width = (upper - lower) / bin_count as f64;

        let mut counts = vec![0usize; bin_count];
        for v in &data {
            let idx = ((v - lower) / width) as usize;
            counts[idx.min(bin_count - 1)] += 1;
        }

        let bins = counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                lower: lower + width * i as f64,
                upper: if i + 1 == bin_count { upper } else { lower + width * (i + 1) as f64 },
                count,
            })
            .collect();
        Some(Self { bins })
    }
}

// ── Patient totals box plot ───────────────────────────────────────────────────

/// Box-plot statistics of total billed per patient.
///
/// Whiskers reach the most extreme totals within 1.5 IQR of the quartiles;
/// anything beyond is listed in `outliers`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatientTotalsBox {
    pub patients: usize,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub lower_whisker: f64,
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

impl PatientTotalsBox {
    pub fn project(cleaned: &Table, spec: &ColumnSpec) -> Option<Self> {
        let patient = spec.patient(cleaned)?;
        let billed = spec.billed(cleaned)?;
        let totals = ClaimAggregator::by_column(cleaned, patient, billed)?;
        let data = sorted(&totals.iter().map(|g| g.total).collect::<Vec<_>>());
        if data.is_empty() {
            return None;
        }

        let q1 = percentile(&data, 25.0);
        let q3 = percentile(&data, 75.0);
        let reach = 1.5 * (q3 - q1);
        let (low_fence, high_fence) = (q1 - reach, q3 + reach);

        let inside = |v: &&f64| **v >= low_fence && **v <= high_fence;
        let lower_whisker = data.iter().find(inside).copied().unwrap_or(q1);
        let upper_whisker = data.iter().rev().find(inside).copied().unwrap_or(q3);
        let outliers = data
            .iter()
            .copied()
            .filter(|v| *v < low_fence || *v > high_fence)
            .map(|v| round_to(v, 2))
            .collect();

        Some(Self {
            patients: data.len(),
            q1: round_to(q1, 2),
            median: round_to(percentile(&data, 50.0), 2),
            q3: round_to(q3, 2),
            lower_whisker: round_to(lower_whisker, 2),
            upper_whisker: round_to(upper_whisker, 2),
            outliers,
        })
    }
}

// ── Top categories ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBar {
    pub code: String,
    pub total_billed: f64,
}

/// Billed totals of the highest-cost diagnosis codes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopCategories {
    pub category_column: String,
    pub bars: Vec<CategoryBar>,
}

impl TopCategories {
    /// Top `n` codes by total billed, ties by ascending code.
    pub fn project(cleaned: &Table, spec: &ColumnSpec, n: usize) -> Option<Self> {
        let dx = spec.diagnosis(cleaned)?;
        let billed = spec.billed(cleaned)?;
        let groups = ClaimAggregator::ranked_by_column(cleaned, dx, billed)?;
        if groups.is_empty() {
            return None;
        }
        let bars = groups
            .into_iter()
            .take(n)
            .map(|g| CategoryBar {
                code: g.key,
                total_billed: round_to(g.total, 2),
            })
            .collect();
        Some(Self {
            category_column: dx.to_string(),
            bars,
        })
    }
}

// ── Monthly trend ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyPoint {
    /// `"%Y-%m"`.
    pub month: String,
    pub total_billed: f64,
    pub rolling_avg: f64,
}

/// Billed total per calendar month plus a trailing rolling mean.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub window: usize,
    pub points: Vec<MonthlyPoint>,
}

impl MonthlyTrend {
    /// Requires date and billed columns and at least one parsed date.
    pub fn project(cleaned: &Table, spec: &ColumnSpec, window: usize) -> Option<Self> {
        let date = spec.date(cleaned)?;
        let billed = spec.billed(cleaned)?;
        let months = ClaimAggregator::monthly(cleaned, date, billed)?;
        if months.is_empty() {
            return None;
        }

        let totals: Vec<f64> = months.iter().map(|m| m.total).collect();
        let rolling = rolling_mean(&totals, window);
        let points = months
            .into_iter()
            .zip(rolling)
            .map(|(m, avg)| MonthlyPoint {
                month: m.key,
                total_billed: round_to(m.total, 2),
                rolling_avg: round_to(avg, 2),
            })
            .collect();
        Some(Self { window, points })
    }
}

/// Trailing mean over up to `window` values ending at each position
/// (minimum one period, so early points average what is available).
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f64>() / slice.len() as f64
        })
        .collect()
}

// ── Pareto curve ──────────────────────────────────────────────────────────────

/// Cumulative cost share against cumulative patient share, patients ordered
/// by descending total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParetoCurve {
    /// `i / N` for `i` in `1..=N`.
    pub cumulative_population: Vec<f64>,
    /// Running total divided by the grand total.
    pub cumulative_cost: Vec<f64>,
    /// Reference lines, in percent of population.
    pub markers_pct: Vec<u32>,
}

impl ParetoCurve {
    /// Requires patient and billed columns and a positive grand total.
    pub fn project(cleaned: &Table, spec: &ColumnSpec, markers_pct: &[u32]) -> Option<Self> {
        let patient = spec.patient(cleaned)?;
        let billed = spec.billed(cleaned)?;
        let mut totals = ClaimAggregator::by_column(cleaned, patient, billed)?;
        rank_descending(&mut totals);

        let grand: f64 = totals.iter().map(|g| g.total).sum();
        if totals.is_empty() || grand <= 0.0 {
            return None;
        }

        let n = totals.len() as f64;
        let cumulative_population = (1..=totals.len()).map(|i| i as f64 / n).collect();
        let cumulative_cost = totals
            .iter()
            .scan(0.0, |running, g| {
                *running += g.total;
                Some(*running / grand)
            })
            .collect();

        Some(Self {
            cumulative_population,
            cumulative_cost,
            markers_pct: markers_pct.to_vec(),
        })
    }
}

// ── ChartSet ──────────────────────────────────────────────────────────────────

/// All chart projections for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSet {
    pub amount_distribution: Option<AmountDistribution>,
    pub patient_totals: Option<PatientTotalsBox>,
    pub top_dx: Option<TopCategories>,
    pub monthly_trend: Option<MonthlyTrend>,
    pub pareto: Option<ParetoCurve>,
}

impl ChartSet {
    pub fn project(cleaned: &Table, spec: &ColumnSpec, analysis: &AnalysisConfig) -> Self {
        Self {
            amount_distribution: AmountDistribution::project(
                cleaned,
                spec,
                AmountDistribution::DEFAULT_BINS,
            ),
            patient_totals: PatientTotalsBox::project(cleaned, spec),
            top_dx: TopCategories::project(cleaned, spec, analysis.top_n),
            monthly_trend: MonthlyTrend::project(cleaned, spec, analysis.rolling_months),
            pareto: ParetoCurve::project(cleaned, spec, &analysis.concentration_thresholds_pct),
        }
    }

    /// Names of the charts that were produced.
    pub fn available(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.amount_distribution.is_some() {
            names.push("claim_amount_distribution");
        }
        if self.patient_totals.is_some() {
            names.push("patient_total_boxplot");
        }
        if self.top_dx.is_some() {
            names.push("top_dx");
        }
        if self.monthly_trend.is_some() {
            names.push("monthly_trend");
        }
        if self.pareto.is_some() {
            names.push("pareto");
        }
        names
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
