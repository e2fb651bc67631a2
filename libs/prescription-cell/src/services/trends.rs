// libs/prescription-cell/src/services/trends.rs
//! Pure aggregation behind the prescription-trends endpoint. Rows are
//! bucketed by week or month, each bucket is labelled against its
//! predecessor, and a summary block is derived from the series.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use crate::models::{TrendDirection, TrendPeriod, TrendPoint, TrendRow, TrendSummary};

/// Bucket key for a prescription date: `YYYY-WW` for weekly (Monday-first
/// week of year), `YYYY-MM` for monthly.
pub fn bucket_key(date: NaiveDate, period: TrendPeriod) -> String {
    match period {
        TrendPeriod::Weekly => date.format("%Y-%W").to_string(),
        TrendPeriod::Monthly => date.format("%Y-%m").to_string(),
    }
}

/// Aggregates prescription rows into an ordered trend series with
/// per-bucket direction labels.
pub fn aggregate(rows: &[TrendRow], period: TrendPeriod) -> Vec<TrendPoint> {
    let mut buckets: BTreeMap<String, Vec<&TrendRow>> = BTreeMap::new();
    for row in rows {
        buckets
            .entry(bucket_key(row.date_issued, period))
            .or_default()
            .push(row);
    }

    let mut points: Vec<TrendPoint> = buckets
        .into_iter()
        .map(|(key, rows)| {
            let unique_drugs: BTreeSet<i64> = rows.iter().map(|r| r.drug_id).collect();
            let unique_doctors: BTreeSet<i64> = rows.iter().map(|r| r.doctor_id).collect();
            let drug_names: BTreeSet<&str> = rows
                .iter()
                .filter_map(|r| r.drug.as_ref().map(|d| d.name.as_str()))
                .collect();

            let mut prescription_drugs = 0;
            let mut over_the_counter_drugs = 0;
            for row in &rows {
                match row.drug.as_ref().and_then(|d| d.rx_otc.as_deref()) {
                    Some("Rx") | Some("RX") => prescription_drugs += 1,
                    Some("OTC") | Some("Otc") => over_the_counter_drugs += 1,
                    _ => {}
                }
            }

            TrendPoint {
                period: key,
                total_prescriptions: rows.len(),
                unique_drugs: unique_drugs.len(),
                unique_doctors: unique_doctors.len(),
                drug_names: drug_names.into_iter().collect::<Vec<_>>().join(", "),
                prescription_drugs,
                over_the_counter_drugs,
                trend: TrendDirection::Stable,
            }
        })
        .collect();

    label_directions(&mut points);
    points
}

/// Labels each bucket by its percentage change against the previous one.
/// The first bucket has no predecessor and stays `stable`.
fn label_directions(points: &mut [TrendPoint]) {
    for index in 1..points.len() {
        let prev = points[index - 1].total_prescriptions as f64;
        let current = points[index].total_prescriptions as f64;
        let change_percent = (current - prev) / prev * 100.0;

        points[index].trend = if change_percent > 10.0 {
            TrendDirection::Increasing
        } else if change_percent < -10.0 {
            TrendDirection::Decreasing
        } else if change_percent.abs() <= 5.0 {
            TrendDirection::Stable
        } else if change_percent > 0.0 {
            TrendDirection::SlightlyIncreasing
        } else {
            TrendDirection::SlightlyDecreasing
        };
    }
}

pub fn summarize(points: &[TrendPoint]) -> TrendSummary {
    let totals: Vec<usize> = points.iter().map(|p| p.total_prescriptions).collect();
    let total_prescriptions: usize = totals.iter().sum();

    TrendSummary {
        total_periods: points.len(),
        total_prescriptions,
        average_per_period: if points.is_empty() {
            0.0
        } else {
            total_prescriptions as f64 / points.len() as f64
        },
        max_prescriptions: totals.iter().copied().max().unwrap_or(0),
        min_prescriptions: totals.iter().copied().min().unwrap_or(0),
    }
}
