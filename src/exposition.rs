// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Prometheus text rendering of a measurement set.

use std::collections::{BTreeMap, btree_map::Entry};

use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};
use tracing::debug;

use crate::{
    catalog::{MetricCatalog, MetricKey},
    error::Error,
    projector::Measurement,
};

/// Renders `measurements` in the Prometheus text exposition format.
///
/// A fresh registry is built for every call, so series from a previous cycle
/// never leak into the next one. Only descriptors with at least one
/// measurement are registered. Measurements sharing a metric and label set
/// collapse onto one series and the last value wins. A measurement with an
/// unknown key or a label set that does not fit its descriptor is skipped.
///
/// # Errors
///
/// Returns [`Error::Exposition`] when the registry rejects a descriptor or
/// encoding fails.
///
/// # Examples
///
/// ```
/// use github_exporter::{MetricCatalog, Snapshot, project, render_text};
///
/// let catalog = MetricCatalog::new();
/// let snapshot = Snapshot::default();
/// let text = render_text(&catalog, project(&snapshot, &catalog,),).expect("rendered",);
/// assert!(text.contains("github_rate_limit 0"));
/// assert!(text.contains("github_rate_remaining 0"));
/// ```
pub fn render_text<I,>(catalog: &MetricCatalog, measurements: I,) -> Result<String, Error,>
where
    I: IntoIterator<Item = Measurement,>,
{
    let registry = Registry::new();
    let mut families: BTreeMap<MetricKey, GaugeVec,> = BTreeMap::new();

    for measurement in measurements {
        let Some(descriptor,) = catalog.get(measurement.key,) else {
            debug!("Skipping {}: no descriptor", measurement.name);
            continue;
        };
        if measurement.labels.len() != descriptor.labels().len() {
            debug!(
                "Skipping {}: expected {} labels, got {}",
                measurement.name,
                descriptor.labels().len(),
                measurement.labels.len()
            );
            continue;
        }

        let gauge = match families.entry(measurement.key,) {
            Entry::Occupied(entry,) => entry.into_mut(),
            Entry::Vacant(entry,) => {
                let gauge = GaugeVec::new(
                    Opts::new(descriptor.name(), descriptor.help(),),
                    descriptor.labels(),
                )?;
                registry.register(Box::new(gauge.clone(),),)?;
                entry.insert(gauge,)
            }
        };

        let labels: Vec<&str,> = measurement.labels.iter().map(String::as_str,).collect();
        match gauge.get_metric_with_label_values(&labels,) {
            Ok(series,) => series.set(measurement.value,),
            Err(error,) => debug!("Skipping {}: {}", measurement.name, error),
        }
    }

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer,)?;
    String::from_utf8(buffer,).map_err(|error| Error::service(format!("exposition is not UTF-8: {error}"),),)
}
