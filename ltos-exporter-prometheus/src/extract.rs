//! Mapping of one LTOS status document to observations.
//!
//! Device identity is resolved first and is all-or-nothing: without a
//! hostname there is no `host` label, so nothing else is emitted. Every other
//! field group is optional and independent. A group that is missing, mistyped
//! or fails to sub-parse is skipped whole (no defaults, no partial values)
//! and reported in [`Extraction::skipped`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::FixedOffset;
use ltos_common::{Node, StatusDocument};
use tracing::{debug, trace};

use crate::catalog::{MetricCatalog, MetricDesc};
use crate::config::ExtractionConfig;
use crate::error::ScrapeError;
use crate::mapping::{Labels, Observation, labels};
use crate::parse::{parse_cpu_load, parse_event_timestamp, parse_memory};

/// Slot type of CPU modules.
pub const SLOT_TYPE_CPU: &str = "cpu";
/// Slot type of clock (receiver) modules.
pub const SLOT_TYPE_CLOCK: &str = "clk";

/// Identity of the polled device, resolved once per scrape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub hostname: String,
    pub model: String,
    pub serial_number: String,
    pub firmware_version: String,
    pub api_version: String,
}

impl DeviceIdentity {
    /// Resolve the five required identity fields.
    pub fn resolve(root: &Node<'_>) -> Result<Self, ScrapeError> {
        let info = root.get("system-information")?;

        Ok(Self {
            hostname: info.str_at(&["hostname"])?.to_string(),
            model: info.str_at(&["model"])?.to_string(),
            serial_number: info.str_at(&["serial-number"])?.to_string(),
            firmware_version: info.str_at(&["version"])?.to_string(),
            api_version: root.str_at(&["data", "rest-api", "api-version"])?.to_string(),
        })
    }
}

/// Result of extracting a document whose identity resolved.
#[derive(Debug)]
pub struct Extraction {
    pub identity: DeviceIdentity,
    pub observations: Vec<Observation>,
    /// Optional groups that were skipped, in document order.
    pub skipped: Vec<ScrapeError>,
}

/// Accumulates group results for one scrape.
struct GroupSink {
    observations: Vec<Observation>,
    skipped: Vec<ScrapeError>,
}

impl GroupSink {
    fn group(&mut self, group: &'static str, result: Result<Vec<Observation>, ScrapeError>) {
        match result {
            Ok(observations) => self.observations.extend(observations),
            Err(e) => self.skip(group, e),
        }
    }

    /// Like [`group`](Self::group), but drops a result whose label set was
    /// already emitted by an earlier entry of the same list.
    fn group_once(
        &mut self,
        group: &'static str,
        seen: &mut HashSet<Labels>,
        result: Result<Vec<Observation>, ScrapeError>,
    ) {
        if let Ok([first, ..]) = result.as_deref() {
            if !seen.insert(first.labels.clone()) {
                debug!(group, labels = ?first.labels, "Skipping duplicate series");
                return;
            }
        }
        self.group(group, result);
    }

    fn skip(&mut self, group: &'static str, error: ScrapeError) {
        debug!(
            group,
            kind = error.kind(),
            path = error.path().unwrap_or_default(),
            error = %error,
            "Skipping metric group"
        );
        self.skipped.push(error);
    }
}

/// Stateless status document extractor.
///
/// Holds only immutable settings, so one instance serves all scrapes and
/// repeated extraction of the same document yields identical output.
#[derive(Debug, Clone)]
pub struct Extractor {
    catalog: Arc<MetricCatalog>,
    event_offset: FixedOffset,
    clock_id_label: bool,
}

impl Extractor {
    /// Create an extractor over a shared catalog.
    pub fn new(catalog: Arc<MetricCatalog>, config: &ExtractionConfig) -> Self {
        Self {
            catalog,
            event_offset: config.event_offset(),
            clock_id_label: config.clock_id_label,
        }
    }

    pub fn catalog(&self) -> &MetricCatalog {
        &self.catalog
    }

    /// Extract all observations from a document.
    ///
    /// Fails only when the device identity cannot be resolved.
    pub fn extract(&self, document: &StatusDocument) -> Result<Extraction, ScrapeError> {
        let root = document.root();
        let identity = DeviceIdentity::resolve(&root)?;
        let host = identity.hostname.as_str();

        let mut sink = GroupSink {
            observations: vec![self.build_info(&identity), self.system_info(&identity)],
            skipped: Vec::new(),
        };

        sink.group("uptime", self.uptime(&root, host));
        sink.group("cpuload", self.cpu_load(&root, host));
        sink.group("memory", self.memory(&root, host));

        match optional_list(&root, &["data", "system"], "storage") {
            Ok(volumes) => {
                let mut seen = HashSet::new();
                for volume in volumes {
                    sink.group_once("storage", &mut seen, self.storage_volume(&volume, host));
                }
            }
            Err(e) => sink.skip("storage", e),
        }

        sink.group("clock_status", self.clock_status(&root, host));

        match optional_list(&root, &["data", "notification"], "events") {
            Ok(events) => {
                let mut seen = HashSet::new();
                for event in events {
                    sink.group_once("event", &mut seen, self.event(&event, host));
                }
            }
            Err(e) => sink.skip("event", e),
        }

        match optional_list(&root, &["data", "chassis0"], "slots") {
            Ok(slots) => {
                for slot in slots {
                    self.slot(&slot, host, &mut sink);
                }
            }
            Err(e) => sink.skip("slot", e),
        }

        trace!(
            host,
            observations = sink.observations.len(),
            skipped = sink.skipped.len(),
            "Extracted status document"
        );

        Ok(Extraction {
            identity,
            observations: sink.observations,
            skipped: sink.skipped,
        })
    }

    fn build_info(&self, identity: &DeviceIdentity) -> Observation {
        self.catalog.build_info.observe(
            labels([
                ("api_version", identity.api_version.as_str()),
                ("firmware_version", identity.firmware_version.as_str()),
                ("host", identity.hostname.as_str()),
            ]),
            1.0,
        )
    }

    fn system_info(&self, identity: &DeviceIdentity) -> Observation {
        self.catalog.system_info.observe(
            labels([
                ("model", identity.model.as_str()),
                ("serial_number", identity.serial_number.as_str()),
                ("host", identity.hostname.as_str()),
            ]),
            1.0,
        )
    }

    fn uptime(&self, root: &Node<'_>, host: &str) -> Result<Vec<Observation>, ScrapeError> {
        let uptime = root.f64_at(&["data", "system", "uptime"])?;
        Ok(vec![
            self.catalog
                .system_uptime_seconds
                .observe(host_labels(host), uptime),
        ])
    }

    fn cpu_load(&self, root: &Node<'_>, host: &str) -> Result<Vec<Observation>, ScrapeError> {
        let node = root.at(&["data", "system", "cpuload"])?;
        let load = parse_cpu_load(node.as_str()?)
            .map_err(|source| ScrapeError::sub_parse(node.path(), source))?;

        Ok(load
            .by_period()
            .into_iter()
            .map(|(period, value)| {
                self.catalog
                    .system_cpu_load_avg
                    .observe(labels([("host", host), ("period", period)]), value)
            })
            .collect())
    }

    fn memory(&self, root: &Node<'_>, host: &str) -> Result<Vec<Observation>, ScrapeError> {
        let node = root.at(&["data", "system", "memory"])?;
        let memory = parse_memory(node.as_str()?)
            .map_err(|source| ScrapeError::sub_parse(node.path(), source))?;

        Ok(vec![
            self.catalog
                .system_memory_bytes
                .observe(host_labels(host), memory.total_bytes),
            self.catalog
                .system_memory_free_bytes
                .observe(host_labels(host), memory.free_bytes),
        ])
    }

    fn storage_volume(&self, volume: &Node<'_>, host: &str) -> Result<Vec<Observation>, ScrapeError> {
        let mountpoint = volume.str_at(&["mountpoint"])?;
        let size = volume.f64_at(&["size"])?;
        let used = volume.f64_at(&["used"])?;

        let volume_labels = labels([("host", host), ("mountpoint", mountpoint)]);
        Ok(vec![
            self.catalog
                .system_storage_size_bytes
                .observe(volume_labels.clone(), size),
            self.catalog
                .system_storage_used_bytes
                .observe(volume_labels, used),
        ])
    }

    fn clock_status(&self, root: &Node<'_>, host: &str) -> Result<Vec<Observation>, ScrapeError> {
        let system = root.at(&["data", "system"])?;
        let Some(sync_status) = system.get_opt("sync-status")? else {
            return Ok(Vec::new());
        };

        let status = sync_status.get("clock-status")?;
        Ok(vec![self.catalog.system_clock_status_info.observe(
            labels([
                ("host", host),
                ("clock", status.str_at(&["clock"])?),
                ("oscillator", status.str_at(&["oscillator"])?),
                ("antenna", status.str_at(&["antenna"])?),
            ]),
            1.0,
        )])
    }

    fn event(&self, event: &Node<'_>, host: &str) -> Result<Vec<Observation>, ScrapeError> {
        let event_type = event.str_at(&["type"])?;
        let object_id = event.str_at(&["object-id"])?;
        let triggered = event.get("last-triggered")?;

        let timestamp = parse_event_timestamp(triggered.as_str()?, self.event_offset)
            .map_err(|source| ScrapeError::sub_parse(triggered.path(), source))?;

        let Some(timestamp) = timestamp else {
            trace!(event_type, object_id, "Event never triggered");
            return Ok(Vec::new());
        };

        Ok(vec![self.catalog.event_last_triggered.observe(
            labels([
                ("host", host),
                ("type", event_type),
                ("object_id", object_id),
            ]),
            timestamp as f64,
        )])
    }

    fn slot(&self, slot: &Node<'_>, host: &str, sink: &mut GroupSink) {
        let header = slot
            .str_at(&["slot-type"])
            .and_then(|slot_type| Ok((slot_type, slot.str_at(&["slot-id"])?)));
        let (slot_type, slot_id) = match header {
            Ok(header) => header,
            Err(e) => return sink.skip("slot", e.into()),
        };

        if slot_type != SLOT_TYPE_CPU && slot_type != SLOT_TYPE_CLOCK {
            debug!(slot_id, slot_type, "Ignoring slot of unsupported type");
            return;
        }

        let module = match slot.get_opt("module") {
            Ok(Some(module)) => module,
            Ok(None) => {
                debug!(slot_id, slot_type, "Slot has no module");
                return;
            }
            Err(e) => return sink.skip("slot", e.into()),
        };

        let base = self.slot_labels(host, slot_id);
        sink.group("slot_info", self.slot_info(&module, &base, slot_type));

        if slot_type == SLOT_TYPE_CLOCK {
            sink.group("gnss_satellites", self.gnss_satellites(&module, &base));
            sink.group("gnss_position", self.gnss_position(&module, &base));
            sink.group("grc_antenna", self.grc_antenna(&module, &base));
            sink.group("grc_receiver", self.grc_receiver(&module, &base));
        }
    }

    fn slot_labels(&self, host: &str, slot_id: &str) -> Labels {
        let mut base = labels([("host", host), ("slot_id", slot_id)]);
        if self.clock_id_label {
            base.insert("clock_id".to_string(), slot_id.to_string());
        }
        base
    }

    fn slot_info(
        &self,
        module: &Node<'_>,
        base: &Labels,
        slot_type: &str,
    ) -> Result<Vec<Observation>, ScrapeError> {
        let info = module.get("info")?;
        let oscillator = match info.get_opt("oscillator-type")? {
            Some(node) => node.as_str()?,
            None => "",
        };

        let mut info_labels = base.clone();
        info_labels.extend(labels([
            ("slot_type", slot_type),
            ("model", info.str_at(&["model"])?),
            ("serial_number", info.str_at(&["serial-number"])?),
            ("software_revision", info.str_at(&["software-revision"])?),
            ("oscillator_type", oscillator),
        ]));

        Ok(vec![self.catalog.slot_info.observe(info_labels, 1.0)])
    }

    fn gnss_satellites(&self, module: &Node<'_>, base: &Labels) -> Result<Vec<Observation>, ScrapeError> {
        let satellites = module.at(&["gnss", "satellites"])?;
        self.observe_numbers(
            &satellites,
            base,
            [
                ("in-view", &self.catalog.gnss_satellites_in_view),
                ("good", &self.catalog.gnss_satellites_good),
            ],
        )
    }

    fn gnss_position(&self, module: &Node<'_>, base: &Labels) -> Result<Vec<Observation>, ScrapeError> {
        let position = module.at(&["gnss", "position"])?;
        self.observe_numbers(
            &position,
            base,
            [
                ("latitude", &self.catalog.gnss_latitude),
                ("longitude", &self.catalog.gnss_longitude),
                ("altitude", &self.catalog.gnss_altitude),
            ],
        )
    }

    fn grc_antenna(&self, module: &Node<'_>, base: &Labels) -> Result<Vec<Observation>, ScrapeError> {
        let antenna = module.at(&["grc", "antenna"])?;
        self.observe_flags(
            &antenna,
            base,
            [
                ("connected", &self.catalog.grc_antenna_connected),
                ("short-circuit", &self.catalog.grc_antenna_short_circuit),
            ],
        )
    }

    fn grc_receiver(&self, module: &Node<'_>, base: &Labels) -> Result<Vec<Observation>, ScrapeError> {
        let receiver = module.at(&["grc", "receiver"])?;
        self.observe_flags(
            &receiver,
            base,
            [
                ("synchronized", &self.catalog.grc_receiver_synchronized),
                ("tracking", &self.catalog.grc_receiver_tracking),
                ("warm-boot", &self.catalog.grc_receiver_warm_boot),
                ("cold-boot", &self.catalog.grc_receiver_cold_boot),
            ],
        )
    }

    /// Read every numeric field before emitting any, so the group is all-or-nothing.
    fn observe_numbers<const N: usize>(
        &self,
        node: &Node<'_>,
        base: &Labels,
        fields: [(&str, &MetricDesc); N],
    ) -> Result<Vec<Observation>, ScrapeError> {
        let mut values = Vec::with_capacity(N);
        for (key, desc) in fields {
            values.push((desc, node.f64_at(&[key])?));
        }
        Ok(values
            .into_iter()
            .map(|(desc, value)| desc.observe(base.clone(), value))
            .collect())
    }

    fn observe_flags<const N: usize>(
        &self,
        node: &Node<'_>,
        base: &Labels,
        fields: [(&str, &MetricDesc); N],
    ) -> Result<Vec<Observation>, ScrapeError> {
        let mut values = Vec::with_capacity(N);
        for (key, desc) in fields {
            let flag = node.bool_at(&[key])?;
            values.push((desc, if flag { 1.0 } else { 0.0 }));
        }
        Ok(values
            .into_iter()
            .map(|(desc, value)| desc.observe(base.clone(), value))
            .collect())
    }
}

fn host_labels(host: &str) -> Labels {
    labels([("host", host)])
}

/// Entries of an optional list under a required parent.
///
/// An absent list is empty; a present non-array is a type mismatch.
fn optional_list<'a>(
    root: &Node<'a>,
    parent: &[&str],
    key: &str,
) -> Result<Vec<Node<'a>>, ScrapeError> {
    match root.at(parent)?.get_opt(key)? {
        Some(list) => Ok(list.as_array()?),
        None => Ok(Vec::new()),
    }
}
