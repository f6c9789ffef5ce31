//! Fixed catalog of metric descriptors.
//!
//! Built once at startup from the configured prefix and shared read-only by
//! every scrape.

use crate::mapping::{Labels, MetricKind, Observation, build_metric_name, sanitize_metric_name};

/// Name, help text and type of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: String,
    pub help: &'static str,
    pub kind: MetricKind,
}

impl MetricDesc {
    fn new(prefix: &str, name: &str, help: &'static str, kind: MetricKind) -> Self {
        Self {
            name: build_metric_name(prefix, name),
            help,
            kind,
        }
    }

    /// Create a sample of this metric.
    pub fn observe(&self, labels: Labels, value: f64) -> Observation {
        Observation {
            name: self.name.clone(),
            labels,
            value,
            kind: self.kind,
        }
    }
}

/// All metric families the exporter can emit.
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    prefix: String,

    pub up: MetricDesc,
    pub build_info: MetricDesc,
    pub system_info: MetricDesc,

    pub system_uptime_seconds: MetricDesc,
    pub system_cpu_load_avg: MetricDesc,
    pub system_memory_bytes: MetricDesc,
    pub system_memory_free_bytes: MetricDesc,
    pub system_storage_size_bytes: MetricDesc,
    pub system_storage_used_bytes: MetricDesc,
    pub system_clock_status_info: MetricDesc,

    pub event_last_triggered: MetricDesc,

    pub slot_info: MetricDesc,
    pub gnss_satellites_in_view: MetricDesc,
    pub gnss_satellites_good: MetricDesc,
    pub gnss_latitude: MetricDesc,
    pub gnss_longitude: MetricDesc,
    pub gnss_altitude: MetricDesc,
    pub grc_antenna_connected: MetricDesc,
    pub grc_antenna_short_circuit: MetricDesc,
    pub grc_receiver_synchronized: MetricDesc,
    pub grc_receiver_tracking: MetricDesc,
    pub grc_receiver_warm_boot: MetricDesc,
    pub grc_receiver_cold_boot: MetricDesc,
}

impl MetricCatalog {
    /// Build the catalog. The prefix is sanitized; an empty prefix yields bare names.
    pub fn new(prefix: &str) -> Self {
        let prefix = if prefix.is_empty() {
            String::new()
        } else {
            sanitize_metric_name(prefix)
        };
        let p = prefix.as_str();

        use MetricKind::{Counter, Gauge};

        Self {
            up: MetricDesc::new(
                p,
                "up",
                "Indicates if the Meinberg LTOS device is reachable and identified (1 = up, 0 = down)",
                Gauge,
            ),
            build_info: MetricDesc::new(
                p,
                "build_info",
                "Meinberg device build information as labels (API version, firmware version, host)",
                Gauge,
            ),
            system_info: MetricDesc::new(
                p,
                "system_info",
                "Meinberg system information as labels (model, serial number, host)",
                Gauge,
            ),
            system_uptime_seconds: MetricDesc::new(
                p,
                "system_uptime_seconds",
                "System uptime in seconds",
                Counter,
            ),
            system_cpu_load_avg: MetricDesc::new(
                p,
                "system_cpu_load_avg",
                "CPU load averaged over 1, 5, and 15 minutes",
                Gauge,
            ),
            system_memory_bytes: MetricDesc::new(
                p,
                "system_memory_bytes",
                "Total memory in bytes",
                Gauge,
            ),
            system_memory_free_bytes: MetricDesc::new(
                p,
                "system_memory_free_bytes",
                "Free memory in bytes",
                Gauge,
            ),
            system_storage_size_bytes: MetricDesc::new(
                p,
                "system_storage_size_bytes",
                "Size of the storage volume in bytes",
                Gauge,
            ),
            system_storage_used_bytes: MetricDesc::new(
                p,
                "system_storage_used_bytes",
                "Used space on the storage volume in bytes",
                Gauge,
            ),
            system_clock_status_info: MetricDesc::new(
                p,
                "system_clock_status_info",
                "Clock, oscillator and antenna state reported by the system as labels",
                Gauge,
            ),
            event_last_triggered: MetricDesc::new(
                p,
                "notification_event_last_triggered_timestamp_seconds",
                "Unix time the notification event last fired",
                Counter,
            ),
            slot_info: MetricDesc::new(
                p,
                "slot_info",
                "Chassis slot module information as labels",
                Gauge,
            ),
            gnss_satellites_in_view: MetricDesc::new(
                p,
                "clock_gnss_satellites_in_view",
                "Number of GNSS satellites in view of the clock module",
                Gauge,
            ),
            gnss_satellites_good: MetricDesc::new(
                p,
                "clock_gnss_satellites_good",
                "Number of GNSS satellites with good signal",
                Gauge,
            ),
            gnss_latitude: MetricDesc::new(
                p,
                "clock_gnss_latitude_degrees",
                "GNSS receiver latitude in degrees",
                Gauge,
            ),
            gnss_longitude: MetricDesc::new(
                p,
                "clock_gnss_longitude_degrees",
                "GNSS receiver longitude in degrees",
                Gauge,
            ),
            gnss_altitude: MetricDesc::new(
                p,
                "clock_gnss_altitude_meters",
                "GNSS receiver altitude in meters",
                Gauge,
            ),
            grc_antenna_connected: MetricDesc::new(
                p,
                "clock_grc_antenna_connected",
                "GNSS antenna is connected (1 = yes, 0 = no)",
                Gauge,
            ),
            grc_antenna_short_circuit: MetricDesc::new(
                p,
                "clock_grc_antenna_short_circuit",
                "GNSS antenna short circuit detected (1 = yes, 0 = no)",
                Gauge,
            ),
            grc_receiver_synchronized: MetricDesc::new(
                p,
                "clock_grc_receiver_synchronized",
                "GNSS receiver is synchronized (1 = yes, 0 = no)",
                Gauge,
            ),
            grc_receiver_tracking: MetricDesc::new(
                p,
                "clock_grc_receiver_tracking",
                "GNSS receiver is tracking satellites (1 = yes, 0 = no)",
                Gauge,
            ),
            grc_receiver_warm_boot: MetricDesc::new(
                p,
                "clock_grc_receiver_warm_boot",
                "GNSS receiver is in warm boot mode (1 = yes, 0 = no)",
                Gauge,
            ),
            grc_receiver_cold_boot: MetricDesc::new(
                p,
                "clock_grc_receiver_cold_boot",
                "GNSS receiver is in cold boot mode (1 = yes, 0 = no)",
                Gauge,
            ),
            prefix,
        }
    }

    /// The sanitized prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// All descriptors in exposition order.
    pub fn descriptors(&self) -> [&MetricDesc; 23] {
        [
            &self.up,
            &self.build_info,
            &self.system_info,
            &self.system_uptime_seconds,
            &self.system_cpu_load_avg,
            &self.system_memory_bytes,
            &self.system_memory_free_bytes,
            &self.system_storage_size_bytes,
            &self.system_storage_used_bytes,
            &self.system_clock_status_info,
            &self.event_last_triggered,
            &self.slot_info,
            &self.gnss_satellites_in_view,
            &self.gnss_satellites_good,
            &self.gnss_latitude,
            &self.gnss_longitude,
            &self.gnss_altitude,
            &self.grc_antenna_connected,
            &self.grc_antenna_short_circuit,
            &self.grc_receiver_synchronized,
            &self.grc_receiver_tracking,
            &self.grc_receiver_warm_boot,
            &self.grc_receiver_cold_boot,
        ]
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_PREFIX)
    }
}
