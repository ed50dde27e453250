//! Prometheus exposition of the accelerator inventory.

use prometheus::core::{Collector, Desc};
use prometheus::proto::{Metric, MetricFamily};
use prometheus::{CounterVec, Encoder, Gauge, Opts, TextEncoder};
use thiserror::Error;
use tracing::error;

use crate::hardware::collect_accelerators::{AcceleratorPoller, CollectError};
use crate::hardware::types::AcceleratorCard;

const NAMESPACE: &str = "node";
const SUBSYSTEM: &str = "accelerator";
const NAME: &str = "card_info";
const HELP: &str = "Accelerator card info including vendor, model and pci id (address)";
const LABELS: [&str; 3] = ["vendor", "model", "id"];

const SCRAPE_SUBSYSTEM: &str = "scrape";
const SCRAPE_SUCCESS_NAME: &str = "collector_success";
const SCRAPE_SUCCESS_HELP: &str = "node_exporter: Whether a collector succeeded.";
const COLLECTOR_LABEL: &str = "accelerator";

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),

    #[error("failed to convert metrics to string: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Collector that runs a fresh poll on every scrape.
///
/// Besides the card info samples, every scrape reports
/// `node_scrape_collector_success{collector="accelerator"}`, which drops to 0
/// when the PCI device directory cannot be listed.
pub struct AcceleratorCollector {
    poller: AcceleratorPoller,
    opts: Opts,
    template: CounterVec,
    scrape_opts: Opts,
    scrape_template: Gauge,
}

impl AcceleratorCollector {
    pub fn new(poller: AcceleratorPoller) -> Result<Self, MetricsError> {
        let opts = Opts::new(NAME, HELP).namespace(NAMESPACE).subsystem(SUBSYSTEM);
        let template = CounterVec::new(opts.clone(), &LABELS)?;
        let scrape_opts = Opts::new(SCRAPE_SUCCESS_NAME, SCRAPE_SUCCESS_HELP)
            .namespace(NAMESPACE)
            .subsystem(SCRAPE_SUBSYSTEM)
            .const_label("collector", COLLECTOR_LABEL);
        let scrape_template = Gauge::with_opts(scrape_opts.clone())?;
        Ok(Self {
            poller,
            opts,
            template,
            scrape_opts,
            scrape_template,
        })
    }

    /// Card info samples for one poll, without the scrape status.
    pub fn try_collect(&self) -> Result<Vec<MetricFamily>, MetricsError> {
        let cards = self.poller.poll()?;
        self.card_info(cards)
    }

    /// One sample per bus address, value 1.
    fn card_info(&self, cards: impl Iterator<Item = AcceleratorCard>) -> Result<Vec<MetricFamily>, MetricsError> {
        let mut cards = cards.peekable();
        if cards.peek().is_none() {
            return Ok(Vec::new());
        }

        let counters = CounterVec::new(self.opts.clone(), &LABELS)?;
        for card in cards {
            let counter = counters.with_label_values(&[
                card.vendor.as_str(),
                card.model.as_str(),
                card.bus_address.as_str(),
            ]);
            if counter.get() == 0.0 {
                counter.inc();
            }
        }

        let mut families = counters.collect();
        for family in &mut families {
            family.mut_metric().sort_by(|a, b| label_values(a).cmp(&label_values(b)));
        }
        Ok(families)
    }
}

fn label_values(metric: &Metric) -> Vec<&str> {
    metric.get_label().iter().map(|label| label.get_value()).collect()
}

impl Collector for AcceleratorCollector {
    fn desc(&self) -> Vec<&Desc> {
        let mut descs = self.template.desc();
        descs.extend(self.scrape_template.desc());
        descs
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let (mut families, success) = match self.try_collect() {
            Ok(families) => (families, 1.0),
            Err(err) => {
                error!(error = %err, "accelerator collector failed");
                (Vec::new(), 0.0)
            }
        };

        // One gauge per scrape, never shared between concurrent scrapes.
        match Gauge::with_opts(self.scrape_opts.clone()) {
            Ok(gauge) => {
                gauge.set(success);
                families.extend(gauge.collect());
            }
            Err(err) => error!(error = %err, "failed to build accelerator scrape status"),
        }
        families
    }
}

/// Renders the card info of one scrape in the Prometheus text format.
pub fn render(poller: &AcceleratorPoller) -> Result<String, MetricsError> {
    let collector = AcceleratorCollector::new(poller.clone())?;
    let families = collector.try_collect()?;

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
