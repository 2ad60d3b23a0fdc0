use crate::error::Result;
use crate::model::{Filter, SeriesPoint, Statistics};
use crate::worker::{Intent, LoadState, Outcome, Request, Seq, Sequencer};
use tracing::{debug, warn};

/// Aggregate counters. Fetched once when the dashboard is entered.
#[derive(Default)]
pub struct StatisticsPanel {
    stats: Statistics,
    state: LoadState,
    seq: Sequencer,
}

impl StatisticsPanel {
    pub fn mount(&mut self) -> Request {
        self.state = LoadState::Loading;
        Request {
            seq: self.seq.issue(),
            intent: Intent::Statistics,
        }
    }

    pub fn apply(&mut self, seq: Seq, result: Result<Statistics>) -> bool {
        if !self.seq.accept(seq) {
            debug!(seq, "dropping stale statistics response");
            return false;
        }
        match result {
            Ok(stats) => {
                self.stats = stats;
                self.state = LoadState::Loaded { stale: false };
            }
            Err(e) => {
                warn!(error = %e, "Error fetching statistics");
                self.state = LoadState::Loaded { stale: true };
            }
        }
        true
    }

    pub fn stats(&self) -> Statistics {
        self.stats
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.seq.in_flight()
    }
}

/// Line chart data for the selected granularity.
#[derive(Default)]
pub struct SeriesPanel {
    filter: Filter,
    // Filter of the series currently shown; restored when a fetch fails
    confirmed: Filter,
    points: Vec<SeriesPoint>,
    state: LoadState,
    seq: Sequencer,
}

impl SeriesPanel {
    pub fn mount(&mut self) -> Request {
        self.request()
    }

    fn request(&mut self) -> Request {
        self.state = LoadState::Loading;
        Request {
            seq: self.seq.issue(),
            intent: Intent::LineChart(self.filter),
        }
    }

    pub fn set_filter(&mut self, filter: Filter) -> Option<Request> {
        if self.filter == filter {
            return None;
        }
        self.filter = filter;
        Some(self.request())
    }

    /// Replaces the series wholesale. Points are kept in server order.
    pub fn apply(&mut self, seq: Seq, result: Result<Vec<SeriesPoint>>) -> bool {
        if !self.seq.accept(seq) {
            debug!(seq, "dropping stale line chart response");
            return false;
        }
        match result {
            Ok(points) => {
                self.state = if points.is_empty() {
                    LoadState::Empty
                } else {
                    LoadState::Loaded { stale: false }
                };
                self.points = points;
                self.confirmed = self.filter;
            }
            Err(e) => {
                warn!(filter = %self.filter, error = %e, "Error fetching line chart data");
                self.filter = self.confirmed;
                self.state = LoadState::Loaded { stale: true };
            }
        }
        true
    }

    pub fn filter(&self) -> Filter {
        self.filter
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.seq.in_flight()
    }
}

#[derive(Default)]
pub struct Dashboard {
    pub statistics: StatisticsPanel,
    pub series: SeriesPanel,
    pub show_bar_chart: bool,
}

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mount(&mut self) -> Vec<Request> {
        vec![self.statistics.mount(), self.series.mount()]
    }

    pub fn set_filter(&mut self, filter: Filter) -> Option<Request> {
        self.series.set_filter(filter)
    }

    pub fn handle(&mut self, seq: Seq, outcome: Outcome) {
        match outcome {
            Outcome::Statistics(result) => {
                self.statistics.apply(seq, result);
            }
            Outcome::LineChart(result) => {
                self.series.apply(seq, result);
            }
            other => warn!(?other, "dashboard ignored unrelated reply"),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.statistics.is_busy() || self.series.is_busy()
    }
}
