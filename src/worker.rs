//! Background execution of fetch intents.
//!
//! Screens never call the network themselves. They hand an [`Intent`] tagged
//! with a sequence number to the [`Worker`], which runs it on a small rayon
//! pool and posts a [`Reply`] back over a channel. Replies can arrive in any
//! order; controllers use [`Sequencer`] to keep only the newest one.

use crate::api::ResourceApi;
use crate::error::Result;
use crate::model::{Filter, ProductPage, SeriesPoint, Statistics};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

pub type Seq = u64;

/// Identifies one mounted screen. A screen that is left and re-entered gets a
/// new id so late replies for the old instance are dropped.
pub type ViewId = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    Statistics,
    LineChart(Filter),
    ListProducts { page: u32, search: String },
    DeleteProduct(u64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub seq: Seq,
    pub intent: Intent,
}

#[derive(Debug)]
pub enum Outcome {
    Statistics(Result<Statistics>),
    LineChart(Result<Vec<SeriesPoint>>),
    Products(Result<ProductPage>),
    Deleted(Result<()>),
}

#[derive(Debug)]
pub struct Reply {
    pub view: ViewId,
    pub seq: Seq,
    pub outcome: Outcome,
}

/// Fetch lifecycle of a list-like view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    /// `stale` is set when the last fetch failed and older data is still shown.
    Loaded { stale: bool },
    Empty,
}

/// Monotonic request counter for one kind of request. Only the most recently
/// issued sequence number is accepted.
#[derive(Debug, Default)]
pub struct Sequencer {
    last_issued: Seq,
    in_flight: bool,
}

impl Sequencer {
    pub fn issue(&mut self) -> Seq {
        self.last_issued += 1;
        self.in_flight = true;
        self.last_issued
    }

    /// Returns true if `seq` is the newest request; accepting it marks the
    /// sequencer idle.
    pub fn accept(&mut self, seq: Seq) -> bool {
        if seq == self.last_issued && self.in_flight {
            self.in_flight = false;
            true
        } else {
            false
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight
    }
}

pub fn execute(api: &dyn ResourceApi, intent: &Intent) -> Outcome {
    match intent {
        Intent::Statistics => Outcome::Statistics(api.statistics()),
        Intent::LineChart(filter) => Outcome::LineChart(api.line_chart(*filter)),
        Intent::ListProducts { page, search } => {
            Outcome::Products(api.list_products(*page, search))
        }
        Intent::DeleteProduct(id) => Outcome::Deleted(api.delete_product(*id)),
    }
}

type Waker = Arc<dyn Fn() + Send + Sync>;

pub struct Worker {
    api: Arc<dyn ResourceApi>,
    pool: rayon::ThreadPool,
    reply_tx: Sender<Reply>,
    reply_rx: Receiver<Reply>,
    waker: Waker,
}

impl Worker {
    pub const THREADS: usize = 4;

    pub fn new(
        api: Arc<dyn ResourceApi>,
        waker: impl Fn() + Send + Sync + 'static,
    ) -> std::result::Result<Self, rayon::ThreadPoolBuildError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(Self::THREADS)
            .thread_name(|i| format!("fetch-{i}"))
            .build()?;
        let (reply_tx, reply_rx) = mpsc::channel();
        Ok(Self {
            api,
            pool,
            reply_tx,
            reply_rx,
            waker: Arc::new(waker),
        })
    }

    pub fn dispatch(&self, view: ViewId, request: Request) {
        debug!(view, seq = request.seq, intent = ?request.intent, "dispatch");
        let api = Arc::clone(&self.api);
        let tx = self.reply_tx.clone();
        let waker = Arc::clone(&self.waker);

        self.pool.spawn(move || {
            let started = Instant::now();
            let outcome = execute(api.as_ref(), &request.intent);
            debug!(
                view,
                seq = request.seq,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "request finished"
            );
            if tx
                .send(Reply {
                    view,
                    seq: request.seq,
                    outcome,
                })
                .is_err()
            {
                warn!(view, seq = request.seq, "reply dropped, UI is gone");
                return;
            }
            waker();
        });
    }

    /// Drains every reply that has arrived since the last call.
    pub fn poll(&self) -> Vec<Reply> {
        self.reply_rx.try_iter().collect()
    }
}
