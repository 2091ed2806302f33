//! Live capture from the bus into a log writer.
//!
//! Reception and writing are decoupled by a bounded queue so that a slow disk
//! never makes the receive loop miss bus traffic silently: when the queue is
//! full, [`Capture`] waits for [`Recorder`] to catch up instead of growing
//! memory without bound.
//!
//! ```text
//! AsyncCan -> Capture -> Queue<M, N> -> Recorder -> LogWriter
//! ```
//!
//! Signalling the stop [`Signal`] makes the capture side queue an
//! [`Event::Shutdown`] after the frames already received. The recorder writes
//! everything before it and then stops its writer, so the last file is complete
//! before anything downstream looks at it.
//!
//! When the writer fails, the recorder raises the same stop signal itself and
//! discards whatever is still queued until the shutdown arrives, so the capture
//! side is never left waiting on a full queue.

use core::fmt;

use embassy_futures::select::{select, Either};
use embassy_sync::{
    blocking_mutex::raw::RawMutex,
    channel::{Channel, Receiver, Sender},
    signal::Signal,
};
use embedded_can::Frame;
use tracing::{debug, error, info, warn};

use crate::filter::{accepts, Filter};
use crate::{Clock, LogWriter, RawFrame, Result};

mod async_can;

pub use async_can::AsyncCan;

/// What travels from [`Capture`] to [`Recorder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Frame(RawFrame),
    /// No frames follow.
    Shutdown,
}

/// The bounded queue between the two halves of the pipeline.
pub type Queue<M, const N: usize> = Channel<M, Event, N>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub received: u64,
    /// Did not pass the acceptance filters.
    pub filtered: u64,
    /// Could not be captured at all (remote frames, oversized payloads).
    pub rejected: u64,
    pub queued: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecorderStats {
    pub written: u64,
    /// Not valid NMEA 2000 frames, or still queued when the writer failed.
    pub dropped: u64,
}

pub enum CaptureError<C: AsyncCan> {
    Can(C::Error),
}

impl<C: AsyncCan> fmt::Debug for CaptureError<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Can(e) => f.debug_tuple("Can").field(e).finish(),
        }
    }
}

/// Producer half: receives, stamps and filters frames.
pub struct Capture<'ch, M: RawMutex, C: AsyncCan, K: Clock, const N: usize> {
    stop: &'ch Signal<M, ()>,
    can: C,
    clock: K,
    filters: Vec<Filter>,
    tx: Sender<'ch, M, Event, N>,
    stats: CaptureStats,
}

/// Consumer half: writes queued frames until shutdown.
pub struct Recorder<'ch, M: RawMutex, W: Clock, const N: usize> {
    stop: &'ch Signal<M, ()>,
    rx: Receiver<'ch, M, Event, N>,
    writer: LogWriter<W>,
    stats: RecorderStats,
}

/// Build both halves around `queue`. Signalling `stop` ends the pipeline.
pub fn pipeline<'ch, M, C, K, W, const N: usize>(
    queue: &'ch Queue<M, N>,
    stop: &'ch Signal<M, ()>,
    can: C,
    clock: K,
    filters: Vec<Filter>,
    writer: LogWriter<W>,
) -> (Capture<'ch, M, C, K, N>, Recorder<'ch, M, W, N>)
where
    M: RawMutex,
    C: AsyncCan,
    K: Clock,
    W: Clock,
{
    let capture = Capture::new(stop, can, clock, filters, queue.sender());
    let recorder = Recorder::new(stop, queue.receiver(), writer);

    (capture, recorder)
}

impl<'ch, M: RawMutex, C: AsyncCan, K: Clock, const N: usize> Capture<'ch, M, C, K, N> {
    pub fn new(
        stop: &'ch Signal<M, ()>,
        can: C,
        clock: K,
        filters: Vec<Filter>,
        tx: Sender<'ch, M, Event, N>,
    ) -> Self {
        Self {
            stop,
            can,
            clock,
            filters,
            tx,
            stats: CaptureStats::default(),
        }
    }

    #[must_use]
    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Capture until `stop` is signalled or the transport fails. In both
    /// cases [`Event::Shutdown`] is the last event queued.
    pub async fn run(&mut self) -> Result<CaptureStats, CaptureError<C>> {
        info!(filters = self.filters.len(), "capture started");

        let result = self.pump().await;
        self.tx.send(Event::Shutdown).await;

        match &result {
            Ok(()) => info!(
                received = self.stats.received,
                filtered = self.stats.filtered,
                rejected = self.stats.rejected,
                "capture stopped"
            ),
            Err(e) => error!(error = ?e, "CAN receive failed, capture stopped"),
        }

        result.map(|()| self.stats)
    }

    async fn pump(&mut self) -> Result<(), CaptureError<C>> {
        loop {
            let frame = match select(self.stop.wait(), self.can.receive()).await {
                Either::First(()) => return Ok(()),
                Either::Second(res) => res.map_err(CaptureError::Can)?,
            };
            self.stats.received += 1;

            if !accepts(&self.filters, frame.id()) {
                self.stats.filtered += 1;
                debug!(id = ?frame.id(), "frame filtered");
                continue;
            }

            match RawFrame::from_can_frame(&frame, self.clock.now()) {
                Ok(raw) => {
                    // waits while the queue is full
                    self.tx.send(Event::Frame(raw)).await;
                    self.stats.queued += 1;
                }
                Err(error) => {
                    self.stats.rejected += 1;
                    warn!(%error, id = ?frame.id(), "frame rejected");
                }
            }
        }
    }
}

impl<'ch, M: RawMutex, W: Clock, const N: usize> Recorder<'ch, M, W, N> {
    pub fn new(stop: &'ch Signal<M, ()>, rx: Receiver<'ch, M, Event, N>, writer: LogWriter<W>) -> Self {
        Self {
            stop,
            rx,
            writer,
            stats: RecorderStats::default(),
        }
    }

    /// Write queued frames until [`Event::Shutdown`], then stop the writer.
    ///
    /// Invalid frames are dropped with a warning. Only writer failures end
    /// the recording early: the stop signal is raised and the queue drained
    /// up to the shutdown before the error is returned.
    pub async fn run(mut self) -> Result<RecorderStats> {
        loop {
            match self.rx.receive().await {
                Event::Frame(frame) => match self.writer.log(&frame) {
                    Ok(()) => self.stats.written += 1,
                    Err(error) if !error.is_fatal() => {
                        self.stats.dropped += 1;
                        warn!(%error, "frame dropped");
                    }
                    Err(error) => {
                        error!(%error, "log writer failed, recording stopped");
                        self.stop.signal(());
                        self.drain().await;
                        return Err(error);
                    }
                },
                Event::Shutdown => {
                    self.writer.stop()?;
                    info!(
                        written = self.stats.written,
                        dropped = self.stats.dropped,
                        "recording stopped"
                    );
                    return Ok(self.stats);
                }
            }
        }
    }

    async fn drain(&mut self) {
        while let Event::Frame(_) = self.rx.receive().await {
            self.stats.dropped += 1;
        }
    }
}
