use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::capture::domain::frame_source::{FrameSource, SourceError};
use crate::pipeline::frame_processor::FrameProcessor;
use crate::pipeline::pipeline_executor::{PipelineExecutor, RunEnd, RunStats};
use crate::shared::frame::Frame;

type Captured = Result<Frame, SourceError>;

/// Runs capture on a dedicated thread and the detection cycle on the
/// caller's thread.
///
/// Layout: `capture → [slot of 1] → detect/annotate/deliver`
///
/// The slot holds at most one frame. When capture produces a frame while the
/// slot is still full, the stale frame is evicted and counted as dropped, so
/// the cycle always works on the newest frame and live data never queues
/// up. Threads are scoped and joined before `execute` returns.
#[derive(Default)]
pub struct ThreadedPipelineExecutor;

impl ThreadedPipelineExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl PipelineExecutor for ThreadedPipelineExecutor {
    fn execute(
        &self,
        source: &mut dyn FrameSource,
        processor: &mut FrameProcessor,
        cancelled: &AtomicBool,
    ) -> Result<RunStats, SourceError> {
        let (tx, rx) = crossbeam_channel::bounded::<Captured>(1);
        let evict = rx.clone();
        let dropped = AtomicUsize::new(0);
        let consumer_done = AtomicBool::new(false);

        let (consumed, capture_joined) = std::thread::scope(|s| {
            let handle = s.spawn(|| {
                run_capture(source, tx, evict, cancelled, &consumer_done, &dropped)
            });

            let consumed = run_consumer(&rx, processor, cancelled);
            consumer_done.store(true, Ordering::Relaxed);
            drop(rx);
            (consumed, handle.join())
        });

        let dropped = dropped.load(Ordering::Relaxed);
        processor.record_dropped(dropped);
        if dropped > 0 {
            log::debug!("Dropped {dropped} stale frames");
        }

        if capture_joined.is_err() {
            return Err(SourceError::WorkerPanicked("capture"));
        }
        let (delivered, end) = consumed?;
        let end = if cancelled.load(Ordering::Relaxed) {
            RunEnd::Stopped
        } else {
            end
        };
        Ok(RunStats {
            delivered,
            dropped,
            end,
        })
    }
}

fn run_capture(
    source: &mut dyn FrameSource,
    tx: Sender<Captured>,
    evict: Receiver<Captured>,
    cancelled: &AtomicBool,
    consumer_done: &AtomicBool,
    dropped: &AtomicUsize,
) {
    loop {
        if cancelled.load(Ordering::Relaxed) || consumer_done.load(Ordering::Relaxed) {
            return;
        }
        match source.next_frame() {
            Ok(Some(frame)) => offer(&tx, &evict, Ok(frame), dropped),
            Ok(None) => return,
            Err(e) => {
                offer(&tx, &evict, Err(e), dropped);
                return;
            }
        }
    }
}

/// Puts `item` into the slot, evicting whatever stale frame is still there.
fn offer(
    tx: &Sender<Captured>,
    evict: &Receiver<Captured>,
    mut item: Captured,
    dropped: &AtomicUsize,
) {
    loop {
        match tx.try_send(item) {
            Ok(()) => return,
            Err(TrySendError::Full(back)) => {
                if let Ok(Ok(stale)) = evict.try_recv() {
                    log::trace!("Dropping stale frame {}", stale.index());
                    dropped.fetch_add(1, Ordering::Relaxed);
                }
                item = back;
            }
            Err(TrySendError::Disconnected(_)) => return,
        }
    }
}

/// Processes frames until the capture side hangs up, a stop is requested or
/// a cycle fails.
fn run_consumer(
    rx: &Receiver<Captured>,
    processor: &mut FrameProcessor,
    cancelled: &AtomicBool,
) -> Result<(usize, RunEnd), SourceError> {
    let mut delivered = 0;
    for item in rx.iter() {
        if cancelled.load(Ordering::Relaxed) {
            return Ok((delivered, RunEnd::Stopped));
        }
        processor.process(item?)?;
        delivered += 1;
    }
    Ok((delivered, RunEnd::EndOfStream))
}
