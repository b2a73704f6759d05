use crossterm::event::{Event as CrosstermEvent, EventStream, KeyEvent, KeyEventKind};
use futures::StreamExt;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::IntervalStream;
use tracing::warn;
use world_core::AttemptUpdate;

pub enum Event {
    Input(KeyEvent),
    Resize,
    Tick,
    /// Progress from a generation task.
    Generation(AttemptUpdate),
}

impl From<AttemptUpdate> for Event {
    fn from(update: AttemptUpdate) -> Self {
        Event::Generation(update)
    }
}

/// Merges terminal input, a steady tick and generation updates into one queue.
pub struct EventHandler {
    sender: mpsc::Sender<Event>,
    receiver: mpsc::Receiver<Event>,
    handler: JoinHandle<()>,
}

impl EventHandler {
    pub fn new(tick_rate: u64) -> Self {
        let tick_rate = Duration::from_millis(tick_rate);
        let (sender, receiver) = mpsc::channel(64);
        let handler = {
            let sender = sender.clone();
            tokio::spawn(async move {
                let mut reader = EventStream::new();
                let mut ticks = IntervalStream::new(tokio::time::interval(tick_rate));
                loop {
                    let event = tokio::select! {
                        maybe_event = reader.next() => match maybe_event {
                            Some(Ok(CrosstermEvent::Key(key))) if key.kind == KeyEventKind::Press => {
                                Event::Input(key)
                            }
                            Some(Ok(CrosstermEvent::Resize(_, _))) => Event::Resize,
                            Some(Ok(_)) => continue,
                            Some(Err(err)) => {
                                warn!(error = %err, "terminal event stream failed");
                                break;
                            }
                            None => break,
                        },
                        _ = ticks.next() => Event::Tick,
                    };
                    if sender.send(event).await.is_err() {
                        break;
                    }
                }
            })
        };
        Self {
            sender,
            receiver,
            handler,
        }
    }

    /// Handle for generation tasks to report through.
    pub fn sender(&self) -> mpsc::Sender<Event> {
        self.sender.clone()
    }

    pub async fn next(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }
}

impl Drop for EventHandler {
    fn drop(&mut self) {
        self.handler.abort();
    }
}
