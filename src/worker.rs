use std::{
    path::PathBuf,
    sync::{
        Arc,
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use log::{debug, error, info};
use tokio::sync::mpsc::{UnboundedSender, unbounded_channel};

use crate::api::VehicleDataApi;
use crate::dashboard::PendingQuery;
use crate::errors::DashboardError;
use crate::upload::{UploadFile, UploadObserver, UploadSummary, upload_file_in_chunks};
use crate::vehicle_data::VehicleDataPage;

pub type RepaintNotifier = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug)]
pub enum WorkerCommand {
    Fetch(PendingQuery),
    Upload { path: PathBuf, vehicle_id: String },
}

#[derive(Debug)]
pub enum WorkerEvent {
    Page {
        generation: u64,
        result: Result<VehicleDataPage, DashboardError>,
    },
    UploadProgress(Option<u8>),
    UploadMessage(String),
    /// The backend finalized the dataset
    UploadComplete,
    UploadFinished {
        vehicle_id: String,
        result: Result<UploadSummary, DashboardError>,
    },
}

/// Forwards upload callbacks to the UI thread.
struct ChannelObserver {
    events: Sender<WorkerEvent>,
    notify: RepaintNotifier,
}

impl ChannelObserver {
    fn send(&self, event: WorkerEvent) {
        if self.events.send(event).is_ok() {
            (self.notify)();
        }
    }
}

impl UploadObserver for ChannelObserver {
    fn on_progress(&mut self, progress: Option<u8>) {
        self.send(WorkerEvent::UploadProgress(progress));
    }

    fn on_message(&mut self, message: &str) {
        self.send(WorkerEvent::UploadMessage(message.to_string()));
    }

    fn on_complete(&mut self) {
        self.send(WorkerEvent::UploadComplete);
    }
}

/// Background thread running every backend call off the UI thread.
///
/// List queries are spawned as independent tasks and may overlap, the
/// controller drops stale responses by generation. An upload task awaits each
/// chunk before sending the next one.
pub struct NetworkWorker {
    commands: UnboundedSender<WorkerCommand>,
    events: Receiver<WorkerEvent>,
    _handle: JoinHandle<()>,
}

impl NetworkWorker {
    pub fn spawn<B>(backend: B, notify: RepaintNotifier) -> Result<Self, DashboardError>
    where
        B: VehicleDataApi + Clone + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| DashboardError::RuntimeError { source: e })?;
        let (command_tx, mut command_rx) = unbounded_channel::<WorkerCommand>();
        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>();

        let handle = thread::spawn(move || {
            runtime.block_on(async move {
                while let Some(command) = command_rx.recv().await {
                    let backend = backend.clone();
                    let events = event_tx.clone();
                    let notify = notify.clone();
                    match command {
                        WorkerCommand::Fetch(pending) => {
                            tokio::spawn(async move {
                                let result = backend.list(&pending.query).await;
                                if events
                                    .send(WorkerEvent::Page {
                                        generation: pending.generation,
                                        result,
                                    })
                                    .is_ok()
                                {
                                    notify();
                                }
                            });
                        }
                        WorkerCommand::Upload { path, vehicle_id } => {
                            tokio::spawn(async move {
                                let mut observer = ChannelObserver { events, notify };
                                let result = match UploadFile::open(&path) {
                                    Ok(file) => {
                                        upload_file_in_chunks(
                                            &backend,
                                            file,
                                            &vehicle_id,
                                            &mut observer,
                                        )
                                        .await
                                    }
                                    Err(e) => Err(e),
                                };
                                match &result {
                                    Ok(summary) => info!(
                                        "Uploaded {} as {} in {} chunks",
                                        summary.file_name, summary.vehicle_id, summary.total_chunks
                                    ),
                                    Err(e) => error!("Upload of {:?} failed: {}", path, e),
                                }
                                observer.send(WorkerEvent::UploadFinished { vehicle_id, result });
                            });
                        }
                    }
                }
                debug!("Network worker command channel closed");
            });
        });

        Ok(Self {
            commands: command_tx,
            events: event_rx,
            _handle: handle,
        })
    }

    pub fn send(&self, command: WorkerCommand) -> Result<(), DashboardError> {
        self.commands
            .send(command)
            .map_err(|_| DashboardError::WorkerUnavailable)
    }

    /// Events that arrived since the last call, without blocking.
    pub fn try_iter(&self) -> impl Iterator<Item = WorkerEvent> + '_ {
        self.events.try_iter()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<WorkerEvent>, DashboardError> {
        match self.events.recv_timeout(timeout) {
            Ok(event) => Ok(Some(event)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(DashboardError::WorkerUnavailable),
        }
    }
}
