//! Job scheduler
//!
//! A single actor task owns the pending queue and the in-flight map. It
//! reacts to three inputs:
//! - commands from [`Scheduler`] handles (enqueue, abort, snapshot, shutdown)
//! - [`WorkerMessage`]s from running executions
//! - a periodic admission tick that starts at most one pending job
//!
//! Each admitted job runs as its own tokio task and is cancelled by aborting
//! that task.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::{Duration, Instant};
use streamload_common::{EnqueuedJob, IngestError, JobStatus, Status};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::adapter::RecordAdapter;
use super::pipeline::IngestionPipeline;
use super::status::{StatusTracker, StatusUpdate};
use super::storage::{DataStore, StorageError};
use super::types::{Job, WorkerMessage};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Scheduler is not running")]
    Stopped,
}

/// Job-facing operations, as consumed by the HTTP layer
#[async_trait]
pub trait JobService: Send + Sync {
    /// Queue a URL for ingestion
    async fn enqueue(&self, url: String) -> Result<EnqueuedJob, SchedulerError>;

    /// Last recorded status of a job
    async fn status(&self, id: Uuid) -> Result<Option<JobStatus>, SchedulerError>;

    /// Cancel a running job and return its status afterwards.
    ///
    /// `None` means the id is unknown.
    async fn abort(&self, id: Uuid) -> Result<Option<JobStatus>, SchedulerError>;
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of jobs running at once
    pub max_workers: usize,
    /// Period of the admission tick
    pub tick_interval: Duration,
    /// Delete a job's stored records when it is aborted
    pub delete_on_abort: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_workers: 4,
            tick_interval: Duration::from_millis(1000),
            delete_on_abort: false,
        }
    }
}

/// Point-in-time view of the scheduler's queues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchedulerSnapshot {
    /// Queued job ids, oldest first
    pub pending: Vec<Uuid>,
    pub in_flight: Vec<Uuid>,
}

struct InFlightExecution {
    url: String,
    handle: JoinHandle<()>,
    started: Instant,
}

enum Command {
    Enqueue {
        job: Job,
        reply: oneshot::Sender<usize>,
    },
    Abort {
        id: Uuid,
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<SchedulerSnapshot>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

/// Handle to the scheduler actor. Cheap to clone.
pub struct Scheduler<A: RecordAdapter> {
    commands: mpsc::UnboundedSender<Command>,
    tracker: StatusTracker,
    _adapter: PhantomData<fn() -> A>,
}

impl<A: RecordAdapter> Clone for Scheduler<A> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
            tracker: self.tracker.clone(),
            _adapter: PhantomData,
        }
    }
}

impl<A: RecordAdapter> Scheduler<A> {
    /// Spawn the actor. The returned task ends after [`Scheduler::shutdown`]
    /// or once every handle is dropped.
    pub fn start(config: SchedulerConfig, pipeline: IngestionPipeline<A>) -> (Self, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let handle = Self {
            commands: commands_tx,
            tracker: pipeline.tracker().clone(),
            _adapter: PhantomData,
        };

        info!(
            max_workers = config.max_workers,
            tick_ms = config.tick_interval.as_millis() as u64,
            batch_size = pipeline.batch_size(),
            delete_on_abort = config.delete_on_abort,
            "Starting job scheduler"
        );

        let actor = SchedulerLoop {
            config,
            pipeline,
            pending: VecDeque::new(),
            in_flight: HashMap::new(),
            commands: commands_rx,
            events_tx,
            events_rx,
        };
        let task = tokio::spawn(actor.run());

        (handle, task)
    }

    fn send(&self, command: Command) -> Result<(), SchedulerError> {
        self.commands.send(command).map_err(|_| SchedulerError::Stopped)
    }

    /// Record the job as pending and append it to the queue.
    ///
    /// Returns the queue length right after the append.
    pub async fn enqueue(&self, url: impl Into<String>) -> Result<EnqueuedJob, SchedulerError> {
        let job = Job::new(url);

        if let Err(e) = self
            .tracker
            .record(job.id, StatusUpdate::new(Status::Pending).with_url(job.url.clone()))
            .await
        {
            warn!(job_id = %job.id, error = %e, "Failed to persist pending status");
        }

        let (reply, position) = oneshot::channel();
        self.send(Command::Enqueue {
            job: job.clone(),
            reply,
        })?;
        let position = position.await.map_err(|_| SchedulerError::Stopped)?;

        info!(job_id = %job.id, url = %job.url, position, "Job queued");

        Ok(EnqueuedJob {
            id: job.id,
            url: job.url,
            position,
        })
    }

    pub async fn status(&self, id: Uuid) -> Result<Option<JobStatus>, SchedulerError> {
        Ok(self.tracker.get_status(id).await?)
    }

    /// Cancel the job if it is running, then report its status.
    ///
    /// Queued jobs are left where they are and will still run. Finished or
    /// unknown jobs are untouched. The teardown runs in a task owned by the
    /// scheduler and completes even if this future is dropped.
    pub async fn abort(&self, id: Uuid) -> Result<Option<JobStatus>, SchedulerError> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Abort { id, reply })?;
        done.await.map_err(|_| SchedulerError::Stopped)?;

        self.status(id).await
    }

    pub async fn snapshot(&self) -> Result<SchedulerSnapshot, SchedulerError> {
        let (reply, snapshot) = oneshot::channel();
        self.send(Command::Snapshot { reply })?;
        snapshot.await.map_err(|_| SchedulerError::Stopped)
    }

    /// Stop admitting jobs, cancel running ones and end the actor
    pub async fn shutdown(&self) -> Result<(), SchedulerError> {
        let (reply, done) = oneshot::channel();
        self.send(Command::Shutdown { reply })?;
        done.await.map_err(|_| SchedulerError::Stopped)
    }
}

#[async_trait]
impl<A: RecordAdapter> JobService for Scheduler<A> {
    async fn enqueue(&self, url: String) -> Result<EnqueuedJob, SchedulerError> {
        Scheduler::enqueue(self, url).await
    }

    async fn status(&self, id: Uuid) -> Result<Option<JobStatus>, SchedulerError> {
        Scheduler::status(self, id).await
    }

    async fn abort(&self, id: Uuid) -> Result<Option<JobStatus>, SchedulerError> {
        Scheduler::abort(self, id).await
    }
}

/// Cancel an execution and wait for it to end, then record `Aborted` and
/// optionally purge its records.
///
/// An execution that reached a terminal status before the cancellation took
/// effect keeps that status and its records.
async fn tear_down<R: Send + 'static>(
    tracker: StatusTracker,
    data_store: Arc<dyn DataStore<R>>,
    delete_on_abort: bool,
    id: Uuid,
    execution: InFlightExecution,
) {
    execution.handle.abort();
    let ended_on_its_own = match execution.handle.await {
        Err(e) if e.is_cancelled() => {
            debug!(job_id = %id, error = %IngestError::Aborted, "Execution torn down");
            false
        }
        Err(e) => {
            warn!(job_id = %id, error = %e, "Execution failed while aborting");
            false
        }
        Ok(()) => true,
    };

    let stored = match tracker.get_status(id).await {
        Ok(stored) => stored.map(|status| status.status),
        Err(e) => {
            warn!(job_id = %id, error = %e, "Failed to read status before aborting");
            None
        }
    };
    if ended_on_its_own || stored.is_some_and(|status| status.is_terminal()) {
        info!(job_id = %id, status = ?stored, "Job ended before the abort took effect");
        return;
    }

    if let Err(e) = tracker
        .record(id, StatusUpdate::new(Status::Aborted).with_url(execution.url.clone()))
        .await
    {
        warn!(job_id = %id, error = %e, "Failed to persist aborted status");
    }

    if delete_on_abort {
        match data_store.delete_all(id).await {
            Ok(()) => info!(job_id = %id, "Deleted records of aborted job"),
            Err(e) => warn!(job_id = %id, error = %e, "Failed to delete records of aborted job"),
        }
    }

    info!(
        job_id = %id,
        url = %execution.url,
        elapsed_ms = execution.started.elapsed().as_millis() as u64,
        "Job aborted"
    );
}

struct SchedulerLoop<A: RecordAdapter> {
    config: SchedulerConfig,
    pipeline: IngestionPipeline<A>,
    pending: VecDeque<Job>,
    in_flight: HashMap<Uuid, InFlightExecution>,
    commands: mpsc::UnboundedReceiver<Command>,
    events_tx: mpsc::UnboundedSender<WorkerMessage>,
    events_rx: mpsc::UnboundedReceiver<WorkerMessage>,
}

impl<A: RecordAdapter> SchedulerLoop<A> {
    async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.on_tick(),
                Some(message) = self.events_rx.recv() => self.on_worker_message(message),
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown { reply }) => {
                        self.stop();
                        let _ = reply.send(());
                        break;
                    }
                    Some(command) => self.on_command(command),
                    None => {
                        self.stop();
                        break;
                    }
                },
            }
        }

        info!("Job scheduler stopped");
    }

    fn on_tick(&mut self) {
        if self.in_flight.len() < self.config.max_workers {
            if let Some(job) = self.pending.pop_front() {
                self.admit(job);
                return;
            }
        }

        if self.in_flight.len() >= self.config.max_workers {
            info!(
                in_flight = self.in_flight.len(),
                pending = self.pending.len(),
                "All workers busy"
            );
        } else {
            debug!(
                in_flight = self.in_flight.len(),
                pending = self.pending.len(),
                max_workers = self.config.max_workers,
                "Workers info"
            );
        }
    }

    fn admit(&mut self, job: Job) {
        info!(job_id = %job.id, url = %job.url, "Starting job");

        let pipeline = self.pipeline.clone();
        let outbox = self.events_tx.clone();
        let url = job.url.clone();
        let id = job.id;
        let handle = tokio::spawn(pipeline.execute(job, outbox));

        self.in_flight.insert(
            id,
            InFlightExecution {
                url,
                handle,
                started: Instant::now(),
            },
        );
    }

    fn on_worker_message(&mut self, message: WorkerMessage) {
        match message {
            WorkerMessage::Announce {
                id,
                url,
                announcement,
            } => {
                debug!(job_id = %id, url = %url, "{}", announcement.as_str());
            }
            WorkerMessage::Status(status) => {
                debug!(
                    job_id = %status.id,
                    status = %status.status,
                    percentage = ?status.percentage,
                    records = ?status.records,
                    "Status update"
                );
                if status.status.is_terminal() {
                    self.release(status.id);
                }
            }
            WorkerMessage::Exited { id } => self.release(id),
        }
    }

    /// Free the slot held by `id`. Unknown ids are ignored.
    fn release(&mut self, id: Uuid) {
        if let Some(execution) = self.in_flight.remove(&id) {
            info!(
                job_id = %id,
                elapsed_ms = execution.started.elapsed().as_millis() as u64,
                in_flight = self.in_flight.len(),
                "Worker slot released"
            );
        }
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Enqueue { job, reply } => {
                self.pending.push_back(job);
                let _ = reply.send(self.pending.len());
            }
            Command::Abort { id, reply } => match self.in_flight.remove(&id) {
                Some(execution) => {
                    let tracker = self.pipeline.tracker().clone();
                    let data_store = self.pipeline.data_store();
                    let delete_on_abort = self.config.delete_on_abort;
                    tokio::spawn(async move {
                        tear_down(tracker, data_store, delete_on_abort, id, execution).await;
                        let _ = reply.send(());
                    });
                }
                None => {
                    if self.pending.iter().any(|job| job.id == id) {
                        debug!(job_id = %id, "Abort requested for queued job, leaving it queued");
                    }
                    let _ = reply.send(());
                }
            },
            Command::Snapshot { reply } => {
                let _ = reply.send(SchedulerSnapshot {
                    pending: self.pending.iter().map(|job| job.id).collect(),
                    in_flight: self.in_flight.keys().copied().collect(),
                });
            }
            Command::Shutdown { reply } => {
                // Handled by the run loop
                let _ = reply.send(());
            }
        }
    }

    fn stop(&mut self) {
        info!(
            in_flight = self.in_flight.len(),
            pending = self.pending.len(),
            "Stopping job scheduler"
        );
        for (id, execution) in self.in_flight.drain() {
            debug!(job_id = %id, "Cancelling running job");
            execution.handle.abort();
        }
    }
}
