use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use bevy::tasks::{AsyncComputeTaskPool, Task};
use bevy_tasks::futures_lite::future;
use crossbeam_channel::{Receiver, Sender, bounded};
use uuid::Uuid;

use super::jobs::{JobKind, JobOutcome, run_job};
use super::session::{JobRequest, Ticket};
use super::FormState;
use crate::eia::DataSource;
use crate::llm::Analyst;

/// Finished jobs that can sit in the channel before the frame loop drains it.
const REPLY_CAPACITY: usize = 16;

/// The clients a job runs against.
#[derive(Clone)]
pub struct JobContext {
    pub source: Arc<dyn DataSource>,
    pub analyst: Arc<dyn Analyst>,
}

pub struct JobReply {
    pub id: Uuid,
    pub ticket: Ticket,
    pub kind: JobKind,
    pub outcome: JobOutcome,
}

#[derive(Resource)]
pub struct JobWorker {
    pending_jobs: Arc<Mutex<Vec<(Uuid, JobRequest)>>>,
    max_concurrent: usize,
    active_tasks: Arc<Mutex<usize>>,
    context: JobContext,
    tx: Sender<JobReply>,
    rx: Receiver<JobReply>,
}

impl JobWorker {
    pub fn new(max_workers: usize, context: JobContext) -> Self {
        let (tx, rx) = bounded(REPLY_CAPACITY);
        JobWorker {
            pending_jobs: Arc::new(Mutex::new(Vec::new())),
            max_concurrent: max_workers,
            active_tasks: Arc::new(Mutex::new(0)),
            context,
            tx,
            rx,
        }
    }

    /// Swaps the clients for jobs queued from now on, e.g. after credentials
    /// were entered.
    pub fn set_context(&mut self, context: JobContext) {
        self.context = context;
    }

    pub fn queue(&self, request: JobRequest) {
        let id = Uuid::new_v4();
        info!("Queued job {id}: {:?}", request.job.kind());
        if let Ok(mut pending) = self.pending_jobs.lock() {
            pending.push((id, request));
        }
    }

    /// Spawns pending jobs while there is room.
    pub fn spawn_pending(&self) -> Vec<Task<()>> {
        let task_pool = AsyncComputeTaskPool::get();
        let mut tasks = Vec::new();

        loop {
            let Ok(mut active) = self.active_tasks.lock() else {
                break;
            };
            if *active >= self.max_concurrent {
                break;
            }
            let next = match self.pending_jobs.lock() {
                Ok(mut pending) if !pending.is_empty() => pending.remove(0),
                _ => break,
            };
            *active += 1;
            drop(active);

            let (id, request) = next;
            let context = self.context.clone();
            let active_tasks = self.active_tasks.clone();
            let tx = self.tx.clone();
            tasks.push(task_pool.spawn(async move {
                let kind = request.job.kind();
                debug!("Job {id} running");
                let outcome = run_job(request.job, context.source.as_ref(), context.analyst.as_ref());
                let reply = JobReply {
                    id,
                    ticket: request.ticket,
                    kind,
                    outcome,
                };
                if tx.send(reply).is_err() {
                    warn!("Job {id} finished after the form went away");
                }

                if let Ok(mut active) = active_tasks.lock() {
                    *active -= 1;
                }
            }));
        }
        tasks
    }

    pub fn drain(&self) -> Vec<JobReply> {
        self.rx.try_iter().collect()
    }
}

pub fn process_jobs(mut commands: Commands, worker: Res<JobWorker>) {
    for task in worker.spawn_pending() {
        commands.spawn(TaskComponent(task));
    }
}

pub fn collect_outcomes(worker: Res<JobWorker>, mut form: ResMut<FormState>) {
    for reply in worker.drain() {
        if form.session.apply(reply.ticket, reply.kind, reply.outcome) {
            info!("Job {} applied", reply.id);
        }
    }
}

#[derive(Component)]
pub struct TaskComponent(Task<()>);

pub fn cleanup_tasks(mut commands: Commands, mut tasks: Query<(Entity, &mut TaskComponent)>) {
    for (entity, mut task) in tasks.iter_mut() {
        if future::block_on(future::poll_once(&mut task.0)).is_some() {
            commands.entity(entity).despawn();
        }
    }
}
