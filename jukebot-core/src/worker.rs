//! Runs resolver lookups away from the controller loop.
//!
//! Lookups block on the network, so the controller hands them off as jobs and
//! gets the outcome back as an `Event::JobDone` on its own queue.

use std::thread::{self, JoinHandle};

use crossbeam_channel::{Sender, unbounded};

use crate::events::{Event, EventSender, JobOutcome};
use crate::resolver::Resolver;
use crate::track::{ChannelId, GuildId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    /// Resolve a `play` query
    Resolve,
    /// List a playlist for the `playlist` command
    InspectPlaylist,
}

#[derive(Debug, Clone)]
pub struct ResolveJob {
    pub kind: JobKind,
    pub guild: GuildId,
    /// Session epoch when the job was submitted
    pub epoch: u64,
    pub query: String,
    pub voice_channel: Option<ChannelId>,
    pub text_channel: ChannelId,
}

/// Somewhere to send resolver jobs
pub trait Dispatch: Send {
    fn submit(&self, job: ResolveJob);
}

fn run_job(resolver: &Resolver, job: ResolveJob) -> Event {
    let outcome = match job.kind {
        JobKind::Resolve => JobOutcome::Resolved(resolver.resolve(&job.query)),
        JobKind::InspectPlaylist => JobOutcome::Listed(resolver.inspect_playlist(&job.query)),
    };
    Event::JobDone {
        guild: job.guild,
        epoch: job.epoch,
        query: job.query,
        voice_channel: job.voice_channel,
        text_channel: job.text_channel,
        outcome,
    }
}

/// Single background thread working through jobs in submission order
pub struct ResolverWorker {
    jobs: Sender<ResolveJob>,
    _thread: JoinHandle<()>,
}

impl ResolverWorker {
    pub fn spawn(resolver: Resolver, events: EventSender) -> std::io::Result<Self> {
        let (jobs, job_rx) = unbounded::<ResolveJob>();
        let thread = thread::Builder::new()
            .name("jukebot-resolver".to_string())
            .spawn(move || {
                log::debug!("Resolver worker started");
                for job in job_rx.iter() {
                    log::debug!("Resolving {:?} for {}", job.query, job.guild);
                    if !events.send(run_job(&resolver, job)) {
                        break;
                    }
                }
                log::debug!("Resolver worker stopped");
            })?;

        Ok(Self {
            jobs,
            _thread: thread,
        })
    }
}

impl Dispatch for ResolverWorker {
    fn submit(&self, job: ResolveJob) {
        if self.jobs.send(job).is_err() {
            log::error!("Resolver worker is gone; job dropped");
        }
    }
}

/// Resolves on the calling thread and posts the outcome straight away.
///
/// Keeps event ordering deterministic, which the controller tests rely on.
pub struct InlineDispatch {
    resolver: Resolver,
    events: EventSender,
}

impl InlineDispatch {
    pub fn new(resolver: Resolver, events: EventSender) -> Self {
        Self { resolver, events }
    }
}

impl Dispatch for InlineDispatch {
    fn submit(&self, job: ResolveJob) {
        self.events.send(run_job(&self.resolver, job));
    }
}
