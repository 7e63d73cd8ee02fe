//! Count job controller
//!
//! Tracks at most one active job. Every `submit` and `cancel` bumps a
//! generation counter; a service response is only applied when the
//! generation it was requested under is still current, so a late answer for
//! a cancelled or superseded job is dropped instead of written back.

use crate::error::JobError;
use crate::service::{BackendStatus, CountService};
use crate::state::{JobSnapshot, JobState, JobTicket, is_outdated};
use chrono::Utc;
use cohort_compiler::{CompiledQuery, Fingerprint, PopulationScope};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default delay between two status requests
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Poller settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PollingConfig {
    pub interval_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No live job to poll
    Inactive,
    /// Another tick is waiting on the service, or the submission is not
    /// acknowledged yet
    Busy,
    /// The job's state after applying the service response
    Updated(JobState),
    /// The response arrived after the job was cancelled or superseded
    Discarded,
}

impl PollOutcome {
    /// Whether a poller should keep ticking
    pub fn keep_polling(&self) -> bool {
        match self {
            Self::Busy => true,
            Self::Updated(state) => state.is_active(),
            Self::Inactive | Self::Discarded => false,
        }
    }
}

#[derive(Debug)]
struct ActiveJob {
    snapshot: JobSnapshot,
    generation: u64,
    tick_in_flight: bool,
}

#[derive(Debug, Default)]
struct Inner {
    generation: u64,
    next_ticket: u64,
    current: Option<ActiveJob>,
    last_finished: Option<JobSnapshot>,
}

impl Inner {
    /// Mark the current job inert, returning it if it was still live
    fn cancel_current(&mut self) -> Option<JobSnapshot> {
        self.generation += 1;
        let job = self.current.as_mut()?;
        if job.snapshot.cancelled || job.snapshot.state.is_terminal() {
            return None;
        }
        job.snapshot.cancelled = true;
        job.tick_in_flight = false;
        log::info!("cancelled count job {}", job.snapshot.ticket);
        Some(job.snapshot.clone())
    }

    fn live_job(&mut self, generation: u64) -> Option<&mut ActiveJob> {
        if self.generation != generation {
            return None;
        }
        self.current
            .as_mut()
            .filter(|job| job.generation == generation && !job.snapshot.cancelled)
    }
}

struct Shared<S: ?Sized> {
    inner: Mutex<Inner>,
    service: Arc<S>,
}

impl<S: CountService + ?Sized> Shared<S> {
    async fn poll(&self) -> PollOutcome {
        let (generation, job_id) = {
            let mut inner = self.inner.lock();
            let generation = inner.generation;
            let Some(job) = inner.live_job(generation) else {
                return PollOutcome::Inactive;
            };
            if !job.snapshot.state.is_active() {
                return PollOutcome::Inactive;
            }
            if job.tick_in_flight {
                return PollOutcome::Busy;
            }
            let Some(job_id) = job.snapshot.job_id.clone() else {
                return PollOutcome::Busy;
            };
            job.tick_in_flight = true;
            (generation, job_id)
        };

        let response = self.service.status(&job_id).await;

        let mut inner = self.inner.lock();
        let Some(job) = inner.live_job(generation) else {
            log::warn!("discarding late status for count job {job_id}");
            return PollOutcome::Discarded;
        };
        job.tick_in_flight = false;
        let next = match response {
            Ok(BackendStatus::Pending) => JobState::Pending,
            Ok(BackendStatus::Finished { count }) => JobState::Finished { count },
            Ok(BackendStatus::Failed { reason }) => JobState::Failed { reason },
            Err(err) => {
                log::warn!("count job {job_id} status request failed: {err}");
                JobState::Error {
                    message: err.to_string(),
                }
            }
        };
        if next != job.snapshot.state {
            log::info!(
                "count job {} {} -> {}",
                job.snapshot.ticket,
                job.snapshot.state.name(),
                next.name()
            );
        }
        job.snapshot.state = next.clone();
        if next.is_terminal() {
            job.snapshot.finished_at = Some(Utc::now());
        }
        if matches!(next, JobState::Finished { .. }) {
            let finished = job.snapshot.clone();
            inner.last_finished = Some(finished);
        }
        PollOutcome::Updated(next)
    }
}

/// Drives count jobs through their lifecycle
///
/// `poll` is the host-callable "poll now" capability. With a polling
/// configuration set, `submit` also starts a tokio interval task that calls
/// it until the job settles.
pub struct CountJobController<S: ?Sized> {
    shared: Arc<Shared<S>>,
    polling: Option<PollingConfig>,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl<S: CountService + ?Sized + 'static> CountJobController<S> {
    /// Controller without automatic polling
    pub fn new(service: Arc<S>) -> Self {
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner::default()),
                service,
            }),
            polling: None,
            poller: Mutex::new(None),
        }
    }

    /// Start a poller on every submission
    pub fn with_polling(mut self, config: PollingConfig) -> Self {
        self.polling = Some(config);
        self
    }

    pub fn service(&self) -> &Arc<S> {
        &self.shared.service
    }

    /// Submit `query` for counting, cancelling any previous job
    ///
    /// Transport failures are recorded as the job's `Error` state rather than
    /// returned. Fails with `Superseded` when the job was cancelled or
    /// replaced while the service was acknowledging it.
    pub async fn submit(
        &self,
        query: &CompiledQuery,
        scope: &PopulationScope,
    ) -> Result<JobTicket, JobError> {
        self.stop_poller();
        let (ticket, generation, previous) = {
            let mut inner = self.shared.inner.lock();
            let previous = inner.cancel_current().and_then(|job| job.job_id);
            inner.next_ticket += 1;
            let ticket = JobTicket::new(inner.next_ticket);
            let generation = inner.generation;
            inner.current = Some(ActiveJob {
                snapshot: JobSnapshot {
                    ticket,
                    job_id: None,
                    state: JobState::New,
                    fingerprint: query.fingerprint,
                    submitted_at: Utc::now(),
                    finished_at: None,
                    cancelled: false,
                },
                generation,
                tick_in_flight: false,
            });
            (ticket, generation, previous)
        };

        if let Some(previous) = previous
            && let Err(err) = self.shared.service.abort(&previous).await
        {
            log::warn!("could not abort superseded count job {previous}: {err}");
        }

        let response = self.shared.service.submit(query, scope).await;

        {
            let mut inner = self.shared.inner.lock();
            let Some(job) = inner.live_job(generation) else {
                log::warn!("discarding submission response for superseded count job {ticket}");
                return Err(JobError::Superseded { ticket });
            };
            match response {
                Ok(job_id) => {
                    log::info!(
                        "submitted count job {ticket} as {job_id} for query {}",
                        query.fingerprint.short()
                    );
                    job.snapshot.job_id = Some(job_id);
                }
                Err(err) => {
                    log::warn!("count job {ticket} submission failed: {err}");
                    job.snapshot.state = JobState::Error {
                        message: err.to_string(),
                    };
                    job.snapshot.finished_at = Some(Utc::now());
                    return Ok(ticket);
                }
            }
        }

        if let Some(config) = self.polling {
            self.spawn_poller(config.interval());
        }
        Ok(ticket)
    }

    /// Request the current job's status once
    pub async fn poll(&self) -> PollOutcome {
        self.shared.poll().await
    }

    /// Poll the current job every `period` until it settles
    ///
    /// Replaces any running poller. Must be called inside a tokio runtime.
    pub fn spawn_poller(&self, period: Duration) {
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !shared.poll().await.keep_polling() {
                    break;
                }
            }
        });
        if let Some(previous) = self.poller.lock().replace(handle) {
            previous.abort();
        }
    }

    /// Stop polling the current job; any response still on its way is dropped
    ///
    /// Returns whether a live job was cancelled. The service is not asked to
    /// abort; see [`CountJobController::abort`].
    pub fn cancel(&self) -> bool {
        self.stop_poller();
        let cancelled = self.shared.inner.lock().cancel_current();
        cancelled.is_some()
    }

    /// Cancel the current job and ask the service to stop computing it
    pub async fn abort(&self) -> Result<(), JobError> {
        self.stop_poller();
        let cancelled = self.shared.inner.lock().cancel_current();
        match cancelled.and_then(|job| job.job_id) {
            Some(job_id) => Ok(self.shared.service.abort(&job_id).await?),
            None => Err(JobError::NoActiveJob),
        }
    }

    /// The most recent job, live or not
    pub fn current(&self) -> Option<JobSnapshot> {
        self.shared
            .inner
            .lock()
            .current
            .as_ref()
            .map(|job| job.snapshot.clone())
    }

    /// State of the most recent job, `Uninitiated` before the first submit
    pub fn state(&self) -> JobState {
        self.current().map(|job| job.state).unwrap_or_default()
    }

    /// Last job that reached `Finished`, kept across later submissions
    pub fn last_finished(&self) -> Option<JobSnapshot> {
        self.shared.inner.lock().last_finished.clone()
    }

    /// Fingerprint of the job still being computed, if any
    pub fn in_flight_fingerprint(&self) -> Option<Fingerprint> {
        self.current()
            .filter(JobSnapshot::is_live)
            .map(|job| job.fingerprint)
    }

    pub fn is_outdated(&self, current: &Fingerprint) -> bool {
        is_outdated(current, self.shared.inner.lock().last_finished.as_ref())
    }

    fn stop_poller(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }
}

impl<S: ?Sized> Drop for CountJobController<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.poller.get_mut().take() {
            handle.abort();
        }
    }
}
