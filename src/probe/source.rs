/*!
 * Observation Source
 * Polymorphic seam between the engine and its event producers
 *
 * Both the Linux instrumentation and the in-memory simulation produce the
 * same [`AvcEvent`](super::AvcEvent) shape through the same bounded channel;
 * downstream code never branches on which one is behind the trait.
 */

use super::hooks::AttachReport;
use super::types::ProbeResult;
use crate::core::types::Pid;

pub trait ObservationSource: Send {
    /// Attach every hook in the catalog, skipping individual failures, and
    /// seed the kernel-side process filter with `target_pids`. Events start
    /// flowing into the channel supplied at construction as soon as this
    /// returns. Callers must check [`AttachReport::ensure_viable`] before
    /// entering MONITORING.
    fn attach(&mut self, target_pids: &[Pid]) -> ProbeResult<AttachReport>;

    /// Extend the process filter with newly discovered PIDs. The filter only
    /// grows during a session.
    fn add_target_pids(&self, pids: &[Pid]) -> ProbeResult<()>;

    /// Events lost to ring-buffer overruns or the bounded channel being full.
    fn dropped_events(&self) -> u64;

    /// Stop producing events and release kernel resources. Events already
    /// queued in the channel remain readable for the drain.
    fn detach(&mut self);
}
