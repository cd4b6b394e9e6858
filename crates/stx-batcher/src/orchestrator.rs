use std::time::Duration;

use tracing::{
    info,
    info_span,
    instrument,
    warn,
    Instrument as _,
};

use crate::{
    catalog::OperationPlan,
    nonce::NonceCounter,
    report::{
        BatchReport,
        CycleResult,
        OperationResult,
    },
    submitter::Submit,
};

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// Carries the results of every operation submitted before the counter ran out.
    #[error(
        "the account's nonce space is exhausted after {} submitted operations",
        .report.attempted()
    )]
    NoncesExhausted { report: BatchReport },
}

impl OrchestratorError {
    /// The results of the operations submitted before the run was aborted.
    #[must_use]
    pub fn partial_report(&self) -> &BatchReport {
        match self {
            Self::NoncesExhausted {
                report,
            } => report,
        }
    }
}

/// Drives the cycles of a run, one operation at a time.
///
/// Owns the run's nonce counter: every attempted operation consumes exactly one nonce, in
/// submission order, whether or not the node accepts it.
#[derive(Debug)]
pub struct Orchestrator {
    counter: NonceCounter,
    cycles: u32,
    delay: Duration,
}

impl Orchestrator {
    #[must_use]
    pub fn new(counter: NonceCounter, cycles: u32, delay: Duration) -> Self {
        Self {
            counter,
            cycles,
            delay,
        }
    }

    /// Submits the operations of every cycle of `plan` through `submitter`.
    ///
    /// Waits `delay` between two consecutive operations, also across cycles, but not after
    /// the last one. A rejected operation does not stop the run.
    ///
    /// # Errors
    /// Returns [`OrchestratorError::NoncesExhausted`] if the counter runs out of nonces. The
    /// error keeps the report of everything submitted up to that point.
    #[instrument(
        skip_all,
        fields(cycles = self.cycles, initial_nonce = self.counter.initial()),
        err
    )]
    pub async fn run<S, P>(
        mut self,
        submitter: &S,
        plan: &P,
    ) -> Result<BatchReport, OrchestratorError>
    where
        S: Submit + Sync,
        P: OperationPlan,
    {
        let mut report = BatchReport::default();
        let mut first = true;
        for cycle in 0..self.cycles {
            let operations = plan.operations(cycle);
            info!(cycle = cycle + 1, operations = operations.len(), "starting cycle");
            println!("--- cycle {}/{} ---", cycle + 1, self.cycles);

            let mut results = CycleResult {
                cycle,
                operations: Vec::with_capacity(operations.len()),
            };
            for operation in operations {
                if !first && !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                first = false;

                let Some(nonce) = self.counter.next() else {
                    if !results.operations.is_empty() {
                        report.cycles.push(results);
                    }
                    return Err(OrchestratorError::NoncesExhausted {
                        report,
                    });
                };
                let span = info_span!(
                    "operation",
                    cycle = cycle + 1,
                    function = %operation.function,
                    nonce,
                );
                let outcome = submitter
                    .submit(&operation, nonce)
                    .instrument(span.clone())
                    .await;
                span.in_scope(|| {
                    if outcome.is_accepted() {
                        info!(%outcome, "operation submitted");
                    } else {
                        warn!(%outcome, "operation failed; continuing with the next one");
                    }
                });
                println!("  {} (nonce {nonce}): {outcome}", operation.function);

                results.operations.push(OperationResult {
                    function: operation.function,
                    nonce,
                    outcome,
                });
            }
            report.cycles.push(results);
        }
        info!(
            attempted = report.attempted(),
            accepted = report.accepted(),
            rejected = report.rejected(),
            nonces_issued = self.counter.issued(),
            "batch complete",
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use stx_core::TxId;

    use super::*;
    use crate::{
        catalog::OperationSpec,
        submitter::{
            FailureReason,
            SubmissionOutcome,
        },
    };

    /// Records every call and rejects the functions it is told to.
    #[derive(Default)]
    struct RecordingSubmitter {
        reject: Vec<&'static str>,
        calls: Mutex<Vec<(String, u64, tokio::time::Instant)>>,
    }

    impl RecordingSubmitter {
        fn rejecting(reject: Vec<&'static str>) -> Self {
            Self {
                reject,
                ..Self::default()
            }
        }

        fn calls(&self) -> Vec<(String, u64)> {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .map(|(function, nonce, _)| (function.clone(), *nonce))
                .collect()
        }

        fn nonces(&self) -> Vec<u64> {
            self.calls().into_iter().map(|(_, nonce)| nonce).collect()
        }
    }

    #[async_trait]
    impl Submit for RecordingSubmitter {
        async fn submit(&self, operation: &OperationSpec, nonce: u64) -> SubmissionOutcome {
            let function = operation.function.to_string();
            let rejected = self.reject.contains(&function.as_str());
            self.calls
                .lock()
                .unwrap()
                .push((function, nonce, tokio::time::Instant::now()));
            if rejected {
                SubmissionOutcome::Rejected(FailureReason::Transport("unreachable".into()))
            } else {
                SubmissionOutcome::Accepted {
                    txid: TxId::new([nonce as u8; 32]),
                }
            }
        }
    }

    fn plan(functions: &[&str]) -> Vec<OperationSpec> {
        functions
            .iter()
            .map(|function| OperationSpec::new(function, vec![]).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn give_take_for_two_cycles_uses_nonces_five_to_eight() {
        let submitter = RecordingSubmitter::default();
        let report = Orchestrator::new(NonceCounter::starting_at(5), 2, Duration::ZERO)
            .run(&submitter, &plan(&["give", "take"]))
            .await
            .unwrap();

        assert_eq!(vec![5, 6, 7, 8], submitter.nonces());
        assert_eq!(
            vec!["give", "take", "give", "take"],
            submitter
                .calls()
                .into_iter()
                .map(|(function, _)| function)
                .collect::<Vec<_>>()
        );
        assert_eq!(4, report.attempted());
        assert_eq!(2, report.cycles.len());
        assert_eq!(Some(5..=8), report.nonce_range());
    }

    #[tokio::test]
    async fn rejections_do_not_stop_the_run_or_reuse_nonces() {
        let submitter = RecordingSubmitter::rejecting(vec!["take"]);
        let report = Orchestrator::new(NonceCounter::starting_at(100), 3, Duration::ZERO)
            .run(&submitter, &plan(&["give", "take", "unequip"]))
            .await
            .unwrap();

        assert_eq!((100..109).collect::<Vec<_>>(), submitter.nonces());
        assert_eq!(9, report.attempted());
        assert_eq!(3, report.rejected());
        assert_eq!(6, report.accepted());
    }

    #[tokio::test(start_paused = true)]
    async fn delay_separates_operations_but_does_not_trail_the_last() {
        let submitter = RecordingSubmitter::default();
        let start = tokio::time::Instant::now();
        Orchestrator::new(NonceCounter::starting_at(0), 2, Duration::from_millis(1_000))
            .run(&submitter, &plan(&["give", "take"]))
            .await
            .unwrap();
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(3_000), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(4_000), "{elapsed:?}");

        let instants: Vec<_> = submitter
            .calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, at)| *at)
            .collect();
        for pair in instants.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(1_000));
        }
    }

    #[tokio::test]
    async fn exhausted_nonce_space_is_fatal() {
        let submitter = RecordingSubmitter::default();
        let err = Orchestrator::new(NonceCounter::starting_at(u64::MAX), 2, Duration::ZERO)
            .run(&submitter, &plan(&["give"]))
            .await
            .unwrap_err();
        assert_eq!(vec![u64::MAX], submitter.nonces());

        let report = err.partial_report();
        assert_eq!(1, report.attempted());
        assert_eq!(Some(u64::MAX..=u64::MAX), report.nonce_range());
        assert_eq!(
            Some(TxId::new([u64::MAX as u8; 32])),
            report.operations().next().and_then(|(_, op)| op.outcome.txid())
        );
    }

    #[tokio::test]
    async fn zero_cycles_submit_nothing() {
        let submitter = RecordingSubmitter::default();
        let report = Orchestrator::new(NonceCounter::starting_at(3), 0, Duration::ZERO)
            .run(&submitter, &plan(&["give"]))
            .await
            .unwrap();
        assert_eq!(0, report.attempted());
        assert!(submitter.nonces().is_empty());
    }
}
