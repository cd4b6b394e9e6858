//! The record of a batch run.
use std::{
    fmt::{
        self,
        Display,
        Formatter,
    },
    ops::RangeInclusive,
};

use stx_core::FunctionName;

use crate::submitter::SubmissionOutcome;

/// Failures and transaction ids listed in full by the summary before it abbreviates.
const MAX_LISTED: usize = 10;

/// One submitted operation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OperationResult {
    pub function: FunctionName,
    pub nonce: u64,
    pub outcome: SubmissionOutcome,
}

/// The operations of one cycle, in submission order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CycleResult {
    pub cycle: u32,
    pub operations: Vec<OperationResult>,
}

/// Everything submitted during a run, cycle by cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub cycles: Vec<CycleResult>,
}

impl BatchReport {
    pub fn operations(&self) -> impl Iterator<Item = (u32, &OperationResult)> {
        self.cycles
            .iter()
            .flat_map(|cycle| cycle.operations.iter().map(move |op| (cycle.cycle, op)))
    }

    #[must_use]
    pub fn attempted(&self) -> usize {
        self.cycles.iter().map(|cycle| cycle.operations.len()).sum()
    }

    #[must_use]
    pub fn accepted(&self) -> usize {
        self.operations()
            .filter(|(_, op)| op.outcome.is_accepted())
            .count()
    }

    #[must_use]
    pub fn rejected(&self) -> usize {
        self.attempted() - self.accepted()
    }

    /// The nonces consumed by the run, if any operation was attempted.
    #[must_use]
    pub fn nonce_range(&self) -> Option<RangeInclusive<u64>> {
        let mut nonces = self.operations().map(|(_, op)| op.nonce);
        let first = nonces.next()?;
        let last = nonces.last().unwrap_or(first);
        Some(first..=last)
    }
}

impl Display for BatchReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "attempted {} operations in {} cycles: {} accepted, {} rejected",
            self.attempted(),
            self.cycles.len(),
            self.accepted(),
            self.rejected(),
        )?;
        match self.nonce_range() {
            Some(range) => writeln!(f, "nonces used: {}..={}", range.start(), range.end())?,
            None => writeln!(f, "nonces used: none")?,
        }

        let failures: Vec<_> = self
            .operations()
            .filter(|(_, op)| !op.outcome.is_accepted())
            .collect();
        if !failures.is_empty() {
            writeln!(f, "failures:")?;
            for (cycle, op) in failures.iter().take(MAX_LISTED) {
                writeln!(
                    f,
                    "  cycle {} {} (nonce {}): {}",
                    cycle + 1,
                    op.function,
                    op.nonce,
                    op.outcome
                )?;
            }
            write_remainder(f, failures.len())?;
        }

        let txids: Vec<_> = self
            .operations()
            .filter_map(|(_, op)| op.outcome.txid())
            .collect();
        if !txids.is_empty() {
            writeln!(f, "transaction ids:")?;
            for txid in txids.iter().take(MAX_LISTED) {
                writeln!(f, "  0x{txid}")?;
            }
            write_remainder(f, txids.len())?;
        }
        Ok(())
    }
}

fn write_remainder(f: &mut Formatter<'_>, total: usize) -> fmt::Result {
    if total > MAX_LISTED {
        writeln!(f, "  … and {} more", total - MAX_LISTED)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use stx_core::TxId;

    use super::*;
    use crate::submitter::FailureReason;

    fn op(nonce: u64, accepted: bool) -> OperationResult {
        let outcome = if accepted {
            SubmissionOutcome::Accepted {
                txid: TxId::new([nonce as u8; 32]),
            }
        } else {
            SubmissionOutcome::Rejected(FailureReason::Transport("connection refused".into()))
        };
        OperationResult {
            function: "give".parse().unwrap(),
            nonce,
            outcome,
        }
    }

    fn report(cycles: u32, per_cycle: u64, accepted: impl Fn(u64) -> bool) -> BatchReport {
        let mut nonce = 5;
        BatchReport {
            cycles: (0..cycles)
                .map(|cycle| CycleResult {
                    cycle,
                    operations: (0..per_cycle)
                        .map(|_| {
                            nonce += 1;
                            op(nonce - 1, accepted(nonce - 1))
                        })
                        .collect(),
                })
                .collect(),
        }
    }

    #[test]
    fn counts_and_nonce_range() {
        let report = report(2, 2, |nonce| nonce != 6);
        assert_eq!(4, report.attempted());
        assert_eq!(3, report.accepted());
        assert_eq!(1, report.rejected());
        assert_eq!(Some(5..=8), report.nonce_range());
    }

    #[test]
    fn empty_report_has_no_nonce_range() {
        let report = BatchReport::default();
        assert_eq!(0, report.attempted());
        assert_eq!(None, report.nonce_range());
        assert!(report.to_string().contains("nonces used: none"));
    }

    #[test]
    fn summary_lists_failures_with_their_nonce() {
        let summary = report(2, 2, |nonce| nonce != 6).to_string();
        assert!(summary.starts_with("attempted 4 operations in 2 cycles: 3 accepted, 1 rejected"));
        assert!(summary.contains("nonces used: 5..=8"));
        assert!(summary.contains("cycle 1 give (nonce 6): rejected: Transport: connection refused"));
        assert!(!summary.contains("more"));
    }

    #[test]
    fn long_lists_are_truncated() {
        let summary = report(3, 5, |nonce| nonce % 2 == 0).to_string();
        // nonces 5..=19: 7 even accepted, 8 odd rejected
        assert!(!summary.contains("more"));

        let summary = report(5, 5, |_| true).to_string();
        assert_eq!(10, summary.matches("\n  0x").count());
        assert!(summary.contains("… and 15 more"));
    }
}
