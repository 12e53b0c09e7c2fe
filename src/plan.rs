use crate::error::ReplicateError;
use crate::history;
use crate::zfs_types::{DatasetName, SnapshotName, SnapshotRecord};

/// What one dataset needs in order to converge. Planning is pure: it looks at
/// the two histories and decides, and something else carries the plan out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferPlan {
    /// The convergence snapshot is already on the target.
    NoOp,
    /// No shared history; send the whole stream up to `snapshot`.
    FullSend { snapshot: SnapshotRecord },
    /// Send the snapshots after `from`, ending at the convergence snapshot.
    /// `through` holds every step when the whole chain is wanted, otherwise
    /// just the final one.
    IncrementalChain {
        from: SnapshotRecord,
        through: Vec<SnapshotRecord>,
    },
}

impl TransferPlan {
    pub fn is_noop(&self) -> bool {
        matches!(self, TransferPlan::NoOp)
    }
}

/// Decide how to bring the target's history up to the source's.
///
/// The convergence snapshot is `requested` when given, otherwise the newest
/// source snapshot. With `send_all` the chain keeps every intermediate
/// snapshot; without it only the convergence snapshot is sent.
pub fn plan_transfer(
    dataset: &DatasetName,
    source: &[SnapshotRecord],
    target: &[SnapshotRecord],
    requested: Option<&SnapshotName>,
    send_all: bool,
) -> Result<TransferPlan, ReplicateError> {
    let goal = match requested {
        Some(name) => source.iter().rev().find(|s| &s.name == name).ok_or_else(|| {
            ReplicateError::NotFound {
                snapshot: format!("{dataset}@{name}"),
            }
        })?,
        // A source with no snapshots has nothing to send.
        None => match source.last() {
            Some(newest) => newest,
            None => return Ok(TransferPlan::NoOp),
        },
    };

    if target.iter().any(|s| s.name == goal.name) {
        return Ok(TransferPlan::NoOp);
    }

    let Some(ancestor) = history::latest_common_snapshot(source, target) else {
        return Ok(TransferPlan::FullSend {
            snapshot: goal.clone(),
        });
    };

    // The goal is absent from the target and the ancestor is present, so the
    // two are distinct; the goal must come after the ancestor to be sendable.
    let pending = history::pending_after(source, Some(&ancestor.name));
    let Some(end) = pending.iter().position(|s| s.name == goal.name) else {
        return Err(ReplicateError::TargetAhead {
            snapshot: goal.full_name(),
            ancestor: ancestor.full_name(),
        });
    };

    let chain = pending.get(..=end).unwrap_or(&[]);
    let through = if send_all {
        chain.to_vec()
    } else {
        chain.last().cloned().into_iter().collect()
    };
    Ok(TransferPlan::IncrementalChain {
        from: ancestor.clone(),
        through,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, clippy::indexing_slicing)]

    use super::*;

    fn history(dataset: &str, names: &[&str]) -> Vec<SnapshotRecord> {
        names
            .iter()
            .enumerate()
            .map(|(txg, name)| SnapshotRecord::new(dataset, *name, txg as u64 + 1))
            .collect()
    }

    fn plan(
        source: &[SnapshotRecord],
        target: &[SnapshotRecord],
        requested: Option<&str>,
        send_all: bool,
    ) -> Result<TransferPlan, ReplicateError> {
        let requested = requested.map(str::to_string);
        plan_transfer(
            &"tank/a".to_string(),
            source,
            target,
            requested.as_ref(),
            send_all,
        )
    }

    fn chain_names(plan: &TransferPlan) -> (String, Vec<String>) {
        match plan {
            TransferPlan::IncrementalChain { from, through } => (
                from.name.clone(),
                through.iter().map(|s| s.name.clone()).collect(),
            ),
            other => panic!("expected an incremental chain, got {other:?}"),
        }
    }

    #[test]
    fn identical_histories_plan_nothing() {
        let source = history("tank/a", &["s1", "s2"]);
        let target = history("back/a", &["s1", "s2"]);
        assert_eq!(plan(&source, &target, None, false).unwrap(), TransferPlan::NoOp);
    }

    #[test]
    fn empty_source_plans_nothing() {
        let target = history("back/a", &["s1"]);
        assert_eq!(plan(&[], &target, None, false).unwrap(), TransferPlan::NoOp);
    }

    #[test]
    fn empty_target_gets_a_full_send_never_a_chain() {
        let source = history("tank/a", &["s1", "s2", "s3"]);
        match plan(&source, &[], None, true).unwrap() {
            TransferPlan::FullSend { snapshot } => assert_eq!(snapshot.name, "s3"),
            other => panic!("expected a full send, got {other:?}"),
        }
    }

    #[test]
    fn disjoint_histories_get_a_full_send() {
        let source = history("tank/a", &["s1", "s2"]);
        let target = history("back/a", &["t1"]);
        match plan(&source, &target, None, false).unwrap() {
            TransferPlan::FullSend { snapshot } => assert_eq!(snapshot.name, "s2"),
            other => panic!("expected a full send, got {other:?}"),
        }
    }

    #[test]
    fn shared_ancestor_with_send_all_keeps_every_step() {
        let source = history("tank/a", &["s1", "s2", "s3"]);
        let target = history("back/a", &["s1"]);
        let plan = plan(&source, &target, None, true).unwrap();
        let (from, through) = chain_names(&plan);
        assert_eq!(from, "s1");
        assert_eq!(through, ["s2", "s3"]);
    }

    #[test]
    fn shared_ancestor_without_send_all_jumps_to_the_end() {
        let source = history("tank/a", &["s1", "s2", "s3"]);
        let target = history("back/a", &["s1"]);
        let plan = plan(&source, &target, None, false).unwrap();
        let (from, through) = chain_names(&plan);
        assert_eq!(from, "s1");
        assert_eq!(through, ["s3"]);
    }

    #[test]
    fn requested_snapshot_caps_the_chain() {
        let source = history("tank/a", &["s1", "s2", "s3", "s4"]);
        let target = history("back/a", &["s1"]);
        let plan = plan(&source, &target, Some("s3"), true).unwrap();
        let (from, through) = chain_names(&plan);
        assert_eq!(from, "s1");
        assert_eq!(through, ["s2", "s3"]);
    }

    #[test]
    fn requested_snapshot_missing_from_source_is_not_found() {
        let source = history("tank/a", &["s1"]);
        match plan(&source, &[], Some("ghost"), false) {
            Err(ReplicateError::NotFound { snapshot }) => {
                assert_eq!(snapshot, "tank/a@ghost");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn requested_snapshot_already_on_target_plans_nothing() {
        let source = history("tank/a", &["s1", "s2", "s3"]);
        let target = history("back/a", &["s1", "s2"]);
        assert_eq!(
            plan(&source, &target, Some("s2"), false).unwrap(),
            TransferPlan::NoOp
        );
    }

    #[test]
    fn requested_snapshot_behind_the_ancestor_is_refused() {
        // s1 was sent, pruned from the target, and then requested again: the
        // target's newest common snapshot s2 is already past it.
        let source = history("tank/a", &["s1", "s2", "s3"]);
        let target = history("back/a", &["s2"]);
        match plan(&source, &target, Some("s1"), false) {
            Err(ReplicateError::TargetAhead { snapshot, ancestor }) => {
                assert_eq!(snapshot, "tank/a@s1");
                assert_eq!(ancestor, "tank/a@s2");
            }
            other => panic!("expected TargetAhead, got {other:?}"),
        }
    }

    #[test]
    fn skewed_target_order_still_follows_source_order() {
        let source = history("tank/a", &["s1", "s2", "s3"]);
        // Target lists s2 newer than s3 by its own txgs; source order rules.
        let target = vec![
            SnapshotRecord::new("back/a", "s3", 50),
            SnapshotRecord::new("back/a", "s2", 60),
        ];
        assert_eq!(plan(&source, &target, None, false).unwrap(), TransferPlan::NoOp);
    }
}
