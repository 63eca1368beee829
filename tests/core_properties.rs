// tests/core_properties.rs

use std::collections::{BTreeMap, BTreeSet};

use proptest::prelude::*;

use assetflow::engine::{
    CoreCommand, CoreRuntime, RuntimeEvent, RuntimeOptions, TaskOutcome, TriggerReason,
};
use assetflow::types::BusyPolicy;

const TASKS: [&str; 3] = ["html", "css", "js"];

#[derive(Debug, Clone)]
enum Op {
    Trigger(usize),
    Finish(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..TASKS.len()).prop_map(Op::Trigger),
        (0..TASKS.len()).prop_map(Op::Finish),
    ]
}

fn policy_strategy() -> impl Strategy<Value = (BusyPolicy, usize)> {
    prop_oneof![
        Just((BusyPolicy::Coalesce, 1)),
        (1usize..4).prop_map(|n| (BusyPolicy::Queue, n)),
    ]
}

fn started(commands: &[CoreCommand], task: &str) -> usize {
    commands
        .iter()
        .filter(|c| matches!(c, CoreCommand::StartTask(t) if t == task))
        .count()
}

proptest! {
    /// Checks the core against a simple model: a task is never started
    /// while running, every pending rerun is eventually started, and pending
    /// counts stay within the policy's bound.
    #[test]
    fn core_matches_model(
        (policy, limit) in policy_strategy(),
        ops in proptest::collection::vec(op_strategy(), 1..60),
    ) {
        let mut core = CoreRuntime::new(policy, limit, RuntimeOptions::default());
        let mut running: BTreeSet<&str> = BTreeSet::new();
        let mut pending: BTreeMap<&str, usize> = BTreeMap::new();
        let bound = match policy {
            BusyPolicy::Coalesce => 1,
            BusyPolicy::Queue => limit,
        };

        for op in ops {
            match op {
                Op::Trigger(i) => {
                    let task = TASKS[i];
                    let step = core.step(RuntimeEvent::TaskTriggered {
                        task: task.to_string(),
                        reason: TriggerReason::FileWatch,
                    });
                    if running.contains(task) {
                        prop_assert_eq!(started(&step.commands, task), 0);
                        let p = pending.entry(task).or_insert(0);
                        *p = (*p + 1).min(bound);
                    } else {
                        prop_assert_eq!(started(&step.commands, task), 1);
                        running.insert(task);
                    }
                }
                Op::Finish(i) => {
                    let task = TASKS[i];
                    if !running.contains(task) {
                        continue;
                    }
                    let step = core.step(RuntimeEvent::TaskFinished {
                        task: task.to_string(),
                        outcome: TaskOutcome::Success,
                    });
                    let p = pending.entry(task).or_insert(0);
                    if *p > 0 {
                        *p -= 1;
                        prop_assert_eq!(started(&step.commands, task), 1);
                    } else {
                        prop_assert_eq!(started(&step.commands, task), 0);
                        running.remove(task);
                    }
                }
            }

            for task in TASKS {
                prop_assert_eq!(core.is_running(task), running.contains(task));
                prop_assert_eq!(core.pending_for(task), pending.get(task).copied().unwrap_or(0));
                prop_assert!(core.pending_for(task) <= bound);
            }
            prop_assert_eq!(core.is_idle(), running.is_empty());
        }
    }
}
