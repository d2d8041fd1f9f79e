//! Property-based tests for command packing and scheduler reply parsing.

use drover_sched::slurm::parser::parse_squeue_ids;
use drover_sched::{BatchAccumulator, IoManifest, max_batch_size, round_robin};
use proptest::prelude::*;

proptest! {
    /// Every command lands on exactly one node, in ascending order per node,
    /// and node loads differ by at most one.
    #[test]
    fn test_round_robin_is_a_balanced_partition(count in 0_usize..200, nodes in 1_usize..16) {
        let slices = round_robin(count, nodes);
        prop_assert_eq!(slices.len(), nodes);

        let mut seen: Vec<usize> = slices.iter().flatten().copied().collect();
        seen.sort_unstable();
        prop_assert_eq!(seen, (0..count).collect::<Vec<_>>());

        for slice in &slices {
            prop_assert!(slice.windows(2).all(|w| w[0] < w[1]));
        }
        let max = slices.iter().map(Vec::len).max().unwrap_or(0);
        let min = slices.iter().map(Vec::len).min().unwrap_or(0);
        prop_assert!(max - min <= 1);
    }

    /// Packing preserves command order and never exceeds the group size.
    #[test]
    fn test_accumulator_respects_group_size(count in 0_usize..100, size in 1_usize..12) {
        let mut accumulator = BatchAccumulator::new(size);
        for i in 0..count {
            accumulator.push(&format!("cmd {i}"), IoManifest::new().output(format!("o{i}")));
        }
        prop_assert_eq!(accumulator.pending_commands(), count);

        let groups = accumulator.take();
        prop_assert!(accumulator.is_empty());
        prop_assert_eq!(groups.len(), count.div_ceil(size));

        let commands: Vec<String> = groups.iter().flat_map(|g| g.commands.clone()).collect();
        let expected: Vec<String> = (0..count).map(|i| format!("cmd {i}")).collect();
        prop_assert_eq!(commands, expected);

        for group in &groups {
            prop_assert!(!group.commands.is_empty());
            prop_assert!(group.commands.len() <= size);
            prop_assert_eq!(group.manifest.outputs.len(), group.commands.len());
        }
    }

    /// A submission always carries at least one command, and a command that
    /// fills a node is never packed.
    #[test]
    fn test_max_batch_size_bounds(tasks in 0_u32..64, per_node in 1_u32..64, nodes in 0_u32..32) {
        let size = max_batch_size(tasks, per_node, nodes);
        prop_assert!(size >= 1);
        if tasks >= per_node {
            prop_assert_eq!(size, 1);
        }
    }

    /// Any id list terminated by the sentinel parses back to the same set.
    #[test]
    fn test_squeue_ids_with_sentinel(ids in prop::collection::hash_set(1_u64..1_000_000, 0..20)) {
        let mut lines: Vec<String> = ids.iter().map(u64::to_string).collect();
        lines.push("END".to_string());

        let parsed = parse_squeue_ids(&lines);
        prop_assert!(parsed.is_some());
        let parsed = parsed.unwrap_or_default();
        prop_assert_eq!(parsed.len(), ids.len());
        prop_assert!(ids.iter().all(|id| parsed.contains(id)));
    }

    /// Without the sentinel the reply is never trusted.
    #[test]
    fn test_squeue_ids_without_sentinel(ids in prop::collection::vec(1_u64..1_000_000, 0..20)) {
        let lines: Vec<String> = ids.iter().map(u64::to_string).collect();
        prop_assert!(parse_squeue_ids(&lines).is_none());
    }
}
