//! Packing many small commands into few scheduler submissions.
//!
//! Clusters cap how many jobs one user may have queued or running. Short
//! commands are therefore grouped and each group is sent as one job whose
//! script fans the commands out over its nodes.

use std::path::PathBuf;

/// Commands one scheduler submission may carry.
///
/// When a single command already fills a node, there is nothing to pack.
/// Otherwise each node keeps one core for the dispatcher and hosts as many
/// commands as fit in the rest.
pub fn max_batch_size(task_count: u32, max_tasks_per_node: u32, max_node_count: u32) -> usize {
    let task_count = task_count.max(1);
    if task_count >= max_tasks_per_node {
        return 1;
    }
    let per_node = (max_tasks_per_node - 1) / task_count;
    (per_node as usize * max_node_count as usize).max(1)
}

/// Assign command indices to nodes round-robin.
///
/// Node `n` gets commands `n`, `n + nodes`, `n + 2 * nodes`, ... so no node
/// carries more than one command beyond any other.
pub fn round_robin(command_count: usize, nodes: usize) -> Vec<Vec<usize>> {
    let nodes = nodes.max(1);
    let mut slices = vec![Vec::new(); nodes];
    for index in 0..command_count {
        slices[index % nodes].push(index);
    }
    slices
}

/// Files a command depends on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IoManifest {
    /// Files copied to the remote side before submission.
    pub inputs: Vec<PathBuf>,

    /// Files copied back once the job finishes.
    pub outputs: Vec<PathBuf>,
}

impl IoManifest {
    /// Create an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an input file.
    pub fn input(mut self, path: impl Into<PathBuf>) -> Self {
        self.inputs.push(path.into());
        self
    }

    /// Add an output file.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.outputs.push(path.into());
        self
    }

    /// Merge `other` into this manifest, skipping paths already present.
    pub fn merge(&mut self, other: IoManifest) {
        for path in other.inputs {
            if !self.inputs.contains(&path) {
                self.inputs.push(path);
            }
        }
        for path in other.outputs {
            if !self.outputs.contains(&path) {
                self.outputs.push(path);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }
}

/// Commands that will share one scheduler submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchGroup {
    pub commands: Vec<String>,
    pub manifest: IoManifest,
}

/// Pending groups collected between two flushes.
#[derive(Debug)]
pub struct BatchAccumulator {
    max_batch_size: usize,
    groups: Vec<BatchGroup>,
}

impl BatchAccumulator {
    /// Create an accumulator that closes groups at `max_batch_size` commands.
    pub fn new(max_batch_size: usize) -> Self {
        Self {
            max_batch_size: max_batch_size.max(1),
            groups: Vec::new(),
        }
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Add a command and its files to the tail group.
    ///
    /// An empty command only attaches files to the tail group. A new group
    /// is opened once the tail is full.
    pub fn push(&mut self, command: &str, manifest: IoManifest) {
        if self.groups.is_empty() {
            self.groups.push(BatchGroup::default());
        }
        let max = self.max_batch_size;
        let Some(tail) = self.groups.last_mut() else {
            return;
        };
        if !command.trim().is_empty() {
            tail.commands.push(command.to_string());
        }
        tail.manifest.merge(manifest);
        if tail.commands.len() >= max {
            self.groups.push(BatchGroup::default());
        }
    }

    /// Take every non-empty group, leaving the accumulator empty.
    pub fn take(&mut self) -> Vec<BatchGroup> {
        std::mem::take(&mut self.groups)
            .into_iter()
            .filter(|group| !group.commands.is_empty())
            .collect()
    }

    /// Commands accumulated so far.
    pub fn pending_commands(&self) -> usize {
        self.groups.iter().map(|group| group.commands.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.pending_commands() == 0
    }
}
