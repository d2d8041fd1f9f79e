//! Parsers for SLURM command output.

use rustc_hash::FxHashSet;

/// First-line prefix of a successful `sbatch`.
pub const SUBMITTED_PREFIX: &str = "Submitted batch job ";

/// Line appended to every status query so a truncated reply is detectable.
pub const END_SENTINEL: &str = "END";

/// Prefix `scancel` puts in front of its error messages.
pub const CANCEL_ERROR_PREFIX: &str = "scancel: error:";

/// Parse sbatch output to extract the job id.
///
/// sbatch output format: "Submitted batch job 12345" (federated clusters
/// append " on cluster <name>"). Anything else, including id 0, is a
/// failed submission.
pub fn parse_sbatch_output(lines: &[String]) -> Option<u64> {
    let first = lines.first()?.trim();
    let rest = first.strip_prefix(SUBMITTED_PREFIX)?;
    let id = rest.split_whitespace().next()?;
    match id.parse::<u64>() {
        Ok(id) if id > 0 => Some(id),
        _ => None,
    }
}

/// Parse the id list printed by `squeue --noheader --format=%i && echo END`.
///
/// Returns `None` unless the last non-empty line is the sentinel and every
/// line before it is a job id. Array tasks (`1234_7`, `1234_[1-4]`) count
/// as their parent job.
pub fn parse_squeue_ids(lines: &[String]) -> Option<FxHashSet<u64>> {
    let mut lines = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty());

    if lines.next_back()? != END_SENTINEL {
        return None;
    }

    let mut ids = FxHashSet::default();
    for line in lines {
        let id = line.split('_').next().unwrap_or(line);
        ids.insert(id.parse::<u64>().ok()?);
    }
    Some(ids)
}

/// Whether scancel reported an error on any output line.
///
/// scancel prints nothing on success, so the absence of an error is the
/// only confirmation available.
pub fn scancel_failed<'a, I>(lines: I) -> bool
where
    I: IntoIterator<Item = &'a String>,
{
    lines
        .into_iter()
        .any(|line| line.trim_start().starts_with(CANCEL_ERROR_PREFIX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &str) -> Vec<String> {
        text.lines().map(str::to_string).collect()
    }

    #[test]
    fn test_parse_sbatch_output() {
        assert_eq!(parse_sbatch_output(&lines("Submitted batch job 4821\n")), Some(4821));
        assert_eq!(
            parse_sbatch_output(&lines("Submitted batch job 77 on cluster alpha")),
            Some(77)
        );
    }

    #[test]
    fn test_parse_sbatch_output_failure() {
        assert_eq!(
            parse_sbatch_output(&lines("sbatch: error: Batch job submission failed\n")),
            None
        );
        assert_eq!(parse_sbatch_output(&[]), None);
        assert_eq!(parse_sbatch_output(&lines("Submitted batch job abc")), None);
        assert_eq!(parse_sbatch_output(&lines("Submitted batch job 0")), None);
        // Only the first line counts.
        assert_eq!(
            parse_sbatch_output(&lines("warning: x\nSubmitted batch job 5")),
            None
        );
    }

    #[test]
    fn test_parse_squeue_ids() {
        let ids = parse_squeue_ids(&lines("4821\n4822\nEND\n")).unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&4821));
        assert!(ids.contains(&4822));

        let ids = parse_squeue_ids(&lines("END")).unwrap();
        assert!(ids.is_empty());

        let ids = parse_squeue_ids(&lines("900_3\n900_[4-8]\nEND")).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![900]);
    }

    #[test]
    fn test_parse_squeue_ids_needs_sentinel() {
        assert!(parse_squeue_ids(&[]).is_none());
        assert!(parse_squeue_ids(&lines("4821\n4822")).is_none());
        assert!(parse_squeue_ids(&lines("END\n4821")).is_none());
        assert!(parse_squeue_ids(&lines("slurm_load_jobs error\nEND")).is_none());
    }

    #[test]
    fn test_scancel_failed() {
        let ok: Vec<String> = Vec::new();
        assert!(!scancel_failed(&ok));
        let err = lines("scancel: error: Kill job error on job id 12: Invalid job id specified");
        assert!(scancel_failed(&err));
    }
}
