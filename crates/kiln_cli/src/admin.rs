//! `kiln zero`, `kiln set-limits`, and `kiln set-sizes`.

use kiln_common::parse_size;
use kiln_stats::StatsStore;

use crate::{SetLimitsArgs, SetSizesArgs};

/// Runs the `kiln zero` command.
pub fn zero(store: &StatsStore) -> Result<i32, Box<dyn std::error::Error>> {
    store.zero()?;
    Ok(0)
}

/// Runs the `kiln set-limits` command.
///
/// Sizes accept the usual suffixes ("10G", "500M", "800K") or a bare
/// kibibyte count. Each given limit is divided across the 16 shards.
pub fn set_limits(
    store: &StatsStore,
    args: &SetLimitsArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let max_size_kib = match &args.max_size {
        Some(text) => Some(parse_size(text)?),
        None => None,
    };
    store.set_limits(args.max_files, max_size_kib)?;
    Ok(0)
}

/// Runs the `kiln set-sizes` command.
pub fn set_sizes(
    store: &StatsStore,
    args: &SetSizesArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let total_size_kib = parse_size(&args.total_size)?;
    store.set_sizes(&args.shard_dir, args.num_files, total_size_kib)?;
    Ok(0)
}
