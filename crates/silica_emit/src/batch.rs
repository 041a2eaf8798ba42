//! Parallel conversion of independent compilations.
//!
//! One fragment's pipeline is strictly sequential, but unrelated
//! compilations share no state (each job owns its context), so a batch
//! fans out across threads.

use crate::convert::{convert, ConvertOptions};
use crate::error::EmitError;
use crate::output::ConvOutput;
use rayon::prelude::*;
use silica_ir::{Context, Fragment};

/// One independent compilation job.
pub struct ConvertJob {
    /// The compilation context owning the job's signals and specials.
    pub ctx: Context,
    /// The fragment to compile.
    pub fragment: Fragment,
    /// Conversion parameters.
    pub options: ConvertOptions,
}

/// Converts a batch of independent jobs in parallel, preserving input
/// order in the results.
pub fn convert_batch(jobs: Vec<ConvertJob>) -> Vec<Result<ConvOutput, EmitError>> {
    jobs.into_par_iter()
        .map(|mut job| convert(&mut job.ctx, job.fragment, job.options))
        .collect()
}
