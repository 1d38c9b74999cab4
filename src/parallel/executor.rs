//! Block wrapper built on rayon's work-stealing pool

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::arena::{NodeArena, StmtHandle};
use crate::error::{Error, Result};
use crate::factory::{Diagnostic, StmtFactory, Wrapped};
use crate::ir::Stmt;

/// Configuration for parallel wrapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Maximum number of worker threads (default: num_cpus)
    pub max_parallelism: usize,
    /// Abort on the first failing statement instead of collecting failures
    pub fail_fast: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_parallelism: num_cpus::get(),
            fail_fast: false,
        }
    }
}

/// Outcome of wrapping a block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockWrap {
    /// Wrapped statements, in input order, skipping failures
    pub stmts: Vec<Stmt>,
    /// Diagnostics keyed by input position
    pub diagnostics: Vec<(usize, Diagnostic)>,
    /// Failures keyed by input position (only without `fail_fast`)
    pub failures: Vec<(usize, Error)>,
}

impl BlockWrap {
    /// Whether every statement wrapped cleanly
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty() && self.failures.is_empty()
    }

    fn push(&mut self, index: usize, wrapped: Wrapped) {
        if let Some(diagnostic) = wrapped.diagnostic {
            self.diagnostics.push((index, diagnostic));
        }
        self.stmts.push(wrapped.stmt);
    }
}

/// Wraps `handles` with the default factory
///
/// # Returns
/// * `Ok(BlockWrap)` - Statements in input order, plus any diagnostics and
///   collected failures
/// * `Err(Error)` - With `fail_fast`, the failure at the lowest input
///   position; otherwise only when the pool could not start
pub fn wrap_block(arena: &NodeArena, handles: &[StmtHandle], config: &ParallelConfig) -> Result<BlockWrap> {
    wrap_block_with(&StmtFactory::default(), arena, handles, config)
}

/// Wraps `handles` with `factory`
pub fn wrap_block_with(
    factory: &StmtFactory,
    arena: &NodeArena,
    handles: &[StmtHandle],
    config: &ParallelConfig,
) -> Result<BlockWrap> {
    let wrap_one = |handle: &StmtHandle| factory.wrap(arena.view_stmt(*handle));

    // Small blocks are not worth a pool
    let results: Vec<Result<Wrapped>> = if handles.len() <= 1 {
        handles.iter().map(wrap_one).collect()
    } else {
        let threads = config.max_parallelism.max(1).min(handles.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()
            .map_err(|_| Error::AllocationFailure {
                resource: "wrap thread pool",
                requested: threads,
            })?;

        // Collecting into `Result<Vec<_>>` would surface whichever error a
        // worker hit first; the scan below reports them in input order
        pool.install(|| handles.par_iter().map(wrap_one).collect())
    };

    let mut block = BlockWrap::default();
    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(wrapped) => block.push(index, wrapped),
            Err(err) if config.fail_fast => return Err(err),
            Err(err) => block.failures.push((index, err)),
        }
    }
    if !block.failures.is_empty() {
        tracing::warn!(
            failed = block.failures.len(),
            total = handles.len(),
            "some statements could not be wrapped"
        );
    }
    Ok(block)
}
