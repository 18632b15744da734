/// Default cap on the sampler's saturation buckets.
///
/// Items seen this many times or more share the top bucket. Once every item
/// is there the sampler stops enforcing order and samples uniformly.
pub const DEFAULT_SAMPLING_LIMIT: u64 = 5;

/// Default amount a drawn item's bucket advances per draw.
pub const DEFAULT_SAMPLING_INCREMENT: u64 = 1;

/// Target mean of a rank vector. A component of size m sums to m * mean.
pub const DEFAULT_RANK_MEAN: f64 = 1.0;

/// Relative residual tolerance for the stationary solve.
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Krylov subspace size before GMRES restarts.
pub const DEFAULT_GMRES_RESTART: usize = 30;

/// Total GMRES inner iterations (across restarts) before giving up.
pub const DEFAULT_GMRES_MAX_ITERATIONS: usize = 1000;

/// Largest component re-solved with a dense LU when GMRES fails to converge.
///
/// The dense system needs m^2 floats: 2,000 nodes is ~32 MB.
pub const DIRECT_SOLVE_MAX_NODES: usize = 2_000;

/// Default design request: items drawn per design.
pub const DEFAULT_ITEMS_PER_DESIGN: usize = 12;

/// Default design request: items per block.
pub const DEFAULT_BLOCK_SIZE: usize = 3;

/// Default design request: minimum blocks each item appears in.
pub const DEFAULT_APPEARANCES: usize = 2;
