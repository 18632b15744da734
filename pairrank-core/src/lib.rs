/// pairrank-core: experiment design and ranking for pairwise image judgments.
///
/// Fair item sampling → block designs with no repeated pairs → win counts →
/// Rank Centrality scores. No IO, no storage: pair history and item counts
/// come in through the `PairOracle` and `ItemStore` traits.
///
/// # Quick start
///
/// ```rust
/// use pairrank_core::{rank, generate_design, PairHistory, WinMatrix};
///
/// // Triples over 7 items, every item shown at least once.
/// let history = PairHistory::<usize>::new();
/// let design = generate_design(7, 3, 1, &history).unwrap().expect("feasible");
/// assert!(design.iter().all(|block| block.len() == 3));
///
/// // Item 0 preferred over item 1 three times out of four.
/// let w = WinMatrix::from_outcomes(2, vec![(0, 1), (0, 1), (0, 1), (1, 0)]).unwrap();
/// let scores = rank(&w, 1.0, 1e-12).unwrap();
/// assert!(scores[0] > scores[1]);
/// ```

pub mod constants;
pub mod design;
pub mod engine;
pub mod error;
pub mod gmres;
pub mod rank_centrality;
pub mod sampler;
pub mod scc;
pub mod sparse;
pub mod types;
pub mod win_matrix;

// Re-export primary public API at crate root.
pub use design::{generate_design, shuffle_design, Combinations};
pub use engine::{DesignPlanner, PlannerConfig};
pub use error::{Error, Result};
pub use rank_centrality::{
    rank, rank_with_options, transition_matrix, ComponentSummary, RankOptions, RankOutcome,
    Solver, SolverUsed,
};
pub use sampler::{OrderedSampler, SamplerConfig};
pub use sparse::CsrMatrix;
pub use types::{Block, Design, IdMap, ItemStore, Pair, PairHistory, PairOracle};
pub use win_matrix::{WinMatrix, WinTally};
