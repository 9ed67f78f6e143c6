pub mod gaps;
pub mod identity;

pub use gaps::{compute_gap_profile, GapProfile};
pub use identity::{identity_matrix, mean_pairwise_identity, score_identity};
