pub mod diff_stats;
pub mod listing;
pub mod moves;
pub mod synthetic;
pub mod types;

pub use types::{
    Advisory, BranchRef, Commit, ComparisonResult, ComparisonSummary, DiffLine, DiffStats,
    DiscrepancyCause, FileChange, FileStatus, ResolutionStage, MOVED_MARKER,
};
