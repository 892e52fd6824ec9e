// Database module

pub mod pool;
pub mod rollup;

pub use pool::DbPool;
pub use rollup::RollupRepository;
