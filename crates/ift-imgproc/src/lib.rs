#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// adjacency relations (disk and sphere neighbourhoods).
pub mod adjacency;

/// connected components and label filters.
pub mod components;

/// seeded object delineation pipeline.
pub mod delineation;

/// optimum-path forest propagation.
pub mod forest;

/// image gradient module.
pub mod gradient;

/// binary morphology module.
pub mod morphology;

/// module containing parallelization utilities.
pub mod parallel;

/// integer bucket priority queue.
pub mod queue;

/// operations to threshold images.
pub mod threshold;
