// Keyhook State
// Transient key state owned by the hook callback

mod tracker;

pub use tracker::KeyTracker;
