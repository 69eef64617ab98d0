mod candidate_queue;

pub use candidate_queue::*;
