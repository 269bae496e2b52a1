pub mod clustering;
pub mod correlation;
pub mod differential;
pub mod features;
pub mod output;
pub mod pipeline;
pub mod reduction;
pub mod stats;
