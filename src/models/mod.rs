pub mod candidate;
pub mod light_curve;
pub mod run;

pub use candidate::*;
pub use light_curve::*;
pub use run::*;
