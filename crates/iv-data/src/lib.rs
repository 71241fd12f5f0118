pub mod dataset;
pub mod loaders;
pub mod scaler;
pub mod split;

pub use dataset::*;
pub use loaders::*;
pub use scaler::*;
pub use split::*;
