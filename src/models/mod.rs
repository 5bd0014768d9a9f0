pub mod analysis;
pub mod dataset;
pub mod doc;
pub mod feedback;
pub mod item;
pub mod score_result;
pub mod scorecard;

pub use analysis::*;
pub use dataset::*;
pub use doc::*;
pub use feedback::*;
pub use item::*;
pub use score_result::*;
pub use scorecard::*;
