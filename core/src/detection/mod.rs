pub mod record;
pub mod set;

pub use record::Detection;
pub use set::{DetectionDocument, DetectionPair, DetectionSet, DetectionTriple, SetKind};
