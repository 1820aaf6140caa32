pub mod comm;
pub mod evaluate;
pub mod generator;
pub mod incremental;
pub mod linalg;
pub mod svd;

pub use comm::ProcessGroup;
pub use comm::SerialGroup;
pub use comm::ThreadGroup;

pub use evaluate::ReducedModelEvaluator;
pub use generator::BasisGenerator;
pub use generator::BasisGeneratorBuilder;
pub use incremental::FastUpdateSvd;
pub use incremental::NaiveSvd;
pub use incremental::OrthoStats;
pub use incremental::SampleOutcome;
pub use incremental::SvdOptions;
pub use incremental::SvdVariant;
