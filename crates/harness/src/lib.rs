pub mod clinic;
pub mod fixtures;

pub use clinic::TestClinic;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;
