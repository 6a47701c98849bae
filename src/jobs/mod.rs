pub mod controller;

pub use controller::{JobController, JobRequest, JobStatus};
