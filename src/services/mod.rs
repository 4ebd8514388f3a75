pub mod discovery;
pub mod grader;

pub use discovery::{run_discovery_loop, system_clock, Clock, DiscoveryJob, DiscoveryReport};
pub use grader::{collect_metrics, grade, grade_wallets, write_report, GradeOptions, GradeReport};
