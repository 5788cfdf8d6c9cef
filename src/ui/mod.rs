pub mod icons;
pub mod progress;
pub mod summary;

pub use progress::SweepUI;
pub use summary::render_report;
