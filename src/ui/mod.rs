pub mod output;
pub mod progress;
pub mod signals;

pub use output::{OutputFormatter, OutputMode};
pub use progress::{BatchProgress, NoopProgress, ProgressManager, ProgressObserver};
pub use signals::GracefulShutdown;
