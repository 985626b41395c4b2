//! Long-poll status client and pool chart adapter
//!
//! - [`longpoll`]: cancellable poll loop over an injected transport and scheduler
//! - [`chart`]: sample buffer and derived series, drawn through [`ChartSurface`]
//! - [`chartjs`]: a surface producing Chart.js configurations
//! - [`clock`]: wall clock abstraction used to timestamp samples

pub mod chart;
pub mod chartjs;
pub mod clock;
pub mod longpoll;

pub use chart::{ChartConfig, ChartSurface, PoolChart, SeriesKind, SeriesStyle};
pub use chartjs::ChartJsSurface;
pub use clock::{Clock, ManualClock, SystemClock};
pub use longpoll::{
    HttpTransport, LongPollClient, PollHandle, PollOutcome, Scheduler, StatusTransport,
    TokioScheduler, TransportResponse,
};
