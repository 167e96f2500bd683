pub mod accumulator;
pub mod autocorrelation;
pub mod results;

pub use accumulator::{ObservableAccumulator, ObservableSample};
pub use autocorrelation::{sokal_tau, AutocorrAccum};
pub use results::{ResultTable, TemperatureResultRow};
