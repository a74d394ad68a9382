pub mod mixer;

pub use mixer::{SimDevice, SimHandle, SimLine, SimState, SimulatedMixer};
