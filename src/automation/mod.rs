pub mod guard;
pub mod resolver;
pub mod sequencer;
pub mod site;

pub use guard::{RunGuard, RunOutcome};
pub use resolver::{ElementResolver, Resolution, ResolutionTarget, Scope, Strategy, StrategyKind};
pub use sequencer::{Automation, StepSequencer};
pub use site::SiteProfile;
