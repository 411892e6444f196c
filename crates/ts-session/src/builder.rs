//! Fluent builder running the whole setup sequence.

use std::path::PathBuf;
use std::sync::Arc;

use ts_engine::EngineBinder;
use ts_scenario::{ScenarioDescriptor, ScenarioLoader};

use crate::{Session, SessionConfig, SessionError, SessionResult, StepObserver};

enum ScenarioSource {
    Loaded(Arc<ScenarioDescriptor>),
    Path(PathBuf),
}

/// Builds a [`Session`] that is already `Ready`.
///
/// # Required inputs
///
/// - [`SessionConfig`] — engine library, buffer size, iteration cap, …
/// - `B: EngineBinder` — e.g. [`ts_engine::NativeBinder`]
/// - a scenario, either loaded ([`scenario`](Self::scenario)) or as a path
///   ([`scenario_path`](Self::scenario_path))
///
/// # Example
///
/// ```rust,ignore
/// let mut session = SessionBuilder::new(config, NativeBinder)
///     .scenario_path("bottleneck.xml")
///     .observer(recorder)
///     .open()?;
/// session.run()?;
/// ```
pub struct SessionBuilder<B: EngineBinder> {
    config:    SessionConfig,
    binder:    B,
    scenario:  Option<ScenarioSource>,
    observers: Vec<Box<dyn StepObserver>>,
}

impl<B: EngineBinder> SessionBuilder<B> {
    pub fn new(config: SessionConfig, binder: B) -> Self {
        Self { config, binder, scenario: None, observers: Vec::new() }
    }

    pub fn scenario(mut self, scenario: Arc<ScenarioDescriptor>) -> Self {
        self.scenario = Some(ScenarioSource::Loaded(scenario));
        self
    }

    /// Load the scenario from `path` at [`open`](Self::open), capped by the
    /// configured iteration limit.
    pub fn scenario_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scenario = Some(ScenarioSource::Path(path.into()));
        self
    }

    pub fn observer(mut self, observer: impl StepObserver + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Bind, register the scenario, load the network, and initialize.
    ///
    /// The first failing stage aborts construction with its error.
    pub fn open(self) -> SessionResult<Session<B::Engine>> {
        let scenario = match self.scenario {
            Some(ScenarioSource::Loaded(s)) => s,
            Some(ScenarioSource::Path(path)) => {
                let mut loader = ScenarioLoader::new();
                if let Some(cap) = self.config.max_iterations {
                    loader = loader.max_steps(cap);
                }
                Arc::new(loader.load(&path)?)
            }
            None => {
                return Err(SessionError::FileLoad {
                    path:   PathBuf::new(),
                    reason: "no scenario given".into(),
                });
            }
        };

        let mut session = Session::new(self.config);
        for observer in self.observers {
            session.add_boxed_observer(observer);
        }
        session.bind(&self.binder)?;
        session.register_scenario(scenario)?;
        session.load_network()?;
        session.initialize()?;
        Ok(session)
    }
}
