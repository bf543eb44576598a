use std::fmt;
use std::sync::Arc;

use super::{Case, CaseRun};

type Step<T> = Arc<dyn Fn(&mut CaseRun) -> anyhow::Result<T> + Send + Sync>;

/// A case assembled from plain functions instead of a dedicated type.
///
/// `run` passes unless it returns an error; the optional `initialize` gates it the same way
/// [`Case::initialize`] does.
#[derive(Clone)]
pub struct FnCase {
    id: String,
    description: String,
    initialize: Option<Step<bool>>,
    run: Step<()>,
    verify: Option<Step<()>>,
    dispose: Option<Step<()>>,
}

impl FnCase {
    pub fn new<F>(id: impl Into<String>, run: F) -> Self
    where
        F: Fn(&mut CaseRun) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = id.into();
        Self {
            description: id.clone(),
            id,
            initialize: None,
            run: Arc::new(run),
            verify: None,
            dispose: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_initialize<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CaseRun) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.initialize = Some(Arc::new(f));
        self
    }

    pub fn with_verify<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CaseRun) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.verify = Some(Arc::new(f));
        self
    }

    pub fn with_dispose<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut CaseRun) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.dispose = Some(Arc::new(f));
        self
    }

    pub fn boxed(self) -> Box<dyn Case> {
        Box::new(self)
    }
}

impl fmt::Debug for FnCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCase")
            .field("id", &self.id)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

impl Case for FnCase {
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn fresh(&self) -> Box<dyn Case> {
        Box::new(self.clone())
    }

    fn initialize(&mut self, run: &mut CaseRun) -> anyhow::Result<bool> {
        match &self.initialize {
            Some(f) => f(run),
            None => Ok(true),
        }
    }

    fn run(&mut self, run: &mut CaseRun) -> anyhow::Result<bool> {
        (self.run)(run)?;
        Ok(true)
    }

    fn verify(&mut self, run: &mut CaseRun) -> anyhow::Result<()> {
        match &self.verify {
            Some(f) => f(run),
            None => Ok(()),
        }
    }

    fn dispose(&mut self, run: &mut CaseRun) -> anyhow::Result<()> {
        match &self.dispose {
            Some(f) => f(run),
            None => Ok(()),
        }
    }
}
