use std::fmt;

use crate::options::CallSiteOptions;
use crate::record::LogRecord;
use crate::resolver;

/// One step of a log-formatting pipeline.
///
/// A step receives the record owned by the pipeline, may mutate it, and
/// hands the same record back. Plain closures over `&mut LogRecord` are
/// steps too.
pub trait Format: Send + Sync {
    fn transform<'r>(&self, record: &'r mut LogRecord) -> &'r mut LogRecord;
}

impl<F> Format for F
where
    F: Fn(&mut LogRecord) + Send + Sync,
{
    fn transform<'r>(&self, record: &'r mut LogRecord) -> &'r mut LogRecord {
        self(record);
        record
    }
}

/// Pipeline step that tags records with the application call site.
///
/// Created with [`call_site`].
#[derive(Clone, Copy, Debug, Default)]
pub struct CallSiteFormat {
    options: CallSiteOptions,
}

impl CallSiteFormat {
    pub fn options(&self) -> &CallSiteOptions {
        &self.options
    }
}

impl Format for CallSiteFormat {
    fn transform<'r>(&self, record: &'r mut LogRecord) -> &'r mut LogRecord {
        resolver::resolve(record, &self.options)
    }
}

/// Build the call-site step.
///
/// ```rust
/// use tracing_call_site::format::{call_site, Format};
/// use tracing_call_site::options::CallSiteOptions;
/// use tracing_call_site::record::LogRecord;
///
/// let step = call_site(CallSiteOptions { prepend: true, ..Default::default() });
/// let mut record = LogRecord::new("cache miss");
/// step.transform(&mut record);
/// assert!(record.message.ends_with(": cache miss"));
/// ```
pub fn call_site(options: CallSiteOptions) -> CallSiteFormat {
    CallSiteFormat { options }
}

/// Ordered list of [`Format`] steps applied to every record.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Format>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `step`; steps run in insertion order.
    pub fn with(mut self, step: impl Format + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn apply<'r>(&self, record: &'r mut LogRecord) -> &'r mut LogRecord {
        let mut record = record;
        for step in &self.steps {
            record = step.transform(record);
        }
        record
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("steps", &self.steps.len())
            .finish()
    }
}
