//! Call-site tagging for `tracing` pipelines.
//!
//! [`format::call_site`] builds a pipeline step that walks the current call
//! stack, skips the frames belonging to the logging machinery (`tracing`,
//! `tracing-subscriber`, the standard library, this crate) and attaches the
//! first remaining frame to the record: either as `typeName`,
//! `functionName`, `methodName`, `fileName` and `lineNumber` fields, or as
//! a `Type.method: ` style prefix of the message.
//!
//! [`layer::CallSiteLayer`] hooks the pipeline into a `tracing_subscriber`
//! registry; [`init::init_tracing`] installs everything in one call.

pub mod capture;
pub mod error;
pub mod filter;
pub mod format;
pub mod frame;
pub mod options;
pub mod record;
pub mod resolver;

pub mod env;
pub mod init;
pub mod layer;
pub mod memory_sink;
pub mod sink;
