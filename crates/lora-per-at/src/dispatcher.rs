//! Command table and line dispatcher.
//!
//! A [`CommandTable`] is an ordered list of `(name, handler)` pairs. The
//! [`Dispatcher`] checks a completed line against every entry in order: each
//! entry whose name occurs anywhere in the line fires, so a single line can
//! trigger more than one handler when names overlap.
//!
//! Handlers get exclusive, sequential access to the [`TestConfig`] through a
//! [`CommandContext`]. A handler that returns an error is logged and skipped;
//! dispatch continues with the next entry.

use lora_per_core::{Result, TestConfig};
use tracing::{debug, error, info, trace, warn};

use crate::protocol::{Params, ReadBuffer, extract_params, find_subslice};

/// Default console name, used in log output.
pub const DEFAULT_CONSOLE_NAME: &str = "UART2";

/// Mutable state a command handler may touch.
pub struct CommandContext<'a> {
    /// The configuration store. Only command handlers write it.
    pub config: &'a mut TestConfig,
    output: Vec<String>,
    start_requested: bool,
}

impl<'a> CommandContext<'a> {
    pub fn new(config: &'a mut TestConfig) -> Self {
        CommandContext {
            config,
            output: Vec::new(),
            start_requested: false,
        }
    }

    /// Queue a text line for the console.
    pub fn print(&mut self, line: impl Into<String>) {
        self.output.push(line.into());
    }

    /// Ask the command loop to leave the command phase and start a run.
    pub fn request_start(&mut self) {
        self.start_requested = true;
    }

    pub fn start_requested(&self) -> bool {
        self.start_requested
    }
}

/// A handler invoked when its command name matches a line.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, params: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()>;
}

impl<F> CommandHandler for F
where
    F: Fn(Params<'_>, &mut CommandContext<'_>) -> Result<()> + Send + Sync,
{
    fn handle(&self, params: Params<'_>, ctx: &mut CommandContext<'_>) -> Result<()> {
        self(params, ctx)
    }
}

/// One row of the command table.
pub struct CommandEntry {
    name: String,
    handler: Box<dyn CommandHandler>,
}

impl CommandEntry {
    pub fn new(name: impl Into<String>, handler: impl CommandHandler + 'static) -> Self {
        CommandEntry {
            name: name.into(),
            handler: Box::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for CommandEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandEntry")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An ordered command table.
#[derive(Debug, Default)]
pub struct CommandTable {
    entries: Vec<CommandEntry>,
}

impl CommandTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from a list of entries.
    ///
    /// Reading stops at the first entry with an empty name; it and everything
    /// after it are discarded.
    pub fn from_entries(entries: impl IntoIterator<Item = CommandEntry>) -> Self {
        let entries = entries
            .into_iter()
            .take_while(|e| !e.name.is_empty())
            .collect();
        CommandTable { entries }
    }

    /// Append an entry. Duplicate names are allowed; both fire.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: impl CommandHandler + 'static,
    ) -> &mut Self {
        self.entries.push(CommandEntry::new(name, handler));
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Command names in table order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(CommandEntry::name)
    }
}

/// What a dispatched line produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Names of the entries that matched, in table order.
    pub matched: Vec<String>,
    /// Text lines the handlers asked to print.
    pub output: Vec<String>,
    /// Whether a handler asked to start a run.
    pub start_requested: bool,
}

/// Matches completed lines against a [`CommandTable`] and runs handlers.
#[derive(Debug)]
pub struct Dispatcher {
    name: String,
    table: CommandTable,
}

impl Dispatcher {
    /// Register `table` under the console `name`.
    pub fn new(name: impl Into<String>, table: CommandTable) -> Self {
        let name = name.into();
        info!(console = %name, commands = table.len(), "command table registered");
        Dispatcher { name, table }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &CommandTable {
        &self.table
    }

    /// Dispatch a completed line against every table entry, then clear it.
    ///
    /// Unmatched lines are discarded without a diagnostic. Handler errors
    /// never stop the remaining entries: parameter errors are logged as
    /// warnings, fatal errors as errors.
    pub fn process_line(&self, line: &mut ReadBuffer, config: &mut TestConfig) -> DispatchOutcome {
        let mut ctx = CommandContext::new(config);
        let mut matched = Vec::new();

        {
            let bytes = line.as_bytes();
            trace!(console = %self.name, line = %String::from_utf8_lossy(bytes), "dispatching");

            for entry in &self.table.entries {
                let Some(pos) = find_subslice(bytes, entry.name.as_bytes()) else {
                    continue;
                };
                let params = extract_params(&bytes[pos + entry.name.len()..]);
                debug!(
                    command = %entry.name,
                    param1 = ?params.first,
                    param2 = ?params.second,
                    "command matched"
                );
                match entry.handler.handle(params, &mut ctx) {
                    Ok(()) => {}
                    Err(e) if e.is_fatal() => {
                        error!(command = %entry.name, error = %e, "command failed");
                    }
                    Err(e) => {
                        warn!(command = %entry.name, error = %e, "command rejected");
                    }
                }
                matched.push(entry.name.clone());
            }
        }

        line.clear();

        DispatchOutcome {
            matched,
            output: ctx.output,
            start_requested: ctx.start_requested,
        }
    }
}
