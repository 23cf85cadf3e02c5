pub(crate) mod progress_manager;
pub(crate) mod prompt;
pub(crate) mod runtime;
pub(crate) mod terminal;
