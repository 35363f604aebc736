pub mod executor;

pub use executor::{CommandExecutor, ExecError, GitCommand};
