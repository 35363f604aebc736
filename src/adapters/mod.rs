pub mod git_cli;

pub use git_cli::GitCli;
