//! Git repository operations over run workspaces.

mod git_ops;

pub use git_ops::GitWorkspace;
