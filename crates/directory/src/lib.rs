//! Client for the remote plugin directory.
//!
//! Logs in with the user's account, scrapes a plugin's directory page for the
//! compatibility votes already cast by that account, and submits new votes
//! through the page's HTML form.

pub mod client;
pub mod error;
pub mod page;
pub mod session;
pub mod types;

pub use {
    client::{CompatibilityDirectory, DirectoryClient},
    error::{AuthFailure, Error, Result},
    session::Session,
    types::{Credentials, VoteRequest, VoteTable},
};
