pub mod alert;
pub mod commerce;
pub mod config;
pub mod credentials;
pub mod dedupe;
pub mod email;
pub mod enablement;
pub mod error;
pub mod evaluate;
pub mod io;
pub mod notify;
pub mod order;
pub mod paths;
pub mod run;
pub mod sms;
pub mod source;
pub mod state;

pub use error::{GuestwatchError, Result};
