//! Collaborator interfaces consumed by the workflow
//!
//! Implementations of the real transports live elsewhere; these modules
//! define the seams and the default production clients.

pub mod billing;
pub mod email_sender;
pub mod media_store;

pub use billing::{BillingPolicy, EditWindowPolicy};
pub use email_sender::{EmailSender, RelayEmailSender};
pub use media_store::{MediaStore, UrlMediaStore};
