pub mod clients;
pub mod config;
pub mod domain;
pub mod errors;

pub use clients::{
    build_new_customer, diff_contact, infer_preferred_contact, ClientSearchResult, SearchMode,
    SearchRequest,
};
pub use domain::contact::{ContactChannel, ContactInfo, OrderChannel};
pub use domain::customer::{
    Customer, CustomerId, CustomerPatch, CustomerStats, DeleteClientOutcome, ProfileUpdate,
};
pub use domain::order::{Order, OrderId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
