pub mod contact;
pub mod customer;
pub mod order;
