// storefront/src/services/mod.rs

pub mod checkout;
pub mod confirmation;
pub mod paystack;
pub mod signature;
