// storefront/src/models/mod.rs

//! Records owned by the order, payment and cart stores.

pub mod cart_item;
pub mod order;
pub mod order_item;
pub mod payment;
pub mod shipping;

pub use cart_item::{CartItem, NewCartItem};
pub use order::{generate_order_number, ConfirmOutcome, NewOrder, Order, OrderStatus, PaymentStatus};
pub use order_item::{NewOrderItem, OrderItem};
pub use payment::{NewPaymentRecord, PaymentRecord, TransactionStatus};
pub use shipping::ShippingAddress;
