pub mod addresses;
pub mod carts;
pub mod checkout;
pub mod orders;
pub mod payments;

pub use addresses::AddressService;
pub use carts::CartService;
pub use checkout::CheckoutService;
pub use orders::OrderService;
pub use payments::PaymentService;
