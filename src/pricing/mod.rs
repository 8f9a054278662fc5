pub mod intrinsic;
pub mod signal;

pub use intrinsic::compute_fair_price;
pub use signal::classify;
