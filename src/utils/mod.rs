pub mod phone;
pub mod responses;

pub use phone::normalize_e164;
