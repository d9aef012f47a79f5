pub mod alpha_vantage;
pub mod normalize;
pub mod types;
