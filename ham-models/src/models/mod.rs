mod aiyagari;
mod partial;

pub use aiyagari::{aiyagari_spec, CobbDouglasProjection, CrraHousehold, AIYAGARI_TOML};
pub use partial::FixedPricesProjection;
