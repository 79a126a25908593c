pub mod los;
pub mod refraction;
