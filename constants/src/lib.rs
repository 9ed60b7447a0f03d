pub mod class;
pub mod classification;
