pub mod hf_hub;
pub mod progress;
