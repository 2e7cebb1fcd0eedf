mod error;
mod generation;
mod loading;

pub mod story;
pub mod vision;

use std::fmt;

use anyhow::Result;
use candle_core::{DType, Device, utils::metal_is_available};
use serde::{Deserialize, Serialize};

pub use error::InferenceError;
pub use framestory_core::hf_hub::set_cache_dir;
pub use generation::GenerateOptions;

/// A Hugging Face Hub model reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: String,
    #[serde(default = "default_revision")]
    pub revision: String,
}

fn default_revision() -> String {
    "main".to_string()
}

impl ModelSpec {
    pub fn new(id: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            revision: revision.into(),
        }
    }
}

impl fmt::Display for ModelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.revision)
    }
}

/// Name of the compute device being used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceName {
    Cpu,
    Cuda,
    Metal,
}

impl fmt::Display for DeviceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceName::Cpu => write!(f, "CPU"),
            DeviceName::Cuda => write!(f, "CUDA"),
            DeviceName::Metal => write!(f, "Metal"),
        }
    }
}

/// Returns the name of the device that would be selected.
pub fn device_name(cpu: bool) -> DeviceName {
    if cpu {
        DeviceName::Cpu
    } else if cuda_is_available() {
        DeviceName::Cuda
    } else if metal_is_available() {
        DeviceName::Metal
    } else {
        DeviceName::Cpu
    }
}

pub fn device(cpu: bool) -> Result<Device> {
    match device_name(cpu) {
        DeviceName::Cuda => Ok(Device::new_cuda(0)?),
        DeviceName::Metal => Ok(Device::new_metal(0)?),
        DeviceName::Cpu => {
            if !cpu {
                tracing::warn!("CUDA and Metal are not available. Using CPU device.");
            }
            Ok(Device::Cpu)
        }
    }
}

/// Floating point precision used for weights and activations on `device`.
pub fn precision(device: &Device) -> DType {
    if device.is_cuda() {
        DType::BF16
    } else if device.is_metal() {
        DType::F16
    } else {
        DType::F32
    }
}

pub fn cuda_is_available() -> bool {
    (unsafe {
        libloading::Library::new(if cfg!(target_os = "windows") {
            "nvcuda.dll"
        } else {
            "libcuda.so"
        })
        .is_ok()
    }) && cfg!(feature = "cuda")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forced_cpu_uses_full_precision() -> anyhow::Result<()> {
        let device = device(true)?;
        assert!(device.is_cpu());
        assert_eq!(device_name(true), DeviceName::Cpu);
        assert_eq!(precision(&device), DType::F32);
        Ok(())
    }

    #[test]
    fn model_spec_defaults_to_main_revision() -> anyhow::Result<()> {
        let spec: ModelSpec = serde_json::from_str(r#"{"id": "google/flan-t5-large"}"#)?;
        assert_eq!(spec, ModelSpec::new("google/flan-t5-large", "main"));
        assert_eq!(spec.to_string(), "google/flan-t5-large@main");
        Ok(())
    }
}
