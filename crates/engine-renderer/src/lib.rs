//! Vulkan rendering pipeline: device/queue setup, a windowed swapchain,
//! a buffer sub-allocator, a GPU resource database, and the per-frame
//! draw loop. Collectors (`engine-collectors`) populate the GPU-resident
//! components this crate's frame loop reads.

pub mod frame;
pub mod vulkan;

pub use frame::{FrameOutcome, FrameRecorder, Renderer};
pub use vulkan::{
    ArenaSizes, MaterialResources, MeshResources, ModelResources, PipelineEntry, ResourceDatabase, Surface,
    Swapchain, VulkanDevice, MAX_FRAMES_IN_FLIGHT,
};
