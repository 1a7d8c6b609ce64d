pub mod allocator;
pub mod device;
pub mod gpu_components;
pub mod resource_db;
pub mod surface;

pub use allocator::{Allocation, FreeList};
pub use device::{QueueFamilyIndices, VulkanDevice};
pub use gpu_components::{MaterialResources, MeshResources, ModelResources};
pub use resource_db::{ArenaSizes, BufferAllocator, PipelineEntry, ResourceDatabase};
pub use surface::{FrameSync, PresentOutcome, Surface, Swapchain, MAX_FRAMES_IN_FLIGHT};
