//! Backs `--open-window`: a winit event loop driving the Vulkan device,
//! swapchain, and frame loop, in the same `ApplicationHandler`-per-event
//! shape as the teacher's `myq2-sys` main loop, collapsed down to exactly
//! what a headless demo scene needs.

use std::path::Path;

use raw_window_handle::HasDisplayHandle;
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::window::{Window, WindowId};

use engine_collectors::{
    EcsMaterial, EcsMesh, EcsModel, MaterialCollector, MaterialReferenceCollector, MeshCollector, MeshReferenceCollector,
    ModelCollector,
};
use engine_common::{EngineError, EngineResult};
use engine_ecs::{ComponentRef, World};
use engine_renderer::{
    ArenaSizes, FrameOutcome, FrameRecorder, MaterialResources, MeshResources, ModelResources, Renderer, ResourceDatabase,
    Surface, Swapchain, VulkanDevice,
};
use engine_resources::{primitives, Material, MaterialParameters, Mesh, ResourceCache, Shader, ShaderStage};

const MAX_DESCRIPTOR_SETS: u32 = 64;

/// Everything that exists only once a window (and therefore a device) is
/// available. Created in `resumed`, torn down in `exiting`.
struct RenderState {
    window: Window,
    device: VulkanDevice,
    surface: Surface,
    swapchain: Swapchain,
    resource_db: ResourceDatabase,
    recorder: FrameRecorder,
    world: World,
}

struct DemoApp {
    enable_validation: bool,
    state: Option<RenderState>,
}

impl DemoApp {
    fn new(enable_validation: bool) -> Self {
        Self { enable_validation, state: None }
    }
}

/// Run the windowed demo loop until the window is closed.
pub fn run(enable_validation: bool) -> EngineResult<()> {
    let event_loop =
        EventLoop::new().map_err(|e| EngineError::Configuration(format!("failed to create event loop: {e}")).logged())?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = DemoApp::new(enable_validation);
    event_loop
        .run_app(&mut app)
        .map_err(|e| EngineError::Configuration(format!("event loop exited with an error: {e}")).logged())
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }
        match build_render_state(event_loop, self.enable_validation) {
            Ok(state) => self.state = Some(state),
            Err(e) => {
                log::error!(target: "cli", "failed to initialize the render window: {e}");
                event_loop.exit();
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        if let WindowEvent::CloseRequested = event {
            event_loop.exit();
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let Some(state) = &mut self.state else { return };
        if let Err(e) = tick(state) {
            log::error!(target: "cli", "frame tick failed: {e}");
            event_loop.exit();
        }
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        let Some(mut state) = self.state.take() else { return };
        state.device.wait_idle();
        unsafe {
            state.resource_db.save_pipeline_cache(&state.device);
            state.resource_db.destroy(&state.device);
            state.swapchain.destroy(&state.device);
            state.surface.destroy(&state.device);
        }
    }
}

fn build_render_state(event_loop: &ActiveEventLoop, enable_validation: bool) -> EngineResult<RenderState> {
    let window = event_loop
        .create_window(Window::default_attributes().with_title("engine-cli"))
        .map_err(|e| EngineError::Configuration(format!("failed to create window: {e}")).logged())?;

    let display_handle = window
        .display_handle()
        .map_err(|e| EngineError::Vulkan(format!("failed to get display handle: {e}")).logged())?
        .as_raw();

    unsafe {
        let device = VulkanDevice::new(display_handle, enable_validation)?;
        let surface = Surface::from_winit(&device, &window)?;
        let size = window.inner_size();
        let swapchain = Swapchain::new(&device, &surface, size.width.max(1), size.height.max(1), None)?;
        let resource_db = ResourceDatabase::new(&device, Path::new("cache"), ArenaSizes::default(), MAX_DESCRIPTOR_SETS)?;
        let recorder = FrameRecorder::new(&device, swapchain.images.len())?;
        let world = build_demo_world();

        Ok(RenderState { window, device, surface, swapchain, resource_db, recorder, world })
    }
}

/// A single cube, textured by a flat-shaded material, so `--open-window`
/// has something to draw rather than a cleared framebuffer. Grounded in
/// the S4 testable-property scenario's 24-vertex / 36-index cube fixture.
fn build_demo_world() -> World {
    let mut world = World::new();
    world.register::<EcsMesh>("ecs_mesh");
    world.register::<EcsMaterial>("ecs_material");
    world.register::<EcsModel>("ecs_model");
    world.register::<MeshResources>("mesh_resources");
    world.register::<MaterialResources>("material_resources");
    world.register::<ModelResources>("model_resources");
    world.register::<ComponentRef<EcsMesh>>("ref<ecs_mesh>");
    world.register::<ComponentRef<EcsMaterial>>("ref<ecs_material>");
    world.register::<ComponentRef<MeshResources>>("ref<mesh_resources>");
    world.register::<ComponentRef<MaterialResources>>("ref<material_resources>");

    let mesh_cache: ResourceCache<Mesh> = ResourceCache::new();
    let material_cache: ResourceCache<Material> = ResourceCache::new();

    let mesh_owner = world.create_entity();
    let mesh_handle = mesh_cache.insert("demo://cube", primitives::cube(0.5));
    world.add_component(mesh_owner, EcsMesh::new(mesh_handle));

    let material_owner = world.create_entity();
    let material = Material::new(
        "demo-lit",
        Shader::new(ShaderStage::Vertex),
        Shader::new(ShaderStage::Fragment),
        MaterialParameters::default(),
    );
    let material_handle = material_cache.insert("demo://lit", material);
    world.add_component(material_owner, EcsMaterial::new(material_handle));

    let model = world.create_entity();
    world.add_component(model, EcsModel);
    if let Ok(mesh_ref) = world.create_reference::<EcsMesh>(mesh_owner) {
        world.add_component(model, mesh_ref);
    }
    if let Ok(material_ref) = world.create_reference::<EcsMaterial>(material_owner) {
        world.add_component(model, material_ref);
    }

    world
}

fn tick(state: &mut RenderState) -> EngineResult<()> {
    unsafe {
        MeshCollector::run(&mut state.world, &state.device, &mut state.resource_db)?;
        MaterialCollector::run(&mut state.world, &state.device, &mut state.resource_db, state.swapchain.render_pass)?;
        ModelCollector::run(&mut state.world);
        MeshReferenceCollector::run(&mut state.world);
        MaterialReferenceCollector::run(&mut state.world);

        let renderer = Renderer::new(&state.recorder);
        match renderer.draw_frame(&state.device, &mut state.swapchain, &state.resource_db, &state.world)? {
            FrameOutcome::Drawn => {}
            FrameOutcome::SkippedOutOfDate => {
                log::debug!(target: "cli", "swapchain out of date, recreating before the next frame");
                let size = state.window.inner_size();
                state.swapchain.recreate(&state.device, &mut state.surface, size.width.max(1), size.height.max(1))?;
                // recreate() rebuilds the render pass, so every pipeline built
                // against the old one is stale -- force material_collector to
                // rebuild them all on the next tick.
                if let Some(materials) = state.world.store_mut::<MaterialResources>() {
                    for (_owner, gpu) in materials.iter_mut() {
                        gpu.version = Default::default();
                    }
                }
            }
        }
    }
    state.window.request_redraw();
    Ok(())
}
