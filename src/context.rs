use std::{collections::HashMap, sync::Arc};

use winit::window::Window;

use crate::{
    camera::{CameraResources, CameraRig},
    data_structures::{
        instance::InstanceRaw,
        material::{Material, material_layout},
        mesh::Mesh,
        scene_graph::{MaterialId, MeshId, SceneGraph},
        texture,
    },
    error::CorridorError,
    pipelines::{light::LightResources, scene::mk_scene_pipeline},
    viewport::{SurfaceSize, SurfaceTarget},
};

/// An instance buffer and how many instances it has room for.
#[derive(Debug)]
pub(crate) struct InstanceBuffer {
    pub buffer: wgpu::Buffer,
    pub capacity: usize,
}

/// Owns the window surface and every GPU resource the corridor draws with.
#[derive(Debug)]
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::Texture,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub camera: CameraResources,
    pub lighting: LightResources,
    pub clear_colour: wgpu::Color,
    pub(crate) pipeline: wgpu::RenderPipeline,
    pub(crate) material_layout: wgpu::BindGroupLayout,
    pub(crate) meshes: Vec<Mesh>,
    pub(crate) materials: Vec<Material>,
    pub(crate) instance_buffers: HashMap<(MeshId, MaterialId), InstanceBuffer>,
    pub(crate) is_surface_configured: bool,
}

impl Context {
    pub async fn new(
        window: Arc<Window>,
        scene: &SceneGraph,
        rig: &CameraRig,
    ) -> Result<Self, CorridorError> {
        let size = window.inner_size();

        // WebGL2 on the web so the corridor runs in browsers without WebGPU.
        log::info!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .map_err(|e| CorridorError::SurfaceUnavailable(e.to_string()))?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| CorridorError::SurfaceUnavailable(e.to_string()))?;
        log::info!("Using adapter {:?}", adapter.get_info().name);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                experimental_features: Default::default(),
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: Default::default(),
            })
            .await
            .map_err(|e| CorridorError::SurfaceUnavailable(e.to_string()))?;

        let surface_caps = surface.get_capabilities(&adapter);
        // The shader writes linear colour and relies on an sRGB surface for encoding.
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or_else(|| {
                CorridorError::SurfaceUnavailable("surface reports no formats".to_string())
            })?;
        let initial = SurfaceSize {
            width: size.width.max(1),
            height: size.height.max(1),
            pixel_ratio: window.scale_factor(),
        }
        .fit_within(device.limits().max_texture_dimension_2d);
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: initial.width,
            height: initial.height,
            present_mode: surface_caps
                .present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::Fifo),
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };

        let camera = CameraResources::new(&device, rig);
        let lighting = LightResources::new(&device, &scene.lights);
        let material_layout = material_layout(&device);
        let pipeline = mk_scene_pipeline(
            &device,
            config.format,
            &material_layout,
            &camera.bind_group_layout,
            &lighting.bind_group_layout,
        );

        let depth_texture = texture::Texture::create_depth_texture(
            &device,
            [config.width, config.height],
            "depth_texture",
        );

        let mut ctx = Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            camera,
            lighting,
            clear_colour: scene.lights.fog.color.to_wgpu(),
            pipeline,
            material_layout,
            meshes: Vec::new(),
            materials: Vec::new(),
            instance_buffers: HashMap::new(),
            is_surface_configured: false,
        };
        ctx.upload_scene(scene);
        Ok(ctx)
    }

    pub fn window(&self) -> &Arc<Window> {
        &self.window
    }

    /// Create GPU meshes and materials for everything the scene declares.
    ///
    /// The scene never removes geometry or materials, so only the new tail is
    /// uploaded.
    pub fn upload_scene(&mut self, scene: &SceneGraph) {
        for geometry in &scene.meshes()[self.meshes.len().min(scene.meshes().len())..] {
            log::debug!("Uploading mesh {}", geometry.name);
            self.meshes.push(Mesh::from_geometry(&self.device, geometry));
        }
        for descriptor in &scene.materials()[self.materials.len().min(scene.materials().len())..]
        {
            log::debug!("Uploading material {}", descriptor.name);
            self.materials.push(Material::new(
                &self.device,
                &self.queue,
                &self.material_layout,
                descriptor,
            ));
        }
    }

    /// Make sure the instance buffer for `key` can hold `count` instances.
    pub(crate) fn ensure_instance_buffer(&mut self, key: (MeshId, MaterialId), count: usize) {
        let too_small = self
            .instance_buffers
            .get(&key)
            .is_none_or(|b| b.capacity < count);
        if too_small {
            let capacity = count.max(1).next_power_of_two();
            let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("Instance Buffer {:?}/{:?}", key.0, key.1)),
                size: (capacity * std::mem::size_of::<InstanceRaw>()) as wgpu::BufferAddress,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            self.instance_buffers
                .insert(key, InstanceBuffer { buffer, capacity });
        }
    }

    pub(crate) fn reconfigure(&mut self) {
        self.surface.configure(&self.device, &self.config);
        self.is_surface_configured = true;
    }
}

impl SurfaceTarget for Context {
    fn resize_surface(&mut self, size: SurfaceSize) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        let max = self.device.limits().max_texture_dimension_2d;
        let fitted = size.fit_within(max);
        if fitted != size {
            log::warn!(
                "Surface {}x{} exceeds the device limit of {max}, using {}x{}",
                size.width,
                size.height,
                fitted.width,
                fitted.height
            );
        }
        self.config.width = fitted.width;
        self.config.height = fitted.height;
        self.reconfigure();
        self.depth_texture = texture::Texture::create_depth_texture(
            &self.device,
            [self.config.width, self.config.height],
            "depth_texture",
        );
    }
}
