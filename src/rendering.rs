//! Rendering system with wgpu pipelines for the sea, the boat, its shadow and the debug overlay.

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use wgpu::util::DeviceExt;

use crate::assets::{BoatMaterial, BoatModel, BoatPart, BoatTexture, BoatVertex, CubeMapImages};
use crate::debug::OverlayFrame;
use crate::error::RenderError;
use crate::frame::SceneRenderer;
use crate::params::{BoatParams, RenderConfig};
use crate::scene::Scene;
use crate::sea::{SeaUniformsGpu, SurfaceMesh, Vertex};

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth24Plus;
const SHADOW_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Samples per pixel for the scene pass when the surface format allows it
pub const SAMPLE_COUNT: u32 = 4;

/// Uniform buffer for the boat shader (transforms, light, environment, fog, shadow lookup)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BoatUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    pub light_view_proj: [[f32; 4]; 4],
    pub camera_position: [f32; 3],
    pub exposure: f32,
    pub light_direction: [f32; 3],
    pub light_intensity: f32,
    pub light_color: [f32; 3],
    pub env_intensity: f32,
    pub fog_color: [f32; 3],
    pub fog_near: f32,
    pub fog_far: f32,
    pub shadow_normal_bias: f32,
    pub shadow_texel: f32,
    pub _padding: f32,
}

/// Per-material uniforms of the boat shader
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub _padding: [f32; 2],
}

impl From<&BoatMaterial> for MaterialUniforms {
    fn from(material: &BoatMaterial) -> Self {
        Self {
            base_color: material.base_color,
            metallic: material.metallic,
            roughness: material.roughness,
            _padding: [0.0; 2],
        }
    }
}

/// Uniform buffer for the shadow pass
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct ShadowUniforms {
    pub light_model_view_proj: [[f32; 4]; 4],
}

/// Uploaded index/vertex buffers for one mesh
struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

/// Boat mesh with one bind group per material
struct GpuBoat {
    mesh: GpuMesh,
    parts: Vec<BoatPart>,
    materials: Vec<wgpu::BindGroup>,
    _textures: Vec<wgpu::Texture>,
}

/// Rendering system managing wgpu device, pipelines, and buffers
pub struct RenderSystem {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    sample_count: u32,
    /// Multisampled color target, resolved into the surface (None when single-sampled)
    msaa_view: Option<wgpu::TextureView>,
    depth_view: wgpu::TextureView,
    clear_color: wgpu::Color,

    sea_pipeline: wgpu::RenderPipeline,
    sea_mesh: GpuMesh,
    sea_uniform_buffer: wgpu::Buffer,
    sea_bind_group: wgpu::BindGroup,

    boat_pipeline: wgpu::RenderPipeline,
    boat: Option<GpuBoat>,
    boat_uniform_buffer: wgpu::Buffer,
    boat_scene_layout: wgpu::BindGroupLayout,
    boat_material_layout: wgpu::BindGroupLayout,
    boat_scene_bind_group: wgpu::BindGroup,
    env_sampler: wgpu::Sampler,
    material_sampler: wgpu::Sampler,
    white_texture: wgpu::Texture,
    /// Keeps the cube texture alive while the bind group references it
    _env_texture: wgpu::Texture,

    shadow_pipeline: wgpu::RenderPipeline,
    shadow_uniform_buffer: wgpu::Buffer,
    shadow_bind_group: wgpu::BindGroup,
    shadow_view: wgpu::TextureView,
    shadow_sampler: wgpu::Sampler,
    light_view_proj: Mat4,

    /// Values of the boat uniforms that do not change per frame
    boat_lighting: BoatUniforms,

    egui_renderer: egui_wgpu::Renderer,
    overlay: Option<OverlayFrame>,
}

impl RenderSystem {
    /// Create new rendering system
    pub async fn new(
        window: Arc<winit::window::Window>,
        surface_size: (u32, u32),
        sea: &SurfaceMesh,
        render_config: &RenderConfig,
        boat_params: &BoatParams,
    ) -> Result<Self, RenderError> {
        // Create wgpu instance
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        // Create surface (window must have 'static lifetime via Arc)
        let surface = instance.create_surface(window)?;

        // Request adapter
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;
        log::info!("Using adapter: {}", adapter.get_info().name);

        // Request device
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Main Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await?;

        // Configure surface
        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = choose_surface_format(&surface_caps.formats)
            .ok_or(RenderError::IncompatibleSurface("texture format"))?;
        let alpha_mode = surface_caps
            .alpha_modes
            .first()
            .copied()
            .ok_or(RenderError::IncompatibleSurface("alpha mode"))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: surface_size.0.max(1),
            height: surface_size.1.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let format_features = adapter.get_texture_format_features(surface_format);
        let sample_count = if format_features.flags.sample_count_supported(SAMPLE_COUNT) {
            SAMPLE_COUNT
        } else {
            log::warn!("{:?} does not support {}x MSAA", surface_format, SAMPLE_COUNT);
            1
        };
        let msaa_view = create_msaa_view(&device, &config, sample_count);
        let depth_view = create_depth_view(&device, config.width, config.height, sample_count);
        let multisample = wgpu::MultisampleState {
            count: sample_count,
            ..Default::default()
        };

        // Load shaders
        let sea_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Sea Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("sea.wgsl").into()),
        });

        let boat_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Boat Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("boat.wgsl").into()),
        });

        let shadow_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shadow.wgsl").into()),
        });

        // Sea buffers and bind group
        let sea_mesh = GpuMesh {
            vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sea Vertex Buffer"),
                contents: bytemuck::cast_slice(&sea.vertices),
                usage: wgpu::BufferUsages::VERTEX,
            }),
            index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Sea Index Buffer"),
                contents: bytemuck::cast_slice(&sea.indices),
                usage: wgpu::BufferUsages::INDEX,
            }),
            index_count: sea.indices.len() as u32,
        };

        let sea_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Sea Uniform Buffer"),
            size: std::mem::size_of::<SeaUniformsGpu>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sea_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Sea Bind Group Layout"),
                entries: &[uniform_entry(
                    0,
                    wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                )],
            });

        let sea_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Sea Bind Group"),
            layout: &sea_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: sea_uniform_buffer.as_entire_binding(),
            }],
        });

        let sea_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Sea Pipeline Layout"),
            bind_group_layouts: &[&sea_bind_group_layout],
            push_constant_ranges: &[],
        });

        let sea_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Sea Render Pipeline"),
            layout: Some(&sea_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &sea_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<Vertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x2],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &sea_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: triangle_primitive(),
            depth_stencil: Some(depth_stencil_state(DEPTH_FORMAT)),
            multisample,
            multiview: None,
            cache: None,
        });

        // Shadow map, rendered from the directional light
        let shadow_size = render_config.light.shadow_map_size.max(1);
        let shadow_texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Shadow Map"),
            size: wgpu::Extent3d {
                width: shadow_size,
                height: shadow_size,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SHADOW_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let shadow_view = shadow_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });

        let shadow_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Shadow Uniform Buffer"),
            size: std::mem::size_of::<ShadowUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shadow_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Shadow Bind Group Layout"),
                entries: &[uniform_entry(0, wgpu::ShaderStages::VERTEX)],
            });

        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout: &shadow_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: shadow_uniform_buffer.as_entire_binding(),
            }],
        });

        let shadow_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Shadow Pipeline Layout"),
                bind_group_layouts: &[&shadow_bind_group_layout],
                push_constant_ranges: &[],
            });

        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(&shadow_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shadow_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<BoatVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![0 => Float32x3],
                }],
                compilation_options: Default::default(),
            },
            fragment: None,
            primitive: triangle_primitive(),
            depth_stencil: Some(depth_stencil_state(SHADOW_FORMAT)),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        // Boat uniforms, environment cube and bind groups
        let boat_uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Boat Uniform Buffer"),
            size: std::mem::size_of::<BoatUniforms>() as wgpu::BufferAddress,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let boat_scene_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Boat Scene Bind Group Layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT),
                texture_entry(1, wgpu::TextureViewDimension::Cube),
                sampler_entry(2, wgpu::SamplerBindingType::Filtering),
                wgpu::BindGroupLayoutEntry {
                    binding: 3,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                sampler_entry(4, wgpu::SamplerBindingType::Comparison),
            ],
        });

        let boat_material_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("Boat Material Bind Group Layout"),
                entries: &[
                    uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                    texture_entry(1, wgpu::TextureViewDimension::D2),
                    sampler_entry(2, wgpu::SamplerBindingType::Filtering),
                ],
            });

        let env_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Environment Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let material_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Material Sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        // Untextured materials sample plain white
        let white_texture = create_texture_2d(
            &device,
            &queue,
            &BoatTexture {
                width: 1,
                height: 1,
                rgba: vec![255; 4],
            },
        );

        // Neutral grey stand-in until the real environment arrives
        let placeholder = CubeMapImages {
            size: 1,
            faces: vec![vec![128, 128, 128, 255]; 6],
        };
        let env_texture = create_cube_texture(&device, &queue, &placeholder);
        let boat_scene_bind_group = create_boat_scene_bind_group(
            &device,
            &boat_scene_layout,
            &boat_uniform_buffer,
            &env_texture,
            &env_sampler,
            &shadow_view,
            &shadow_sampler,
        );

        let boat_pipeline_layout =
            device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Boat Pipeline Layout"),
                bind_group_layouts: &[&boat_scene_layout, &boat_material_layout],
                push_constant_ranges: &[],
            });

        let boat_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Boat Render Pipeline"),
            layout: Some(&boat_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &boat_shader,
                entry_point: Some("vs_main"),
                buffers: &[wgpu::VertexBufferLayout {
                    array_stride: std::mem::size_of::<BoatVertex>() as wgpu::BufferAddress,
                    step_mode: wgpu::VertexStepMode::Vertex,
                    attributes: &wgpu::vertex_attr_array![
                        0 => Float32x3,
                        1 => Float32x3,
                        2 => Float32x2,
                        3 => Float32x4
                    ],
                }],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &boat_shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: triangle_primitive(),
            depth_stencil: Some(depth_stencil_state(DEPTH_FORMAT)),
            multisample,
            multiview: None,
            cache: None,
        });

        let light = &render_config.light;
        let light_view_proj = light.shadow_view_proj();
        let boat_lighting = BoatUniforms {
            view_proj: Mat4::IDENTITY.to_cols_array_2d(),
            model: Mat4::IDENTITY.to_cols_array_2d(),
            normal_matrix: Mat4::IDENTITY.to_cols_array_2d(),
            light_view_proj: light_view_proj.to_cols_array_2d(),
            camera_position: [0.0; 3],
            exposure: render_config.exposure,
            light_direction: light.direction().to_array(),
            light_intensity: light.intensity,
            light_color: light.color.to_linear().to_array(),
            env_intensity: boat_params.env_map_intensity,
            fog_color: render_config.fog.color.to_linear().to_array(),
            fog_near: render_config.fog.near_m,
            fog_far: render_config.fog.far_m,
            shadow_normal_bias: light.shadow_normal_bias_m,
            shadow_texel: 1.0 / shadow_size as f32,
            _padding: 0.0,
        };

        // The panel is drawn single-sampled onto the resolved surface
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1, false);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            sample_count,
            msaa_view,
            depth_view,
            clear_color: render_config.clear_color.to_wgpu(),
            sea_pipeline,
            sea_mesh,
            sea_uniform_buffer,
            sea_bind_group,
            boat_pipeline,
            boat: None,
            boat_uniform_buffer,
            boat_scene_layout,
            boat_material_layout,
            boat_scene_bind_group,
            env_sampler,
            material_sampler,
            white_texture,
            _env_texture: env_texture,
            shadow_pipeline,
            shadow_uniform_buffer,
            shadow_bind_group,
            shadow_view,
            shadow_sampler,
            light_view_proj,
            boat_lighting,
            egui_renderer,
            overlay: None,
        })
    }

    /// Reconfigure the surface, multisample and depth targets (physical pixels)
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.msaa_view = create_msaa_view(&self.device, &self.config, self.sample_count);
        self.depth_view = create_depth_view(&self.device, width, height, self.sample_count);
    }

    /// Reconfigure with the current size (after a lost or outdated surface)
    pub fn reconfigure(&mut self) {
        self.resize(self.config.width, self.config.height);
    }

    /// Upload the boat mesh, its textures and materials; replaces any previous boat
    pub fn upload_boat(&mut self, model: &BoatModel) {
        let textures: Vec<wgpu::Texture> = model
            .textures
            .iter()
            .map(|texture| create_texture_2d(&self.device, &self.queue, texture))
            .collect();
        let views: Vec<wgpu::TextureView> = textures
            .iter()
            .map(|texture| texture.create_view(&wgpu::TextureViewDescriptor::default()))
            .collect();
        let white_view = self
            .white_texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let materials = model
            .materials
            .iter()
            .map(|material| {
                let uniforms = self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Boat Material Uniforms"),
                        contents: bytemuck::bytes_of(&MaterialUniforms::from(material)),
                        usage: wgpu::BufferUsages::UNIFORM,
                    });
                let view = material
                    .base_color_texture
                    .and_then(|index| views.get(index))
                    .unwrap_or(&white_view);

                self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some("Boat Material Bind Group"),
                    layout: &self.boat_material_layout,
                    entries: &[
                        wgpu::BindGroupEntry {
                            binding: 0,
                            resource: uniforms.as_entire_binding(),
                        },
                        wgpu::BindGroupEntry {
                            binding: 1,
                            resource: wgpu::BindingResource::TextureView(view),
                        },
                        wgpu::BindGroupEntry {
                            binding: 2,
                            resource: wgpu::BindingResource::Sampler(&self.material_sampler),
                        },
                    ],
                })
            })
            .collect();

        self.boat = Some(GpuBoat {
            mesh: GpuMesh {
                vertex_buffer: self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Boat Vertex Buffer"),
                        contents: bytemuck::cast_slice(&model.vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                index_buffer: self
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Boat Index Buffer"),
                        contents: bytemuck::cast_slice(&model.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
                index_count: model.indices.len() as u32,
            },
            parts: model.parts.clone(),
            materials,
            _textures: textures,
        });
    }

    /// Upload the environment cube and rebind it for the boat material
    pub fn upload_environment(&mut self, images: &CubeMapImages) {
        let texture = create_cube_texture(&self.device, &self.queue, images);
        self.boat_scene_bind_group = create_boat_scene_bind_group(
            &self.device,
            &self.boat_scene_layout,
            &self.boat_uniform_buffer,
            &texture,
            &self.env_sampler,
            &self.shadow_view,
            &self.shadow_sampler,
        );
        self._env_texture = texture;
    }

    /// Debug panel to draw over the next frame
    pub fn set_overlay(&mut self, overlay: OverlayFrame) {
        self.overlay = Some(overlay);
    }

    fn write_uniforms(&self, scene: &Scene) {
        let view_proj = scene.camera.view_proj();

        let sea = scene.uniforms.to_gpu(view_proj, scene.sea_transform);
        self.queue
            .write_buffer(&self.sea_uniform_buffer, 0, bytemuck::bytes_of(&sea));

        if let Some(boat) = &scene.boat {
            let model = boat.transform.model_matrix();
            let uniforms = BoatUniforms {
                view_proj: view_proj.to_cols_array_2d(),
                model: model.to_cols_array_2d(),
                normal_matrix: model.inverse().transpose().to_cols_array_2d(),
                camera_position: scene.camera.position.to_array(),
                ..self.boat_lighting
            };
            self.queue
                .write_buffer(&self.boat_uniform_buffer, 0, bytemuck::bytes_of(&uniforms));

            let shadow = ShadowUniforms {
                light_model_view_proj: (self.light_view_proj * model).to_cols_array_2d(),
            };
            self.queue
                .write_buffer(&self.shadow_uniform_buffer, 0, bytemuck::bytes_of(&shadow));
        }
    }

    /// Render a frame
    fn render_frame(&mut self, scene: &Scene) -> Result<(), wgpu::SurfaceError> {
        self.write_uniforms(scene);

        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });

        // Boat is drawn only once both the scene node and the mesh exist
        let boat = scene.boat.as_ref().and(self.boat.as_ref());

        if let Some(boat) = boat {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.shadow_bind_group, &[]);
            shadow_pass.set_vertex_buffer(0, boat.mesh.vertex_buffer.slice(..));
            shadow_pass.set_index_buffer(boat.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            shadow_pass.draw_indexed(0..boat.mesh.index_count, 0, 0..1);
        }

        {
            // Multisampled target resolves into the surface
            let (target, resolve_target, store) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view), wgpu::StoreOp::Discard),
                None => (&view, None, wgpu::StoreOp::Store),
            };

            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Scene Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            // Render sea
            render_pass.set_pipeline(&self.sea_pipeline);
            render_pass.set_bind_group(0, &self.sea_bind_group, &[]);
            render_pass.set_vertex_buffer(0, self.sea_mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(
                self.sea_mesh.index_buffer.slice(..),
                wgpu::IndexFormat::Uint32,
            );
            render_pass.draw_indexed(0..self.sea_mesh.index_count, 0, 0..1);

            // Render boat, one draw per material part
            if let Some(boat) = boat {
                render_pass.set_pipeline(&self.boat_pipeline);
                render_pass.set_bind_group(0, &self.boat_scene_bind_group, &[]);
                render_pass.set_vertex_buffer(0, boat.mesh.vertex_buffer.slice(..));
                render_pass
                    .set_index_buffer(boat.mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);

                for part in &boat.parts {
                    let Some(material) = boat.materials.get(part.material) else {
                        continue;
                    };
                    render_pass.set_bind_group(1, material, &[]);
                    render_pass.draw_indexed(part.index_range(), 0, 0..1);
                }
            }
        }

        if let Some(overlay) = self.overlay.take() {
            self.paint_overlay(&mut encoder, &view, overlay);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();

        Ok(())
    }

    fn paint_overlay(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        overlay: OverlayFrame,
    ) {
        let screen = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: overlay.pixels_per_point,
        };

        for (id, delta) in &overlay.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            encoder,
            &overlay.paint_jobs,
            &screen,
        );

        {
            let mut render_pass = encoder
                .begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some("Debug Panel Pass"),
                    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                        view,
                        resolve_target: None,
                        ops: wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: None,
                    timestamp_writes: None,
                    occlusion_query_set: None,
                })
                .forget_lifetime();
            self.egui_renderer
                .render(&mut render_pass, &overlay.paint_jobs, &screen);
        }

        for id in &overlay.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

impl SceneRenderer for RenderSystem {
    type Error = RenderError;

    fn render(&mut self, scene: &Scene) -> Result<(), RenderError> {
        self.render_frame(scene).map_err(RenderError::from)
    }
}

/// First sRGB format, else whatever the surface lists first
fn choose_surface_format(formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb())
        .or_else(|| formats.first().copied())
}

fn uniform_entry(binding: u32, visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32, view_dimension: wgpu::TextureViewDimension) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension,
            multisampled: false,
        },
        count: None,
    }
}

fn sampler_entry(binding: u32, ty: wgpu::SamplerBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(ty),
        count: None,
    }
}

fn triangle_primitive() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        // Both sides visible: the camera may orbit below the sea, and hulls are often open
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

fn depth_stencil_state(format: wgpu::TextureFormat) -> wgpu::DepthStencilState {
    wgpu::DepthStencilState {
        format,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
    }
}

fn create_msaa_view(
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    sample_count: u32,
) -> Option<wgpu::TextureView> {
    if sample_count <= 1 {
        return None;
    }
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("MSAA Color Target"),
        size: wgpu::Extent3d {
            width: config.width.max(1),
            height: config.height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: config.format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    Some(texture.create_view(&wgpu::TextureViewDescriptor::default()))
}

fn create_depth_view(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    sample_count: u32,
) -> wgpu::TextureView {
    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Depth Texture"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    depth.create_view(&wgpu::TextureViewDescriptor::default())
}

fn create_texture_2d(device: &wgpu::Device, queue: &wgpu::Queue, image: &BoatTexture) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: image.width,
        height: image.height,
        depth_or_array_layers: 1,
    };
    device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            label: Some("Boat Texture"),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        wgpu::util::TextureDataOrder::LayerMajor,
        &image.rgba,
    )
}

/// Six-layer sRGB texture, one layer per face
fn create_cube_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    images: &CubeMapImages,
) -> wgpu::Texture {
    let size = wgpu::Extent3d {
        width: images.size,
        height: images.size,
        depth_or_array_layers: 6,
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Environment Cube"),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    for (layer, face) in images.faces.iter().enumerate() {
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d {
                    x: 0,
                    y: 0,
                    z: layer as u32,
                },
                aspect: wgpu::TextureAspect::All,
            },
            face,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * images.size),
                rows_per_image: Some(images.size),
            },
            wgpu::Extent3d {
                width: images.size,
                height: images.size,
                depth_or_array_layers: 1,
            },
        );
    }

    texture
}

fn create_boat_scene_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    uniforms: &wgpu::Buffer,
    env_texture: &wgpu::Texture,
    env_sampler: &wgpu::Sampler,
    shadow_view: &wgpu::TextureView,
    shadow_sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    let cube_view = env_texture.create_view(&wgpu::TextureViewDescriptor {
        label: Some("Environment Cube View"),
        dimension: Some(wgpu::TextureViewDimension::Cube),
        array_layer_count: Some(6),
        ..Default::default()
    });

    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Boat Scene Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&cube_view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(env_sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(shadow_view),
            },
            wgpu::BindGroupEntry {
                binding: 4,
                resource: wgpu::BindingResource::Sampler(shadow_sampler),
            },
        ],
    })
}
