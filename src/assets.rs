//! Background loading of the boat model and the environment cube map.
//!
//! Each asset is reported exactly once over a channel as success or failure, so a missing
//! file shows up as an error instead of a boat that silently never appears.

use std::path::{Path, PathBuf};
use std::thread;

use bytemuck::{Pod, Zeroable};
use crossbeam_channel::{Receiver, Sender};
use glam::{Mat3, Mat4, Vec3};

use crate::error::AssetError;
use crate::params::AssetPaths;

/// Vertex data for the boat mesh (position + normal + texture coordinate + vertex color)
#[repr(C)]
#[derive(Copy, Clone, Debug, Pod, Zeroable)]
pub struct BoatVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
    pub color: [f32; 4],
}

/// Metallic-roughness material of one or more boat parts
#[derive(Debug, Clone, PartialEq)]
pub struct BoatMaterial {
    /// Linear RGBA multiplier
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    /// Index into [`BoatModel::textures`]
    pub base_color_texture: Option<usize>,
}

impl Default for BoatMaterial {
    /// glTF default material
    fn default() -> Self {
        Self {
            base_color: [1.0; 4],
            metallic: 1.0,
            roughness: 1.0,
            base_color_texture: None,
        }
    }
}

/// sRGB-encoded RGBA8 image
#[derive(Debug, Clone)]
pub struct BoatTexture {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Index range drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoatPart {
    pub first_index: u32,
    pub index_count: u32,
    pub material: usize,
}

/// Boat geometry flattened into a single indexed triangle list, node transforms baked in
#[derive(Debug, Clone, Default)]
pub struct BoatModel {
    pub vertices: Vec<BoatVertex>,
    pub indices: Vec<u32>,
    pub parts: Vec<BoatPart>,
    pub materials: Vec<BoatMaterial>,
    pub textures: Vec<BoatTexture>,
}

impl BoatPart {
    /// Index buffer range drawn with this part's material
    pub fn index_range(&self) -> std::ops::Range<u32> {
        self.first_index..self.first_index + self.index_count
    }
}

impl BoatModel {
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Six square RGBA8 faces in +X, -X, +Y, -Y, +Z, -Z order
#[derive(Debug, Clone)]
pub struct CubeMapImages {
    /// Edge length of every face (pixels)
    pub size: u32,
    pub faces: Vec<Vec<u8>>,
}

/// Completion of one asset load
#[derive(Debug)]
pub enum LoadEvent {
    Boat(Result<BoatModel, AssetError>),
    Environment(Result<CubeMapImages, AssetError>),
}

/// Loads assets on a worker thread and hands results to the frame loop
pub struct AssetLoader {
    receiver: Receiver<LoadEvent>,
    _worker: thread::JoinHandle<()>,
}

impl AssetLoader {
    /// Start loading the environment map, then the boat model
    pub fn spawn(paths: AssetPaths) -> Result<Self, AssetError> {
        let (sender, receiver) = crossbeam_channel::unbounded();

        let worker = thread::Builder::new()
            .name("asset-loader".to_string())
            .spawn(move || load_all(&paths, &sender))?;

        Ok(Self {
            receiver,
            _worker: worker,
        })
    }

    /// Completed loads since the last poll (never blocks)
    pub fn poll(&self) -> Vec<LoadEvent> {
        self.receiver.try_iter().collect()
    }
}

fn load_all(paths: &AssetPaths, sender: &Sender<LoadEvent>) {
    let faces = paths.environment_faces();
    log::info!("Loading environment map from {}", paths.environment_dir().display());
    if sender
        .send(LoadEvent::Environment(load_cube_map(&faces)))
        .is_err()
    {
        return; // Receiver dropped, app is shutting down
    }

    let model_path = paths.boat_model();
    log::info!("Loading boat model from {}", model_path.display());
    let _ = sender.send(LoadEvent::Boat(load_boat_model(&model_path)));
}

/// Decode six cube faces; all must be square and the same size
pub fn load_cube_map(face_paths: &[PathBuf; 6]) -> Result<CubeMapImages, AssetError> {
    let mut size = None;
    let mut faces = Vec::with_capacity(face_paths.len());

    for path in face_paths {
        let image = image::open(path)
            .map_err(|source| AssetError::Image {
                path: path.clone(),
                source,
            })?
            .to_rgba8();

        let (width, height) = image.dimensions();
        if width != height {
            return Err(AssetError::NonSquareFace {
                path: path.clone(),
                width,
                height,
            });
        }

        match size {
            None => size = Some(width),
            Some(expected) if expected != width => {
                return Err(AssetError::FaceSizeMismatch {
                    path: path.clone(),
                    expected,
                    found: width,
                });
            }
            Some(_) => {}
        }

        faces.push(image.into_raw());
    }

    Ok(CubeMapImages {
        size: size.unwrap_or(0),
        faces,
    })
}

/// Import a glTF/GLB file and flatten its default scene into one triangle list
pub fn load_boat_model(path: &Path) -> Result<BoatModel, AssetError> {
    let (document, buffers, images) = gltf::import(path).map_err(|source| AssetError::Gltf {
        path: path.to_path_buf(),
        source,
    })?;

    let mut model = BoatModel::default();

    // Image slot -> texture index, for the images we can upload
    let mut texture_slots = Vec::with_capacity(images.len());
    for image in &images {
        texture_slots.push(texture_from_gltf(image).map(|texture| {
            model.textures.push(texture);
            model.textures.len() - 1
        }));
    }

    model.materials = document
        .materials()
        .map(|material| material_from_gltf(&material, &texture_slots))
        .collect();
    // Primitives without a material use the glTF default, stored last
    let default_material = model.materials.len();
    model.materials.push(BoatMaterial::default());

    if let Some(scene) = document.default_scene().or_else(|| document.scenes().next()) {
        let sources = MeshSources {
            buffers: &buffers,
            default_material,
        };
        for node in scene.nodes() {
            sources.append_node(&node, Mat4::IDENTITY, &mut model);
        }
    }

    if model.indices.is_empty() {
        return Err(AssetError::EmptyModel {
            path: path.to_path_buf(),
        });
    }

    log::debug!(
        "{}: {} vertices, {} triangles, {} materials, {} textures",
        path.display(),
        model.vertices.len(),
        model.triangle_count(),
        model.materials.len(),
        model.textures.len()
    );
    Ok(model)
}

fn material_from_gltf(material: &gltf::Material, texture_slots: &[Option<usize>]) -> BoatMaterial {
    let pbr = material.pbr_metallic_roughness();
    BoatMaterial {
        base_color: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        base_color_texture: pbr
            .base_color_texture()
            .and_then(|info| texture_slots.get(info.texture().source().index()).copied())
            .flatten(),
    }
}

/// Expand 8-bit glTF images to RGBA8; other formats are not uploaded
fn texture_from_gltf(image: &gltf::image::Data) -> Option<BoatTexture> {
    use gltf::image::Format;

    let expand: fn(&[u8]) -> [u8; 4] = match image.format {
        Format::R8 => |p| [p[0], p[0], p[0], 255],
        Format::R8G8 => |p| [p[0], p[0], p[0], p[1]],
        Format::R8G8B8 => |p| [p[0], p[1], p[2], 255],
        Format::R8G8B8A8 => |p| [p[0], p[1], p[2], p[3]],
        other => {
            log::warn!("Skipping boat texture with unsupported format {:?}", other);
            return None;
        }
    };
    let stride = match image.format {
        Format::R8 => 1,
        Format::R8G8 => 2,
        Format::R8G8B8 => 3,
        _ => 4,
    };

    let texels = (image.width * image.height) as usize;
    if texels == 0 || image.pixels.len() < texels * stride {
        return None;
    }

    let rgba = image
        .pixels
        .chunks_exact(stride)
        .take(texels)
        .flat_map(expand)
        .collect();

    Some(BoatTexture {
        width: image.width,
        height: image.height,
        rgba,
    })
}

struct MeshSources<'a> {
    buffers: &'a [gltf::buffer::Data],
    default_material: usize,
}

impl MeshSources<'_> {
    fn append_node(&self, node: &gltf::Node, parent: Mat4, model: &mut BoatModel) {
        let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());

        if let Some(mesh) = node.mesh() {
            let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
            for primitive in mesh.primitives() {
                if primitive.mode() == gltf::mesh::Mode::Triangles {
                    self.append_primitive(&primitive, world, normal_matrix, model);
                }
            }
        }

        for child in node.children() {
            self.append_node(&child, world, model);
        }
    }

    fn append_primitive(
        &self,
        primitive: &gltf::Primitive,
        world: Mat4,
        normal_matrix: Mat3,
        model: &mut BoatModel,
    ) {
        let reader = primitive.reader(|buffer| {
            self.buffers
                .get(buffer.index())
                .map(|data| data.0.as_slice())
        });

        let Some(positions) = reader.read_positions() else {
            return;
        };
        let positions: Vec<[f32; 3]> = positions.collect();
        let normals: Vec<[f32; 3]> = reader
            .read_normals()
            .map(|normals| normals.collect())
            .unwrap_or_default();
        let uvs: Vec<[f32; 2]> = reader
            .read_tex_coords(0)
            .map(|uvs| uvs.into_f32().collect())
            .unwrap_or_default();
        let vertex_colors: Vec<[f32; 4]> = reader
            .read_colors(0)
            .map(|colors| colors.into_rgba_f32().collect())
            .unwrap_or_default();

        let first = model.vertices.len() as u32;
        for (i, position) in positions.iter().enumerate() {
            let normal = normals.get(i).copied().map_or(Vec3::Y, Vec3::from_array);

            model.vertices.push(BoatVertex {
                position: world.transform_point3(Vec3::from_array(*position)).to_array(),
                normal: (normal_matrix * normal).normalize_or_zero().to_array(),
                uv: uvs.get(i).copied().unwrap_or([0.0; 2]),
                color: vertex_colors.get(i).copied().unwrap_or([1.0; 4]),
            });
        }

        let first_index = model.indices.len() as u32;
        match reader.read_indices() {
            Some(indices) => model
                .indices
                .extend(indices.into_u32().map(|index| first + index)),
            None => model
                .indices
                .extend(first..first + positions.len() as u32),
        }

        model.parts.push(BoatPart {
            first_index,
            index_count: model.indices.len() as u32 - first_index,
            material: primitive.material().index().unwrap_or(self.default_material),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_faces(dir: &Path, sizes: [u32; 6]) -> [PathBuf; 6] {
        let paths = AssetPaths::new(dir).environment_faces();
        std::fs::create_dir_all(paths[0].parent().unwrap()).unwrap();
        for (path, size) in paths.iter().zip(sizes) {
            image::RgbImage::from_pixel(size, size, image::Rgb([93, 164, 203]))
                .save(path)
                .unwrap();
        }
        paths
    }

    #[test]
    fn test_load_cube_map() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_faces(dir.path(), [8; 6]);

        let cube = load_cube_map(&paths).unwrap();
        assert_eq!(cube.size, 8);
        assert_eq!(cube.faces.len(), 6);
        assert!(cube.faces.iter().all(|face| face.len() == 8 * 8 * 4));
    }

    #[test]
    fn test_cube_faces_must_match() {
        let dir = tempfile::tempdir().unwrap();
        let paths = write_faces(dir.path(), [8, 8, 8, 16, 8, 8]);

        match load_cube_map(&paths) {
            Err(AssetError::FaceSizeMismatch {
                expected, found, ..
            }) => {
                assert_eq!(expected, 8);
                assert_eq!(found, 16);
            }
            other => panic!("expected size mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_face_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AssetPaths::new(dir.path()).environment_faces();
        assert!(matches!(
            load_cube_map(&paths),
            Err(AssetError::Image { .. })
        ));
    }

    #[test]
    fn test_missing_model_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = AssetPaths::new(dir.path()).boat_model();
        assert!(matches!(
            load_boat_model(&path),
            Err(AssetError::Gltf { .. })
        ));
    }

    /// One textured triangle, translated up by one unit, with a red-tinted material
    fn write_triangle_gltf(dir: &Path) -> PathBuf {
        let data: [f32; 15] = [
            0.0, 0.0, 0.0, //
            1.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            0.0, 1.0, //
            1.0, 1.0, //
            0.0, 0.0, //
        ];
        std::fs::write(dir.join("triangle.bin"), bytemuck::cast_slice(&data)).unwrap();

        let json = r#"{
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "nodes": [0] }],
            "nodes": [{ "mesh": 0, "translation": [0.0, 1.0, 0.0] }],
            "meshes": [{
                "primitives": [{
                    "attributes": { "POSITION": 0, "TEXCOORD_0": 1 },
                    "material": 0
                }]
            }],
            "materials": [{
                "pbrMetallicRoughness": {
                    "baseColorFactor": [1.0, 0.5, 0.25, 1.0],
                    "metallicFactor": 0.2,
                    "roughnessFactor": 0.7
                }
            }],
            "buffers": [{ "uri": "triangle.bin", "byteLength": 60 }],
            "bufferViews": [
                { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
                { "buffer": 0, "byteOffset": 36, "byteLength": 24 }
            ],
            "accessors": [
                {
                    "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                    "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]
                },
                { "bufferView": 1, "componentType": 5126, "count": 3, "type": "VEC2" }
            ]
        }"#;
        let path = dir.join("triangle.gltf");
        std::fs::write(&path, json).unwrap();
        path
    }

    #[test]
    fn test_load_boat_model_keeps_uvs_and_material() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_boat_model(&write_triangle_gltf(dir.path())).unwrap();

        assert_eq!(model.triangle_count(), 1);
        assert_eq!(model.indices, vec![0, 1, 2]);
        // Node translation is baked in
        assert_eq!(model.vertices[2].position, [0.0, 2.0, 0.0]);
        assert_eq!(model.vertices[1].uv, [1.0, 1.0]);
        assert_eq!(model.vertices[0].color, [1.0; 4]);

        assert_eq!(
            model.parts,
            vec![BoatPart {
                first_index: 0,
                index_count: 3,
                material: 0
            }]
        );
        assert_eq!(model.parts[0].index_range(), 0..3);
        let material = &model.materials[0];
        assert_eq!(material.base_color, [1.0, 0.5, 0.25, 1.0]);
        assert!((material.metallic - 0.2).abs() < 1e-6);
        assert!((material.roughness - 0.7).abs() < 1e-6);
        assert_eq!(material.base_color_texture, None);
        // Default material appended after the document's own
        assert_eq!(model.materials.last(), Some(&BoatMaterial::default()));
    }

    #[test]
    fn test_texture_expansion_to_rgba() {
        let rgb = gltf::image::Data {
            pixels: vec![10, 20, 30, 40, 50, 60],
            format: gltf::image::Format::R8G8B8,
            width: 2,
            height: 1,
        };
        let texture = texture_from_gltf(&rgb).unwrap();
        assert_eq!((texture.width, texture.height), (2, 1));
        assert_eq!(texture.rgba, vec![10, 20, 30, 255, 40, 50, 60, 255]);

        let grey = gltf::image::Data {
            pixels: vec![7],
            format: gltf::image::Format::R8,
            width: 1,
            height: 1,
        };
        assert_eq!(texture_from_gltf(&grey).unwrap().rgba, vec![7, 7, 7, 255]);

        let wide = gltf::image::Data {
            pixels: vec![0; 8],
            format: gltf::image::Format::R16G16B16A16,
            width: 1,
            height: 1,
        };
        assert!(texture_from_gltf(&wide).is_none());
    }

    #[test]
    fn test_loader_reports_every_asset() {
        let dir = tempfile::tempdir().unwrap();
        write_faces(dir.path(), [4; 6]);

        let loader = AssetLoader::spawn(AssetPaths::new(dir.path())).unwrap();

        let mut environment = None;
        let mut boat = None;
        while environment.is_none() || boat.is_none() {
            match loader
                .receiver
                .recv_timeout(std::time::Duration::from_secs(10))
                .expect("loader should report both assets")
            {
                LoadEvent::Environment(result) => environment = Some(result),
                LoadEvent::Boat(result) => boat = Some(result),
            }
        }

        assert_eq!(environment.unwrap().unwrap().size, 4);
        // No model on disk: failure is delivered, not dropped
        assert!(boat.unwrap().is_err());
    }
}
