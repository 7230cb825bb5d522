//! Draw submission.
//!
//! Entities are grouped into [`Batch`]es by (mesh, material) so that each group
//! costs one instanced draw call. For the corridor that means one call for both
//! terrain tiles and one for all obstacles.

use std::iter;

use image::DynamicImage;

use crate::{
    camera::CameraRig,
    context::Context,
    data_structures::{
        instance::InstanceRaw,
        mesh::DrawMesh,
        scene_graph::{MaterialId, MeshId, SceneGraph},
        texture::Texture,
    },
    error::CorridorError,
    frame::Renderer,
    resources::AssetSlot,
};

/// Entities that share a mesh and a material.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub mesh: MeshId,
    pub material: MaterialId,
    pub instances: Vec<InstanceRaw>,
}

/// Group the scene's entities, keeping the order in which each group first appears.
pub fn batch_entities(scene: &SceneGraph) -> Vec<Batch> {
    let mut batches: Vec<Batch> = Vec::new();
    for entity in scene.entities() {
        let raw = entity.instance.to_raw();
        match batches
            .iter_mut()
            .find(|b| b.mesh == entity.mesh && b.material == entity.material)
        {
            Some(batch) => batch.instances.push(raw),
            None => batches.push(Batch {
                mesh: entity.mesh,
                material: entity.material,
                instances: vec![raw],
            }),
        }
    }
    batches
}

impl Context {
    fn get_surface_texture(&mut self) -> Result<Option<wgpu::SurfaceTexture>, CorridorError> {
        match self.surface.get_current_texture() {
            Ok(output) => Ok(Some(output)),
            // Reconfigure the surface if it's lost or outdated and try next frame
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("Surface lost or outdated, reconfiguring");
                self.reconfigure();
                Ok(None)
            }
            Err(wgpu::SurfaceError::Timeout) => {
                log::warn!("Timed out waiting for the next frame");
                Ok(None)
            }
            Err(e) => Err(CorridorError::SurfaceUnavailable(e.to_string())),
        }
    }
}

impl Renderer for Context {
    fn upload_texture(
        &mut self,
        slot: AssetSlot,
        image: &DynamicImage,
    ) -> Result<(), CorridorError> {
        let material = self.materials.get_mut(slot.material.0).ok_or_else(|| {
            CorridorError::asset(
                format!("{:?}", slot.kind),
                format!("no material {:?}", slot.material),
            )
        })?;
        let texture = Texture::from_image(
            &self.device,
            &self.queue,
            image,
            Some(&format!("{} {:?} map", material.name, slot.kind)),
            slot.kind.is_srgb(),
        );
        material.replace_map(&self.device, &self.material_layout, slot.kind, texture);
        Ok(())
    }

    fn draw(&mut self, scene: &SceneGraph, rig: &CameraRig) -> Result<(), CorridorError> {
        if !self.is_surface_configured {
            return Ok(());
        }

        for (material, descriptor) in self.materials.iter_mut().zip(scene.materials()) {
            material.sync(&self.queue, descriptor);
        }
        self.lighting.sync(&self.queue, &scene.lights);
        self.camera.write(&self.queue, rig);

        let batches = batch_entities(scene);
        for batch in &batches {
            let key = (batch.mesh, batch.material);
            self.ensure_instance_buffer(key, batch.instances.len());
            if let Some(instance_buffer) = self.instance_buffers.get(&key) {
                self.queue.write_buffer(
                    &instance_buffer.buffer,
                    0,
                    bytemuck::cast_slice(&batch.instances),
                );
            }
        }

        let Some(output) = self.get_surface_texture()? else {
            return Ok(());
        };
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Corridor Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    depth_slice: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            render_pass.set_bind_group(1, &self.camera.bind_group, &[]);
            render_pass.set_bind_group(2, &self.lighting.bind_group, &[]);

            for batch in &batches {
                let (Some(mesh), Some(material), Some(instances)) = (
                    self.meshes.get(batch.mesh.0),
                    self.materials.get(batch.material.0),
                    self.instance_buffers.get(&(batch.mesh, batch.material)),
                ) else {
                    log::warn!(
                        "Skipping batch {:?}/{:?} without GPU resources",
                        batch.mesh,
                        batch.material
                    );
                    continue;
                };
                render_pass.set_vertex_buffer(1, instances.buffer.slice(..));
                render_pass.draw_mesh_instanced(mesh, material, 0..batch.instances.len() as u32);
            }
        }

        self.queue.submit(iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::CorridorConfig, corridor::Corridor};

    #[test]
    fn tiles_share_one_batch_and_obstacles_another() {
        let corridor = Corridor::new(&CorridorConfig::default()).unwrap();
        let batches = batch_entities(&corridor.scene);

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].instances.len(), 2);
        assert_eq!(batches[0].material, corridor.terrain_material());
        assert_eq!(batches[1].instances.len(), corridor.obstacles().len());
    }

    #[test]
    fn batches_carry_current_transforms() {
        let mut corridor = Corridor::new(&CorridorConfig::default()).unwrap();
        corridor.scroll.update(10.0, &mut corridor.scene);
        let batches = batch_entities(&corridor.scene);

        let z: Vec<f32> = batches[0]
            .instances
            .iter()
            .map(|raw| raw.translation()[2])
            .collect();
        approx::assert_abs_diff_eq!(z[0], 1.5, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(z[1], -0.5, epsilon = 1e-6);
    }
}
