//! Keeps the projection and the drawing surface in step with the window.

use crate::camera::Projection;

/// Physical size of the drawing surface plus the pixel ratio that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
    pub pixel_ratio: f64,
}

impl SurfaceSize {
    /// Shrink to fit a `max` x `max` texture, keeping the aspect ratio.
    ///
    /// WebGL2 devices cap surfaces at 2048 pixels a side, which a 1280x720
    /// window at pixel ratio 2 already exceeds.
    pub fn fit_within(self, max: u32) -> Self {
        let longest = self.width.max(self.height);
        if longest <= max || max == 0 {
            return self;
        }
        let scale = f64::from(max) / f64::from(longest);
        let fit = |side: u32| ((f64::from(side) * scale).round() as u32).clamp(1, max);
        Self {
            width: fit(self.width),
            height: fit(self.height),
            pixel_ratio: self.pixel_ratio * scale,
        }
    }
}

/// Anything that owns a resizable drawing buffer.
pub trait SurfaceTarget {
    fn resize_surface(&mut self, size: SurfaceSize);
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    max_pixel_ratio: f64,
    device_pixel_ratio: f64,
    /// Last applied logical size.
    logical: Option<(f64, f64)>,
    applied: Option<SurfaceSize>,
}

impl ViewportController {
    pub fn new(max_pixel_ratio: f64, device_pixel_ratio: f64) -> Self {
        Self {
            max_pixel_ratio,
            device_pixel_ratio,
            logical: None,
            applied: None,
        }
    }

    /// The ratio actually used to size the surface.
    pub fn pixel_ratio(&self) -> f64 {
        let ratio = if self.device_pixel_ratio.is_finite() && self.device_pixel_ratio > 0.0 {
            self.device_pixel_ratio
        } else {
            1.0
        };
        ratio.min(self.max_pixel_ratio)
    }

    /// Height of the viewport in logical pixels, used to scale pointer input.
    pub fn logical_height(&self) -> f64 {
        self.logical.map_or(1.0, |(_, height)| height)
    }

    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.applied
    }

    /// React to a window resize given in logical pixels.
    ///
    /// Zero-sized windows (minimised) are ignored. Re-applying the current size
    /// does not touch the surface again.
    pub fn resize<T: SurfaceTarget + ?Sized>(
        &mut self,
        width: f64,
        height: f64,
        projection: &mut Projection,
        target: &mut T,
    ) {
        if !(width > 0.0 && height > 0.0) {
            log::debug!("Ignoring resize to {width}x{height}");
            return;
        }
        self.logical = Some((width, height));
        projection.set_aspect((width / height) as f32);

        let ratio = self.pixel_ratio();
        let size = SurfaceSize {
            width: ((width * ratio).round() as u32).max(1),
            height: ((height * ratio).round() as u32).max(1),
            pixel_ratio: ratio,
        };
        if self.applied == Some(size) {
            return;
        }
        log::debug!(
            "Resizing surface to {}x{} (pixel ratio {})",
            size.width,
            size.height,
            ratio
        );
        target.resize_surface(size);
        self.applied = Some(size);
    }

    pub fn set_device_pixel_ratio<T: SurfaceTarget + ?Sized>(
        &mut self,
        ratio: f64,
        projection: &mut Projection,
        target: &mut T,
    ) {
        self.device_pixel_ratio = ratio;
        if let Some((width, height)) = self.logical {
            self.resize(width, height, projection, target);
        }
    }
}
