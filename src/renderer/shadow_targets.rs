use log::debug;

use crate::error::{ShadowError, ShadowResult};

use super::backend::{
    DepthFormat, ImageLayout, LayeredImageDesc, ShadowBackend, ShadowDevice, ViewDesc,
};
use super::MAX_SHADOW_CASCADES;

/// Attachment-capable view onto one cascade layer of a frame's shadow map.
pub struct ShadowRenderTarget<B: ShadowBackend> {
    pub view: B::View,
    pub layer: u32,
    pub extent: u32,
}

struct FrameShadowMaps<B: ShadowBackend> {
    #[allow(dead_code)]
    image: B::Image,
    array_view: B::View,
    targets: Vec<ShadowRenderTarget<B>>,
    layout: ImageLayout,
}

/// Owns one layered depth image per in-flight frame plus its views.
pub struct ShadowRenderTargets<B: ShadowBackend> {
    frames: Vec<FrameShadowMaps<B>>,
    cascade_count: usize,
    resolution: u32,
    format: DepthFormat,
}

impl<B: ShadowBackend> ShadowRenderTargets<B> {
    pub fn initialize(
        device: &mut impl ShadowDevice<B>,
        frame_count: usize,
        cascade_count: usize,
        resolution: u32,
        format: DepthFormat,
    ) -> ShadowResult<Self> {
        if frame_count == 0 {
            return Err(ShadowError::allocation("shadow map array", "frame count must be at least 1"));
        }
        if cascade_count == 0 || cascade_count > MAX_SHADOW_CASCADES {
            return Err(ShadowError::allocation(
                "shadow map array",
                format!("cascade count {cascade_count} outside 1..={MAX_SHADOW_CASCADES}"),
            ));
        }
        if resolution == 0 {
            return Err(ShadowError::allocation("shadow map array", "resolution must be non-zero"));
        }

        let layers = cascade_count as u32;
        let mut frames = Vec::with_capacity(frame_count);
        for frame in 0..frame_count {
            let image = device.create_layered_depth_image(&LayeredImageDesc {
                label: "Shadow Map",
                width: resolution,
                height: resolution,
                layers,
                format,
            })?;
            let array_view = device.create_view(&image, &ViewDesc::whole_array(layers))?;
            let mut targets = Vec::with_capacity(cascade_count);
            for layer in 0..layers {
                let view = device.create_view(&image, &ViewDesc::single_layer(layer))?;
                targets.push(ShadowRenderTarget { view, layer, extent: resolution });
            }
            debug!("[shadow] frame {frame}: {resolution}x{resolution} depth array with {layers} layers ({format:?})");
            frames.push(FrameShadowMaps { image, array_view, targets, layout: ImageLayout::Undefined });
        }

        Ok(Self { frames, cascade_count, resolution, format })
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn cascade_count(&self) -> usize {
        self.cascade_count
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn format(&self) -> DepthFormat {
        self.format
    }

    pub fn render_target(&self, frame: usize, cascade: usize) -> &ShadowRenderTarget<B> {
        &self.frames[frame].targets[cascade]
    }

    /// Sampling view spanning every cascade of `frame`.
    pub fn array_view(&self, frame: usize) -> &B::View {
        &self.frames[frame].array_view
    }

    pub fn layout(&self, frame: usize) -> ImageLayout {
        self.frames[frame].layout
    }

    pub(crate) fn set_layout(&mut self, frame: usize, layout: ImageLayout) {
        self.frames[frame].layout = layout;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::recording::{RecordingBackend, RecordingDevice};

    #[test]
    fn allocates_one_image_and_views_per_frame() {
        let mut device = RecordingDevice::default();
        let targets = ShadowRenderTargets::<RecordingBackend>::initialize(
            &mut device,
            2,
            3,
            1024,
            DepthFormat::Depth32Float,
        )
        .expect("targets");
        assert_eq!(device.images.len(), 2);
        assert!(device.images.iter().all(|image| image.layers == 3 && image.width == 1024));
        assert_eq!(device.views_created, 2 * (1 + 3));
        assert_eq!(targets.format(), DepthFormat::Depth32Float);

        for frame in 0..2 {
            let array = targets.array_view(frame);
            assert_eq!((array.base_layer, array.layer_count), (0, 3));
            for cascade in 0..3 {
                let target = targets.render_target(frame, cascade);
                assert_eq!(target.view.image, array.image);
                assert_eq!((target.view.base_layer, target.view.layer_count), (cascade as u32, 1));
                assert_eq!(target.extent, 1024);
            }
            assert_eq!(targets.layout(frame), ImageLayout::Undefined);
        }
        assert_ne!(targets.array_view(0).image, targets.array_view(1).image);
    }

    #[test]
    fn rejects_invalid_dimensions() {
        let mut device = RecordingDevice::default();
        for (frames, cascades, resolution) in [(0, 3, 512), (2, 0, 512), (2, MAX_SHADOW_CASCADES + 1, 512), (2, 3, 0)]
        {
            let result = ShadowRenderTargets::<RecordingBackend>::initialize(
                &mut device,
                frames,
                cascades,
                resolution,
                DepthFormat::Depth32Float,
            );
            assert!(matches!(result, Err(ShadowError::ResourceAllocation { .. })));
        }
    }

    #[test]
    fn device_failures_propagate() {
        let mut device = RecordingDevice { fail_images_after: Some(1), ..Default::default() };
        let result = ShadowRenderTargets::<RecordingBackend>::initialize(
            &mut device,
            2,
            3,
            512,
            DepthFormat::Depth16Unorm,
        );
        assert!(matches!(result, Err(ShadowError::ResourceAllocation { .. })));
    }
}
